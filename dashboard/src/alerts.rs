//! Notification broker
//!
//! Alerts live in a reducer-owned ordered list. Each one is removed when it
//! is dismissed or when its timer fires, whichever comes first; both paths
//! are no-ops for an id that is already gone.
//!
//! The broker is an explicit service: the application scope owns the
//! [`AlertBroker`], features hold [`AlertHandle`]s. A handle outlives the
//! broker only as a dead reference and reports [`AlertError::BrokerClosed`].

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tour_desk_core::{effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec};
use tour_desk_runtime::{Store, StoreError};

/// Default auto-dismiss delay
pub const DEFAULT_ALERT_TIMEOUT: Duration = Duration::from_secs(5);

/// Severity of an alert
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Operation succeeded
    Success,
    /// Operation failed
    Error,
    /// Neutral information
    Info,
    /// Needs attention
    Warning,
}

impl AlertKind {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert identifier, derived from the clock in milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlertId(pub u64);

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One queued alert
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique, strictly increasing
    pub id: AlertId,
    /// Severity
    pub kind: AlertKind,
    /// Text shown to the operator
    pub message: String,
}

/// Alerts currently shown, oldest first
#[derive(Clone, Debug, Default)]
pub struct AlertState {
    /// Queue in insertion order
    pub alerts: Vec<Alert>,
    last_id: u64,
}

impl AlertState {
    fn allocate_id(&mut self, now_ms: u64) -> AlertId {
        let id = now_ms.max(self.last_id + 1);
        self.last_id = id;
        AlertId(id)
    }
}

/// Inputs to the broker
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlertAction {
    /// Append an alert and start its timer
    Add {
        /// Severity
        kind: AlertKind,
        /// Text
        message: String,
    },
    /// Operator dismissed an alert
    Dismiss {
        /// Alert to remove
        id: AlertId,
    },
    /// An alert's timer fired
    Expired {
        /// Alert to remove
        id: AlertId,
    },
}

/// Dependencies of the broker
#[derive(Clone)]
pub struct AlertEnvironment {
    /// Source of alert ids
    pub clock: Arc<dyn Clock>,
    /// Delay before an alert removes itself
    pub timeout: Duration,
}

impl AlertEnvironment {
    /// Environment with the given clock and timeout
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        Self { clock, timeout }
    }
}

/// Reducer for the alert queue
#[derive(Clone, Debug, Default)]
pub struct AlertReducer;

impl AlertReducer {
    fn remove(state: &mut AlertState, id: AlertId) -> bool {
        let before = state.alerts.len();
        state.alerts.retain(|alert| alert.id != id);
        state.alerts.len() != before
    }
}

impl Reducer for AlertReducer {
    type State = AlertState;
    type Action = AlertAction;
    type Environment = AlertEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            AlertAction::Add { kind, message } => {
                let now_ms = u64::try_from(env.clock.now().timestamp_millis()).unwrap_or(0);
                let id = state.allocate_id(now_ms);
                tracing::debug!(%id, %kind, %message, "Alert added");
                state.alerts.push(Alert { id, kind, message });

                smallvec![Effect::delay(env.timeout, AlertAction::Expired { id })]
            },
            AlertAction::Dismiss { id } => {
                if Self::remove(state, id) {
                    tracing::debug!(%id, "Alert dismissed");
                }
                smallvec![Effect::None]
            },
            AlertAction::Expired { id } => {
                if Self::remove(state, id) {
                    tracing::debug!(%id, "Alert expired");
                }
                smallvec![Effect::None]
            },
        }
    }
}

/// Errors from an [`AlertHandle`]
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AlertError {
    /// The broker has been shut down or dropped
    #[error("Alert broker is closed")]
    BrokerClosed,
}

type AlertStore = Store<AlertState, AlertAction, AlertEnvironment, AlertReducer>;

/// Owner of the alert queue
///
/// Dropping the broker (or calling [`AlertBroker::shutdown`]) closes every
/// handle created from it.
pub struct AlertBroker {
    store: Arc<AlertStore>,
}

impl AlertBroker {
    /// Broker with an empty queue
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, timeout: Duration) -> Self {
        let store = Store::new(
            AlertState::default(),
            AlertReducer,
            AlertEnvironment::new(clock, timeout),
        );
        Self {
            store: Arc::new(store),
        }
    }

    /// A handle for a feature environment
    #[must_use]
    pub fn handle(&self) -> AlertHandle {
        AlertHandle {
            store: Arc::downgrade(&self.store),
        }
    }

    /// Current alerts, oldest first
    pub async fn alerts(&self) -> Vec<Alert> {
        self.store.state(|s| s.alerts.clone()).await
    }

    /// Close the broker; pending timers are discarded
    pub async fn shutdown(&self) {
        if let Err(StoreError::ShutdownTimeout(pending)) = self.store.shutdown(Duration::ZERO).await {
            tracing::debug!(pending, "Discarding pending alert timers");
        }
        tracing::info!("Alert broker closed");
    }
}

impl std::fmt::Debug for AlertBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertBroker")
            .field("closed", &self.store.is_shut_down())
            .finish_non_exhaustive()
    }
}

/// Non-owning reference to an [`AlertBroker`]
#[derive(Clone, Debug)]
pub struct AlertHandle {
    store: Weak<AlertStore>,
}

impl AlertHandle {
    fn live(&self) -> Result<Arc<AlertStore>, AlertError> {
        self.store
            .upgrade()
            .filter(|store| !store.is_shut_down())
            .ok_or(AlertError::BrokerClosed)
    }

    async fn send(&self, action: AlertAction) -> Result<(), AlertError> {
        let store = self.live()?;
        store
            .send(action)
            .await
            .map(|_| ())
            .map_err(|_| AlertError::BrokerClosed)
    }

    /// Queue an alert that removes itself after the broker's timeout
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::BrokerClosed`] if the broker is gone.
    pub async fn add_alert(
        &self,
        kind: AlertKind,
        message: impl Into<String>,
    ) -> Result<(), AlertError> {
        self.send(AlertAction::Add {
            kind,
            message: message.into(),
        })
        .await
    }

    /// Remove an alert now; unknown ids are ignored
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::BrokerClosed`] if the broker is gone.
    pub async fn remove_alert(&self, id: AlertId) -> Result<(), AlertError> {
        self.send(AlertAction::Dismiss { id }).await
    }

    /// Current alerts, oldest first
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::BrokerClosed`] if the broker is gone.
    pub async fn alerts(&self) -> Result<Vec<Alert>, AlertError> {
        let store = self.live()?;
        Ok(store.state(|s| s.alerts.clone()).await)
    }

    /// Queue an alert from inside an effect
    ///
    /// Effects have no caller to report to, so a closed broker is logged at
    /// error level with the message that was lost.
    pub(crate) async fn notify(&self, kind: AlertKind, message: String) {
        if let Err(error) = self.add_alert(kind, message.clone()).await {
            tracing::error!(%error, %kind, %message, "Alert dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tour_desk_testing::helpers::capture_logs;
    use tour_desk_testing::{assertions, test_clock, ReducerTest};

    fn env() -> AlertEnvironment {
        AlertEnvironment::new(Arc::new(test_clock()), DEFAULT_ALERT_TIMEOUT)
    }

    fn add(message: &str) -> AlertAction {
        AlertAction::Add {
            kind: AlertKind::Success,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_add_schedules_expiry() {
        ReducerTest::new(AlertReducer)
            .with_env(env())
            .given_state(AlertState::default())
            .when_action(add("Saved"))
            .then_state(|state| {
                assert_eq!(state.alerts.len(), 1);
                assert_eq!(state.alerts[0].message, "Saved");
            })
            .then_effects(|effects| {
                let (duration, action) = assertions::assert_has_delay_effect(effects);
                assert_eq!(duration, DEFAULT_ALERT_TIMEOUT);
                assert!(matches!(action, AlertAction::Expired { .. }));
            })
            .run();
    }

    #[test]
    fn test_same_millisecond_ids_stay_unique() {
        ReducerTest::new(AlertReducer)
            .with_env(env())
            .given_state(AlertState::default())
            .when_action(add("one"))
            .when_action(add("two"))
            .when_action(add("three"))
            .then_state(|state| {
                let ids: Vec<u64> = state.alerts.iter().map(|a| a.id.0).collect();
                assert_eq!(ids[1], ids[0] + 1);
                assert_eq!(ids[2], ids[1] + 1);
            })
            .run();
    }

    #[test]
    fn test_dismiss_unknown_is_noop() {
        ReducerTest::new(AlertReducer)
            .with_env(env())
            .given_state(AlertState::default())
            .when_action(add("kept"))
            .when_action(AlertAction::Dismiss { id: AlertId(1) })
            .then_state(|state| assert_eq!(state.alerts.len(), 1))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_expires_after_timeout() {
        let broker = AlertBroker::new(Arc::new(test_clock()), Duration::from_secs(5));
        let handle = broker.handle();

        handle.add_alert(AlertKind::Info, "Heads up").await.unwrap();
        tokio::time::sleep(Duration::from_millis(4900)).await;
        assert_eq!(broker.alerts().await.len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(broker.alerts().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_before_timeout_then_timer_is_noop() {
        let broker = AlertBroker::new(Arc::new(test_clock()), Duration::from_secs(5));
        let handle = broker.handle();

        handle.add_alert(AlertKind::Warning, "first").await.unwrap();
        handle.add_alert(AlertKind::Error, "second").await.unwrap();
        let first = handle.alerts().await.unwrap()[0].id;

        handle.remove_alert(first).await.unwrap();
        let remaining = handle.alerts().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].message, "second");

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(handle.alerts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_is_closed() {
        let broker = AlertBroker::new(Arc::new(test_clock()), DEFAULT_ALERT_TIMEOUT);
        let handle = broker.handle();
        handle.add_alert(AlertKind::Info, "pending").await.unwrap();

        broker.shutdown().await;

        assert_eq!(
            handle.add_alert(AlertKind::Info, "late").await,
            Err(AlertError::BrokerClosed)
        );
    }

    #[tokio::test]
    async fn test_handle_after_drop_is_closed() {
        let broker = AlertBroker::new(Arc::new(test_clock()), DEFAULT_ALERT_TIMEOUT);
        let handle = broker.handle();
        drop(broker);

        assert_eq!(handle.alerts().await, Err(AlertError::BrokerClosed));
        assert_eq!(
            handle.remove_alert(AlertId(1)).await,
            Err(AlertError::BrokerClosed)
        );
    }

    #[tokio::test]
    async fn test_notify_after_shutdown_logs_error() {
        let (log, _guard) = capture_logs();

        let broker = AlertBroker::new(Arc::new(test_clock()), DEFAULT_ALERT_TIMEOUT);
        let handle = broker.handle();
        broker.shutdown().await;

        handle
            .notify(AlertKind::Success, "Policy saved".to_string())
            .await;

        let output = log.contents();
        assert!(output.contains("ERROR"), "{output}");
        assert!(output.contains("Alert dropped"), "{output}");
        assert!(output.contains("Policy saved"), "{output}");
    }
}
