//! Vendor-tour link of one pair
//!
//! Reads and creates go through whichever [`LinkRepository`] the
//! application selected. Creation shares the fetch's loading and error
//! state, and every failure is also announced as an alert. One create runs
//! at a time.

use super::{dispatch_and_wait, dispatch_fetch, Fetch, RequestToken};
use crate::alerts::{AlertHandle, AlertKind};
use crate::links::{LinkError, LinkRepository};
use std::sync::Arc;
use std::time::Duration;
use tour_desk_client::{TourId, VendorId, VendorTourLink};
use tour_desk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tour_desk_runtime::Store;

/// Dependencies of the link feature
#[derive(Clone)]
pub struct LinkEnvironment {
    /// Link persistence
    pub links: Arc<dyn LinkRepository>,
    /// Where outcomes are announced
    pub alerts: AlertHandle,
}

impl LinkEnvironment {
    /// Creates a new `LinkEnvironment`
    #[must_use]
    pub fn new(links: Arc<dyn LinkRepository>, alerts: AlertHandle) -> Self {
        Self { links, alerts }
    }
}

/// State of the link feature
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkState {
    /// Vendor of the pair (0 until mounted)
    pub vendor_id: VendorId,
    /// Tour of the pair (0 until mounted)
    pub tour_id: TourId,
    /// The pair's link, if any
    pub fetch: Fetch<VendorTourLink>,
    /// Token of the create in flight
    pub create_token: Option<RequestToken>,
}

impl LinkState {
    /// Held link
    #[must_use]
    pub const fn link(&self) -> Option<&VendorTourLink> {
        self.fetch.data()
    }
}

/// Message of a create refused because another one is in flight
pub const CREATE_IN_PROGRESS: &str = "Vendor tour creation is already in progress";

/// Actions of the link feature
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkAction {
    /// Point the feature at a pair and look its link up
    Mount {
        /// Vendor of the pair
        vendor_id: VendorId,
        /// Tour of the pair
        tour_id: TourId,
    },
    /// Look up again
    Refetch,
    /// Result of a lookup
    Loaded {
        /// Token issued when the lookup began
        token: RequestToken,
        /// First matching link, none, or the failure
        result: Result<Option<VendorTourLink>, LinkError>,
    },
    /// Create the link unless one exists
    Create {
        /// Caller-chosen tag echoed by the outcome
        token: RequestToken,
    },
    /// The link exists now
    Created {
        /// Tag of the create
        token: RequestToken,
        /// Existing or new link
        link: VendorTourLink,
    },
    /// Creation failed or was refused
    CreateFailed {
        /// Tag of the create
        token: RequestToken,
        /// Display-ready message
        message: String,
    },
}

/// Reducer for the link feature
#[derive(Clone, Debug, Default)]
pub struct LinkReducer;

impl LinkReducer {
    fn fetch(state: &mut LinkState, env: &LinkEnvironment) -> Effect<LinkAction> {
        if state.vendor_id == 0 || state.tour_id == 0 {
            return Effect::None;
        }

        let token = state.fetch.begin();
        let links = Arc::clone(&env.links);
        let alerts = env.alerts.clone();
        let (vendor_id, tour_id) = (state.vendor_id, state.tour_id);

        Effect::future(async move {
            let result = links.find(vendor_id, tour_id).await;
            if let Err(error) = &result {
                tracing::error!(%error, vendor_id, tour_id, "Error checking vendor tour");
                alerts
                    .notify(AlertKind::Error, format!("Failed to check vendor tour: {error}"))
                    .await;
            }
            Some(LinkAction::Loaded { token, result })
        })
    }

    fn create(state: &mut LinkState, token: RequestToken, env: &LinkEnvironment) -> Effect<LinkAction> {
        if let Some(in_flight) = state.create_token {
            tracing::warn!(?token, ?in_flight, "Refusing vendor tour create while another runs");
            return Effect::future(async move {
                Some(LinkAction::CreateFailed {
                    token,
                    message: CREATE_IN_PROGRESS.to_string(),
                })
            });
        }

        state.create_token = Some(token);
        state.fetch.begin();
        let links = Arc::clone(&env.links);
        let alerts = env.alerts.clone();
        let (vendor_id, tour_id) = (state.vendor_id, state.tour_id);

        Effect::future(async move {
            match links.create_if_absent(vendor_id, tour_id).await {
                Ok(link) => {
                    alerts
                        .notify(AlertKind::Success, "Vendor tour created successfully".to_string())
                        .await;
                    Some(LinkAction::Created { token, link })
                },
                Err(error) => {
                    tracing::error!(%error, vendor_id, tour_id, "Error creating vendor tour");
                    let message = format!("Failed to create vendor tour: {error}");
                    alerts.notify(AlertKind::Error, message.clone()).await;
                    Some(LinkAction::CreateFailed { token, message })
                },
            }
        })
    }
}

impl Reducer for LinkReducer {
    type State = LinkState;
    type Action = LinkAction;
    type Environment = LinkEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            LinkAction::Mount { vendor_id, tour_id } => {
                if (vendor_id, tour_id) != (state.vendor_id, state.tour_id) {
                    *state = LinkState {
                        vendor_id,
                        tour_id,
                        ..LinkState::default()
                    };
                    state.fetch.reset();
                }
                smallvec![Self::fetch(state, env)]
            },
            LinkAction::Refetch => smallvec![Self::fetch(state, env)],
            LinkAction::Loaded { token, result } => {
                let result = result.map_err(|error| format!("Failed to check vendor tour: {error}"));
                state.fetch.settle(token, result);
                smallvec![Effect::None]
            },
            LinkAction::Create { token } => smallvec![Self::create(state, token, env)],
            LinkAction::Created { token, link } => {
                if state.create_token == Some(token) {
                    state.create_token = None;
                    state.fetch.replace(link);
                }
                smallvec![Effect::None]
            },
            LinkAction::CreateFailed { token, message } => {
                if state.create_token == Some(token) {
                    state.create_token = None;
                    state.fetch.fail(message);
                }
                smallvec![Effect::None]
            },
        }
    }
}

/// Store running one pair's link
pub type LinkStore = Store<LinkState, LinkAction, LinkEnvironment, LinkReducer>;

/// Create a link store
#[must_use]
pub fn link_store(env: LinkEnvironment) -> LinkStore {
    Store::new(LinkState::default(), LinkReducer, env)
}

const fn loaded_token(action: &LinkAction) -> Option<RequestToken> {
    match action {
        LinkAction::Loaded { token, .. } => Some(*token),
        _ => None,
    }
}

/// Mount the pair and wait until the lookup it started settles
///
/// Returns at once when either id is zero.
pub async fn mount_link(store: &LinkStore, vendor_id: VendorId, tour_id: TourId, timeout: Duration) {
    let action = LinkAction::Mount { vendor_id, tour_id };
    dispatch_fetch(store, action, |s| s.fetch.pending(), loaded_token, timeout).await;
}

/// Create the pair's link if absent; returns the link on success
///
/// Refused while another create for the pair is in flight.
pub async fn create_link(store: &LinkStore, timeout: Duration) -> Option<VendorTourLink> {
    let token = RequestToken::issue();
    let settled = dispatch_and_wait(
        store,
        LinkAction::Create { token },
        |a| match a {
            LinkAction::Created { token: t, .. } | LinkAction::CreateFailed { token: t, .. } => *t == token,
            _ => false,
        },
        timeout,
    )
    .await;
    match settled {
        Some(LinkAction::Created { link, .. }) => Some(link),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertBroker;
    use crate::links::{LocalLinkRepository, RemoteLinkRepository};
    use crate::storage::MemoryKeyValueStore;
    use tour_desk_client::ApiError;
    use tour_desk_testing::mocks::{Endpoint, MockTicketApi};
    use tour_desk_testing::{assertions, fixtures, test_clock, ReducerTest};

    const WAIT: Duration = Duration::from_secs(1);

    fn remote(api: MockTicketApi) -> (LinkEnvironment, AlertBroker) {
        let broker = AlertBroker::new(Arc::new(test_clock()), Duration::from_secs(5));
        let links = RemoteLinkRepository::new(Arc::new(api), Arc::new(test_clock()));
        (LinkEnvironment::new(Arc::new(links), broker.handle()), broker)
    }

    #[test]
    fn test_create_shares_loading_flag() {
        let (env, _broker) = remote(MockTicketApi::new());
        ReducerTest::new(LinkReducer)
            .with_env(env)
            .given_state(LinkState {
                vendor_id: 1,
                tour_id: 2,
                ..LinkState::default()
            })
            .when_action(LinkAction::Create {
                token: RequestToken::issue(),
            })
            .then_state(|state| {
                assert!(state.fetch.loading());
                assert!(state.create_token.is_some());
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[tokio::test]
    async fn test_mount_finds_existing_link() {
        let (env, _broker) = remote(MockTicketApi::new().with_link(fixtures::link(8, 1, 2)));
        let store = link_store(env);

        mount_link(&store, 1, 2, WAIT).await;

        assert_eq!(store.state(|s| s.link().map(|l| l.id)).await, Some(8));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_stored_and_alerted() {
        let api = MockTicketApi::new().failing(
            Endpoint::VendorTours,
            ApiError::http(503, Some("Service Unavailable"), None),
        );
        let (env, broker) = remote(api);
        let store = link_store(env);

        mount_link(&store, 1, 2, WAIT).await;

        let expected = "Failed to check vendor tour: API Error: 503 Service Unavailable";
        let error = store.state(|s| s.fetch.error().map(str::to_string)).await;
        assert_eq!(error.as_deref(), Some(expected));
        let alerts = broker.alerts().await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Error);
        assert_eq!(alerts[0].message, expected);
    }

    #[tokio::test]
    async fn test_create_is_idempotent_on_local_backend() {
        let broker = AlertBroker::new(Arc::new(test_clock()), Duration::from_secs(5));
        let links =
            LocalLinkRepository::new(Arc::new(MemoryKeyValueStore::new()), Arc::new(test_clock()));
        let store = link_store(LinkEnvironment::new(Arc::new(links), broker.handle()));
        mount_link(&store, 1, 2, WAIT).await;
        assert_eq!(store.state(|s| s.link().cloned()).await, None);

        let first = create_link(&store, WAIT).await.unwrap();
        let second = create_link(&store, WAIT).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.state(|s| s.link().cloned()).await, Some(first));
        let messages: Vec<_> = broker.alerts().await.into_iter().map(|a| a.message).collect();
        assert_eq!(
            messages,
            vec!["Vendor tour created successfully", "Vendor tour created successfully"]
        );
    }

    #[tokio::test]
    async fn test_create_failure_lands_in_fetch_error() {
        let api = MockTicketApi::new().failing(
            Endpoint::CreateVendorTour,
            ApiError::http(500, None, Some("Write refused".to_string())),
        );
        let (env, broker) = remote(api);
        let store = link_store(env);
        mount_link(&store, 1, 2, WAIT).await;

        assert_eq!(create_link(&store, WAIT).await, None);

        let state = store.state(Clone::clone).await;
        assert!(!state.fetch.loading());
        assert_eq!(state.fetch.error(), Some("Failed to create vendor tour: Write refused"));
        assert_eq!(
            broker.alerts().await[0].message,
            "Failed to create vendor tour: Write refused"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_create_is_refused() {
        let api = MockTicketApi::new();
        api.stall(Endpoint::CreateVendorTour, Duration::from_secs(2));
        let (env, broker) = remote(api.clone());
        let store = link_store(env);
        mount_link(&store, 1, 2, WAIT).await;

        let first = tokio::spawn({
            let store = store.clone();
            async move { create_link(&store, Duration::from_secs(10)).await }
        });
        while store.state(|s| s.create_token.is_none()).await {
            tokio::task::yield_now().await;
        }

        assert_eq!(create_link(&store, WAIT).await, None);
        let created = first.await.unwrap().unwrap();

        assert_eq!(api.links(), vec![created.clone()]);
        let state = store.state(Clone::clone).await;
        assert_eq!(state.link(), Some(&created));
        assert_eq!(state.fetch.error(), None);
        assert_eq!(broker.alerts().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_moving_to_unset_pair_drops_link() {
        let api = MockTicketApi::new().with_link(fixtures::link(8, 1, 2));
        let (env, _broker) = remote(api.clone());
        let store = link_store(env);
        mount_link(&store, 1, 2, WAIT).await;
        api.stall(Endpoint::VendorTours, Duration::from_secs(5));

        store.send(LinkAction::Refetch).await.unwrap();
        mount_link(&store, 0, 2, WAIT).await;
        tokio::time::sleep(Duration::from_secs(6)).await;

        let state = store.state(Clone::clone).await;
        assert_eq!(state.link(), None);
        assert_eq!(state.fetch.error(), None);
    }
}
