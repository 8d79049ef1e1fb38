//! Integration tests for how a Store delivers effect results to observers
//!
//! Callers that wait on a result (`send_and_wait_for`) rely on two things:
//! the result has already been reduced when it is observed, and stale or
//! unrelated results can be told apart from the one being waited for.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;
use tour_desk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tokio_test::{assert_err, assert_ok};
use tour_desk_runtime::{Store, StoreError};

#[derive(Debug, Clone, PartialEq)]
enum TestAction {
    /// Start a save that settles after `delay_ms`
    Save { id: u64, delay_ms: u64 },
    /// Save succeeded
    Saved { id: u64 },
    /// Save failed
    SaveFailed { id: u64, message: String },
    /// Start a lookup that settles after `delay_ms`, tagged with a fresh token
    Lookup { delay_ms: u64 },
    /// Lookup result
    Found { token: u64 },
    /// Queue a delayed dismissal
    Schedule,
    /// Delayed dismissal fired
    Dismissed,
}

#[derive(Debug, Clone, Default)]
struct TestState {
    saved: Vec<u64>,
    failures: Vec<String>,
    dismissed: u32,
    latest_lookup: u64,
}

#[derive(Clone)]
struct TestEnvironment {
    failing_id: u64,
}

#[derive(Clone)]
struct TestReducer;

impl Reducer for TestReducer {
    type State = TestState;
    type Action = TestAction;
    type Environment = TestEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TestAction::Save { id, delay_ms } => {
                let failing = id == env.failing_id;
                smallvec![Effect::future(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    if failing {
                        Some(TestAction::SaveFailed {
                            id,
                            message: format!("save {id} rejected"),
                        })
                    } else {
                        Some(TestAction::Saved { id })
                    }
                })]
            },
            TestAction::Saved { id } => {
                state.saved.push(id);
                smallvec![Effect::None]
            },
            TestAction::SaveFailed { message, .. } => {
                state.failures.push(message);
                smallvec![Effect::None]
            },
            TestAction::Lookup { delay_ms } => {
                state.latest_lookup += 1;
                let token = state.latest_lookup;
                smallvec![Effect::future(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Some(TestAction::Found { token })
                })]
            },
            TestAction::Found { .. } => smallvec![Effect::None],
            TestAction::Schedule => {
                smallvec![Effect::delay(Duration::from_secs(5), TestAction::Dismissed)]
            },
            TestAction::Dismissed => {
                state.dismissed += 1;
                smallvec![Effect::None]
            },
        }
    }
}

fn store() -> Store<TestState, TestAction, TestEnvironment, TestReducer> {
    Store::new(
        TestState::default(),
        TestReducer,
        TestEnvironment { failing_id: 13 },
    )
}

fn settled(id: u64) -> impl Fn(&TestAction) -> bool {
    move |action| {
        matches!(action,
            TestAction::Saved { id: saved } | TestAction::SaveFailed { id: saved, .. } if *saved == id)
    }
}

#[tokio::test]
async fn test_observed_result_is_already_reduced() {
    let store = store();

    let result = store
        .send_and_wait_for(TestAction::Save { id: 1, delay_ms: 0 }, settled(1), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(result, TestAction::Saved { id: 1 });
    assert_eq!(store.state(|s| s.saved.clone()).await, vec![1]);
}

#[tokio::test]
async fn test_failure_is_a_terminal_result() {
    let store = store();

    let result = store
        .send_and_wait_for(TestAction::Save { id: 13, delay_ms: 0 }, settled(13), Duration::from_secs(1))
        .await
        .unwrap();

    assert!(matches!(result, TestAction::SaveFailed { id: 13, .. }));
    assert_eq!(
        store.state(|s| s.failures.clone()).await,
        vec!["save 13 rejected".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_waiter_ignores_other_results() {
    let store = store();

    assert_ok!(store.send(TestAction::Save { id: 1, delay_ms: 50 }).await);
    let result = store
        .send_and_wait_for(TestAction::Save { id: 2, delay_ms: 100 }, settled(2), Duration::from_secs(1))
        .await
        .unwrap();

    assert_eq!(result, TestAction::Saved { id: 2 });
    assert_eq!(store.state(|s| s.saved.clone()).await, vec![1, 2]);
}

fn found(action: &TestAction, token: &u64) -> bool {
    matches!(action, TestAction::Found { token: found } if found == token)
}

#[tokio::test(start_paused = true)]
async fn test_correlated_wait_skips_earlier_request() {
    let store = store();

    assert_ok!(store.send(TestAction::Lookup { delay_ms: 50 }).await);
    let started = tokio::time::Instant::now();
    let result = store
        .send_and_wait_correlated(
            TestAction::Lookup { delay_ms: 200 },
            |s| Some(s.latest_lookup),
            found,
            Duration::from_secs(1),
        )
        .await
        .unwrap();

    assert_eq!(result, Some(TestAction::Found { token: 2 }));
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_correlated_wait_without_key_returns_at_once() {
    let store = store();

    let result = store
        .send_and_wait_correlated(TestAction::Schedule, |_| None::<u64>, found, Duration::from_secs(1))
        .await;

    assert_eq!(result, Ok(None));
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out_before_slow_result() {
    let store = store();

    let result = store
        .send_and_wait_for(
            TestAction::Save { id: 3, delay_ms: 5_000 },
            settled(3),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result, Err(StoreError::Timeout));
    assert!(store.state(|s| s.saved.is_empty()).await);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_action_is_broadcast_when_it_fires() {
    let store = store();
    let mut rx = store.subscribe_actions();

    assert_ok!(store.send(TestAction::Schedule).await);
    assert_err!(rx.try_recv());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(rx.recv().await.unwrap(), TestAction::Dismissed);
    assert_eq!(store.state(|s| s.dismissed).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_with_zero_timeout_abandons_pending_timers() {
    let store = store();

    store.send(TestAction::Schedule).await.unwrap();
    let result = store.shutdown(Duration::ZERO).await;

    assert_eq!(result, Err(StoreError::ShutdownTimeout(1)));
    assert!(matches!(
        store.send(TestAction::Schedule).await,
        Err(StoreError::ShutdownInProgress)
    ));
}

#[tokio::test]
async fn test_initial_action_is_not_broadcast() {
    let store = store();
    let mut rx = store.subscribe_actions();

    assert_ok!(store.send(TestAction::Schedule).await);

    assert_err!(rx.try_recv());
}
