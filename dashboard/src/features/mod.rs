//! Entity features
//!
//! Each feature is a reducer over its own state, driven by a
//! [`Store`](tour_desk_runtime::Store). Fetches are `Effect::Future`s that
//! call the injected [`TicketApi`] and feed a `Loaded` action back.
//!
//! Every fetch is tagged with a [`RequestToken`]; a result whose token is
//! not the latest one issued is discarded, so a slow response can never
//! overwrite a newer one. Saves carry a token chosen by the caller, which is
//! how each caller recognises the outcome of its own save.

use crate::alerts::AlertHandle;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tour_desk_client::TicketApi;
use tour_desk_core::reducer::Reducer;
use tour_desk_runtime::Store;

pub mod contact;
pub mod link;
pub mod policy;
pub mod tickets;
pub mod vendor_tour;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Tag correlating a request with its result
///
/// Tokens are unique within the process; the default token is never issued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    /// A token no other request has
    #[must_use]
    pub fn issue() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// Loading, error, and data of one fetched value
///
/// `loading` starts out `true` and stays so until the first fetch settles.
/// A failed fetch keeps the previously held data; a successful one clears
/// the error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fetch<T> {
    loading: bool,
    error: Option<String>,
    data: Option<T>,
    latest: RequestToken,
    in_flight: bool,
}

impl<T> Default for Fetch<T> {
    fn default() -> Self {
        Self {
            loading: true,
            error: None,
            data: None,
            latest: RequestToken::default(),
            in_flight: false,
        }
    }
}

impl<T> Fetch<T> {
    /// Whether a fetch is outstanding (or none has settled yet)
    #[must_use]
    pub const fn loading(&self) -> bool {
        self.loading
    }

    /// Display-ready message of the last failed fetch
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Held value
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// The token a result must carry to be accepted
    #[must_use]
    pub const fn latest(&self) -> RequestToken {
        self.latest
    }

    /// Token of the fetch still awaiting its result, if any
    #[must_use]
    pub const fn pending(&self) -> Option<RequestToken> {
        if self.in_flight {
            Some(self.latest)
        } else {
            None
        }
    }

    /// Issue a new token and mark loading
    pub fn begin(&mut self) -> RequestToken {
        self.latest = RequestToken::issue();
        self.loading = true;
        self.in_flight = true;
        self.latest
    }

    /// Forget everything held and invalidate any fetch in flight
    ///
    /// Used when the feature is pointed at different keys: nothing fetched
    /// for the old keys may be shown or applied afterwards.
    pub fn reset(&mut self) {
        *self = Self {
            latest: RequestToken::issue(),
            ..Self::default()
        };
    }

    /// Apply a result; returns `false` when `token` is stale
    pub fn settle(&mut self, token: RequestToken, result: Result<Option<T>, String>) -> bool {
        if token != self.latest {
            tracing::debug!(?token, latest = ?self.latest, "Discarding stale result");
            return false;
        }

        self.loading = false;
        self.in_flight = false;
        match result {
            Ok(data) => {
                self.data = data;
                self.error = None;
            },
            Err(message) => {
                self.error = Some(message);
            },
        }
        true
    }

    /// Replace the held value with a mutation result
    ///
    /// Any fetch still in flight predates the mutation and is invalidated.
    pub fn replace(&mut self, data: T) {
        self.latest = RequestToken::issue();
        self.loading = false;
        self.in_flight = false;
        self.data = Some(data);
    }

    /// Record a failed mutation in the fetch error, keeping the held value
    ///
    /// Any fetch still in flight is invalidated.
    pub fn fail(&mut self, message: String) {
        self.latest = RequestToken::issue();
        self.loading = false;
        self.in_flight = false;
        self.error = Some(message);
    }
}

/// Whether a save updates the held entity or creates a new one
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// `PUT` by id
    Update(u64),
    /// `POST` scoped to the current vendor/tour
    Create,
}

impl Mutation {
    /// "update" or "create"
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Update(_) => "update",
            Self::Create => "create",
        }
    }

    /// "updated" or "created"
    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Update(_) => "updated",
            Self::Create => "created",
        }
    }
}

/// Dependencies shared by the API-backed features
#[derive(Clone)]
pub struct FeatureEnvironment {
    /// Remote ticket API
    pub api: Arc<dyn TicketApi>,
    /// Where mutation outcomes are announced
    pub alerts: AlertHandle,
}

impl FeatureEnvironment {
    /// Creates a new `FeatureEnvironment`
    #[must_use]
    pub fn new(api: Arc<dyn TicketApi>, alerts: AlertHandle) -> Self {
        Self { api, alerts }
    }
}

/// Send `action` and wait for the result of the fetch it started
///
/// `pending` reads the token of the started fetch right after `action` is
/// reduced, and `loaded` extracts the token a result action carries. Returns
/// at once when `action` started no fetch, and `None` on timeout or
/// shutdown.
pub(crate) async fn dispatch_fetch<S, A, E, R, P, L>(
    store: &Store<S, A, E, R>,
    action: A,
    pending: P,
    loaded: L,
    timeout: Duration,
) -> Option<A>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    P: FnOnce(&S) -> Option<RequestToken>,
    L: Fn(&A) -> Option<RequestToken>,
{
    let settled = |candidate: &A, token: &RequestToken| loaded(candidate) == Some(*token);
    match store.send_and_wait_correlated(action, pending, settled, timeout).await {
        Ok(result) => result,
        Err(error) => {
            tracing::warn!(%error, "Gave up waiting for a fetch");
            None
        },
    }
}

/// Send `action` and wait for the first effect-produced action matching
/// `settled`, or `None` on timeout or shutdown
pub(crate) async fn dispatch_and_wait<S, A, E, R, F>(
    store: &Store<S, A, E, R>,
    action: A,
    settled: F,
    timeout: Duration,
) -> Option<A>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: Fn(&A) -> bool,
{
    match store.send_and_wait_for(action, settled, timeout).await {
        Ok(result) => Some(result),
        Err(error) => {
            tracing::warn!(%error, "Gave up waiting for a result");
            None
        },
    }
}
