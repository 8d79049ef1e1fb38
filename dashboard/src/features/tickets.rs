//! Ticket list

use super::{dispatch_fetch, Fetch, FeatureEnvironment, RequestToken};
use std::sync::Arc;
use std::time::Duration;
use tour_desk_client::{ApiError, ListingType, Ticket};
use tour_desk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tour_desk_runtime::Store;

/// State of the ticket list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketsState {
    /// The fetched list
    pub fetch: Fetch<Vec<Ticket>>,
}

impl TicketsState {
    /// Loaded tickets (empty until the first successful fetch)
    #[must_use]
    pub fn tickets(&self) -> &[Ticket] {
        self.fetch.data().map(Vec::as_slice).unwrap_or_default()
    }

    /// Ticket by id
    #[must_use]
    pub fn ticket(&self, id: u64) -> Option<&Ticket> {
        self.tickets().iter().find(|t| t.id == id)
    }

    /// Number of loaded tickets with the given listing type
    #[must_use]
    pub fn count(&self, listing_type: ListingType) -> usize {
        self.tickets()
            .iter()
            .filter(|t| t.listing_type == listing_type)
            .count()
    }
}

/// Actions of the ticket list
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TicketsAction {
    /// Fetch the list
    Load,
    /// Fetch the list again
    Refetch,
    /// Result of a fetch
    Loaded {
        /// Token issued when the fetch began
        token: RequestToken,
        /// Tickets or the failure
        result: Result<Vec<Ticket>, ApiError>,
    },
}

/// Reducer for the ticket list
#[derive(Clone, Debug, Default)]
pub struct TicketsReducer;

impl TicketsReducer {
    fn fetch(state: &mut TicketsState, env: &FeatureEnvironment) -> Effect<TicketsAction> {
        let token = state.fetch.begin();
        let api = Arc::clone(&env.api);

        Effect::future(async move {
            let result = api.tickets().await;
            Some(TicketsAction::Loaded { token, result })
        })
    }
}

impl Reducer for TicketsReducer {
    type State = TicketsState;
    type Action = TicketsAction;
    type Environment = FeatureEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TicketsAction::Load | TicketsAction::Refetch => smallvec![Self::fetch(state, env)],
            TicketsAction::Loaded { token, result } => {
                let result = result.map(Some).map_err(|error| {
                    tracing::error!(%error, "Error fetching tickets");
                    format!("Failed to load tickets: {error}")
                });
                state.fetch.settle(token, result);
                smallvec![Effect::None]
            },
        }
    }
}

/// Store running the ticket list
pub type TicketsStore = Store<TicketsState, TicketsAction, FeatureEnvironment, TicketsReducer>;

/// Create a ticket list store
#[must_use]
pub fn tickets_store(env: FeatureEnvironment) -> TicketsStore {
    Store::new(TicketsState::default(), TicketsReducer, env)
}

const fn loaded_token(action: &TicketsAction) -> Option<RequestToken> {
    match action {
        TicketsAction::Loaded { token, .. } => Some(*token),
        _ => None,
    }
}

/// Load the list and wait until the fetch it started settles
pub async fn load_tickets(store: &TicketsStore, timeout: Duration) {
    dispatch_fetch(store, TicketsAction::Load, |s| s.fetch.pending(), loaded_token, timeout).await;
}
