//! Vendor and tour details of one ticket
//!
//! Both records are requested concurrently; the feature settles only once
//! both have arrived or either has failed.

use super::{dispatch_fetch, Fetch, FeatureEnvironment, RequestToken};
use std::sync::Arc;
use std::time::Duration;
use tour_desk_client::{ApiError, Tour, TourId, Vendor, VendorId};
use tour_desk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tour_desk_runtime::Store;

/// State of the vendor/tour pair
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VendorTourState {
    /// Vendor being shown (0 until mounted)
    pub vendor_id: VendorId,
    /// Tour being shown (0 until mounted)
    pub tour_id: TourId,
    /// Both records, fetched together
    pub fetch: Fetch<(Vendor, Tour)>,
}

impl VendorTourState {
    /// Fetched vendor
    #[must_use]
    pub fn vendor(&self) -> Option<&Vendor> {
        self.fetch.data().map(|(vendor, _)| vendor)
    }

    /// Fetched tour
    #[must_use]
    pub fn tour(&self) -> Option<&Tour> {
        self.fetch.data().map(|(_, tour)| tour)
    }
}

/// Actions of the vendor/tour pair
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VendorTourAction {
    /// Point the feature at a vendor and tour and fetch both
    Mount {
        /// Vendor to fetch
        vendor_id: VendorId,
        /// Tour to fetch
        tour_id: TourId,
    },
    /// Fetch both again
    Refetch,
    /// Result of the joined fetch
    Loaded {
        /// Token issued when the fetch began
        token: RequestToken,
        /// Both records or the first failure
        result: Result<(Vendor, Tour), ApiError>,
    },
}

/// Reducer for the vendor/tour pair
#[derive(Clone, Debug, Default)]
pub struct VendorTourReducer;

impl VendorTourReducer {
    fn fetch(state: &mut VendorTourState, env: &FeatureEnvironment) -> Effect<VendorTourAction> {
        if state.vendor_id == 0 || state.tour_id == 0 {
            return Effect::None;
        }

        let token = state.fetch.begin();
        let api = Arc::clone(&env.api);
        let (vendor_id, tour_id) = (state.vendor_id, state.tour_id);

        Effect::future(async move {
            let result = futures::try_join!(api.vendor(vendor_id), api.tour(tour_id));
            Some(VendorTourAction::Loaded { token, result })
        })
    }
}

impl Reducer for VendorTourReducer {
    type State = VendorTourState;
    type Action = VendorTourAction;
    type Environment = FeatureEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            VendorTourAction::Mount { vendor_id, tour_id } => {
                if (vendor_id, tour_id) != (state.vendor_id, state.tour_id) {
                    state.vendor_id = vendor_id;
                    state.tour_id = tour_id;
                    state.fetch.reset();
                }
                smallvec![Self::fetch(state, env)]
            },
            VendorTourAction::Refetch => smallvec![Self::fetch(state, env)],
            VendorTourAction::Loaded { token, result } => {
                let result = result.map(Some).map_err(|error| {
                    tracing::error!(
                        %error,
                        vendor_id = state.vendor_id,
                        tour_id = state.tour_id,
                        "Error fetching vendor and tour"
                    );
                    format!("Failed to load vendor and tour details: {error}")
                });
                state.fetch.settle(token, result);
                smallvec![Effect::None]
            },
        }
    }
}

/// Store running one vendor/tour pair
pub type VendorTourStore =
    Store<VendorTourState, VendorTourAction, FeatureEnvironment, VendorTourReducer>;

/// Create a vendor/tour store
#[must_use]
pub fn vendor_tour_store(env: FeatureEnvironment) -> VendorTourStore {
    Store::new(VendorTourState::default(), VendorTourReducer, env)
}

const fn loaded_token(action: &VendorTourAction) -> Option<RequestToken> {
    match action {
        VendorTourAction::Loaded { token, .. } => Some(*token),
        _ => None,
    }
}

/// Mount the pair and wait until the joined fetch settles
///
/// Returns immediately when either id is zero, since nothing is fetched.
pub async fn mount_vendor_tour(
    store: &VendorTourStore,
    vendor_id: VendorId,
    tour_id: TourId,
    timeout: Duration,
) {
    let action = VendorTourAction::Mount { vendor_id, tour_id };
    dispatch_fetch(store, action, |s| s.fetch.pending(), loaded_token, timeout).await;
}
