//! Cancellation policy of one vendor/tour pair
//!
//! The API may return several policies for a pair; the first one is treated
//! as the pair's policy and an empty list means there is none yet. Saving
//! updates the held policy by id, or creates one for the pair when none is
//! held. One save runs at a time; a save sent while another is in flight is
//! refused.

use super::{dispatch_and_wait, dispatch_fetch, Fetch, FeatureEnvironment, Mutation, RequestToken};
use crate::alerts::AlertKind;
use std::sync::Arc;
use std::time::Duration;
use tour_desk_client::{
    ApiError, CancellationPolicy, CancellationPolicyForm, NewCancellationPolicy, TourId, VendorId,
};
use tour_desk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tour_desk_runtime::Store;

/// State of the policy feature
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyState {
    /// Vendor of the pair (0 until mounted)
    pub vendor_id: VendorId,
    /// Tour of the pair (0 until mounted)
    pub tour_id: TourId,
    /// The pair's policy, if any
    pub fetch: Fetch<CancellationPolicy>,
    /// Token of the save in flight
    pub save_token: Option<RequestToken>,
    /// Message of the last failed save, separate from the fetch error
    pub update_error: Option<String>,
}

impl PolicyState {
    /// Held policy
    #[must_use]
    pub const fn policy(&self) -> Option<&CancellationPolicy> {
        self.fetch.data()
    }

    /// A save is in flight
    #[must_use]
    pub const fn update_loading(&self) -> bool {
        self.save_token.is_some()
    }
}

/// Message of a save refused because another one is in flight
pub const SAVE_IN_PROGRESS: &str = "Another save of this cancellation policy is in progress";

/// Actions of the policy feature
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyAction {
    /// Point the feature at a pair and fetch its policy
    Mount {
        /// Vendor of the pair
        vendor_id: VendorId,
        /// Tour of the pair
        tour_id: TourId,
    },
    /// Fetch again
    Refetch,
    /// Result of a fetch
    Loaded {
        /// Token issued when the fetch began
        token: RequestToken,
        /// First matching policy, none, or the failure
        result: Result<Option<CancellationPolicy>, ApiError>,
    },
    /// Update the held policy, or create one
    Save {
        /// Caller-chosen tag echoed by the outcome
        token: RequestToken,
        /// Submitted values
        form: CancellationPolicyForm,
    },
    /// The server accepted the save
    Saved {
        /// Tag of the save
        token: RequestToken,
        /// Server representation
        policy: CancellationPolicy,
    },
    /// The save failed or was refused
    SaveFailed {
        /// Tag of the save
        token: RequestToken,
        /// Display-ready message
        message: String,
    },
}

/// Reducer for the policy feature
#[derive(Clone, Debug, Default)]
pub struct PolicyReducer;

impl PolicyReducer {
    fn fetch(state: &mut PolicyState, env: &FeatureEnvironment) -> Effect<PolicyAction> {
        if state.vendor_id == 0 || state.tour_id == 0 {
            return Effect::None;
        }

        let token = state.fetch.begin();
        let api = Arc::clone(&env.api);
        let (vendor_id, tour_id) = (state.vendor_id, state.tour_id);

        Effect::future(async move {
            let result = api
                .cancellation_policies_for(vendor_id, tour_id)
                .await
                .map(|policies| policies.into_iter().next());
            Some(PolicyAction::Loaded { token, result })
        })
    }

    fn save(
        state: &mut PolicyState,
        token: RequestToken,
        form: CancellationPolicyForm,
        env: &FeatureEnvironment,
    ) -> Effect<PolicyAction> {
        if let Some(in_flight) = state.save_token {
            tracing::warn!(?token, ?in_flight, "Refusing cancellation policy save while another runs");
            return Effect::future(async move {
                Some(PolicyAction::SaveFailed {
                    token,
                    message: SAVE_IN_PROGRESS.to_string(),
                })
            });
        }

        let mutation = state
            .policy()
            .map_or(Mutation::Create, |policy| Mutation::Update(policy.id));
        state.save_token = Some(token);
        state.update_error = None;

        let api = Arc::clone(&env.api);
        let alerts = env.alerts.clone();
        let (vendor_id, tour_id) = (state.vendor_id, state.tour_id);

        Effect::future(async move {
            let result = match mutation {
                Mutation::Update(id) => api.update_cancellation_policy(id, form).await,
                Mutation::Create => {
                    let policy = NewCancellationPolicy::from_form(vendor_id, tour_id, &form);
                    api.create_cancellation_policy(policy).await
                },
            };

            match result {
                Ok(policy) => {
                    let message =
                        format!("Cancellation policy {} successfully", mutation.past_tense());
                    alerts.notify(AlertKind::Success, message).await;
                    Some(PolicyAction::Saved { token, policy })
                },
                Err(error) => {
                    let message =
                        format!("Failed to {} cancellation policy: {error}", mutation.verb());
                    tracing::error!(%error, ?mutation, "Error saving cancellation policy");
                    alerts.notify(AlertKind::Error, message.clone()).await;
                    Some(PolicyAction::SaveFailed { token, message })
                },
            }
        })
    }
}

impl Reducer for PolicyReducer {
    type State = PolicyState;
    type Action = PolicyAction;
    type Environment = FeatureEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PolicyAction::Mount { vendor_id, tour_id } => {
                if (vendor_id, tour_id) != (state.vendor_id, state.tour_id) {
                    *state = PolicyState {
                        vendor_id,
                        tour_id,
                        ..PolicyState::default()
                    };
                    state.fetch.reset();
                }
                smallvec![Self::fetch(state, env)]
            },
            PolicyAction::Refetch => smallvec![Self::fetch(state, env)],
            PolicyAction::Loaded { token, result } => {
                let result = result.map_err(|error| {
                    tracing::error!(%error, "Error fetching cancellation policy");
                    format!("Failed to load cancellation policy: {error}")
                });
                state.fetch.settle(token, result);
                smallvec![Effect::None]
            },
            PolicyAction::Save { token, form } => smallvec![Self::save(state, token, form, env)],
            PolicyAction::Saved { token, policy } => {
                if state.save_token == Some(token) {
                    state.fetch.replace(policy);
                    state.save_token = None;
                } else {
                    tracing::debug!(?token, "Ignoring outcome of a superseded save");
                }
                smallvec![Effect::None]
            },
            PolicyAction::SaveFailed { token, message } => {
                if state.save_token == Some(token) {
                    state.update_error = Some(message);
                    state.save_token = None;
                }
                smallvec![Effect::None]
            },
        }
    }
}

/// Store running one pair's policy
pub type PolicyStore = Store<PolicyState, PolicyAction, FeatureEnvironment, PolicyReducer>;

/// Create a policy store
#[must_use]
pub fn policy_store(env: FeatureEnvironment) -> PolicyStore {
    Store::new(PolicyState::default(), PolicyReducer, env)
}

const fn loaded_token(action: &PolicyAction) -> Option<RequestToken> {
    match action {
        PolicyAction::Loaded { token, .. } => Some(*token),
        _ => None,
    }
}

/// Mount the pair and wait until the fetch it started settles
///
/// Pointing the feature at a different pair drops everything held for the
/// old one. Returns at once when either id is zero, since nothing is fetched.
pub async fn mount_policy(store: &PolicyStore, vendor_id: VendorId, tour_id: TourId, timeout: Duration) {
    let action = PolicyAction::Mount { vendor_id, tour_id };
    dispatch_fetch(store, action, |s| s.fetch.pending(), loaded_token, timeout).await;
}

/// Fetch the policy again and wait until that fetch settles
pub async fn refetch_policy(store: &PolicyStore, timeout: Duration) {
    dispatch_fetch(store, PolicyAction::Refetch, |s| s.fetch.pending(), loaded_token, timeout).await;
}

/// Submit `form` and report whether the server accepted it
///
/// A timeout, a closed store, or another save still in flight counts as a
/// failure.
pub async fn save_policy(store: &PolicyStore, form: CancellationPolicyForm, timeout: Duration) -> bool {
    let token = RequestToken::issue();
    let settled = dispatch_and_wait(
        store,
        PolicyAction::Save { token, form },
        |a| match a {
            PolicyAction::Saved { token: t, .. } | PolicyAction::SaveFailed { token: t, .. } => *t == token,
            _ => false,
        },
        timeout,
    )
    .await;
    matches!(settled, Some(PolicyAction::Saved { .. }))
}
