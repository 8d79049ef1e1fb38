//! Contact information of one vendor/tour pair
//!
//! Same shape as the policy feature: the first contact returned for the
//! pair is the effective one, saving updates it or creates one, and only
//! one save runs at a time.

use super::{dispatch_and_wait, dispatch_fetch, Fetch, FeatureEnvironment, Mutation, RequestToken};
use crate::alerts::AlertKind;
use std::sync::Arc;
use std::time::Duration;
use tour_desk_client::{ApiError, Contact, ContactForm, NewContact, TourId, VendorId};
use tour_desk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tour_desk_runtime::Store;

/// State of the contact feature
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactState {
    /// Vendor of the pair (0 until mounted)
    pub vendor_id: VendorId,
    /// Tour of the pair (0 until mounted)
    pub tour_id: TourId,
    /// The pair's contact, if any
    pub fetch: Fetch<Contact>,
    /// Token of the save in flight
    pub save_token: Option<RequestToken>,
    /// Message of the last failed save
    pub update_error: Option<String>,
}

impl ContactState {
    /// Held contact
    #[must_use]
    pub const fn contact(&self) -> Option<&Contact> {
        self.fetch.data()
    }

    /// A save is in flight
    #[must_use]
    pub const fn update_loading(&self) -> bool {
        self.save_token.is_some()
    }
}

/// Message of a save refused because another one is in flight
pub const SAVE_IN_PROGRESS: &str = "Another save of this contact information is in progress";

/// Actions of the contact feature
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContactAction {
    /// Point the feature at a pair and fetch its contact
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
        /// First matching contact, none, or the failure
        result: Result<Option<Contact>, ApiError>,
    },
    /// Update the held contact, or create one
    Save {
        /// Caller-chosen tag echoed by the outcome
        token: RequestToken,
        /// Submitted values
        form: ContactForm,
    },
    /// The server accepted the save
    Saved {
        /// Tag of the save
        token: RequestToken,
        /// Server representation
        contact: Contact,
    },
    /// The save failed or was refused
    SaveFailed {
        /// Tag of the save
        token: RequestToken,
        /// Display-ready message
        message: String,
    },
}

/// Reducer for the contact feature
#[derive(Clone, Debug, Default)]
pub struct ContactReducer;

impl ContactReducer {
    fn fetch(state: &mut ContactState, env: &FeatureEnvironment) -> Effect<ContactAction> {
        if state.vendor_id == 0 || state.tour_id == 0 {
            return Effect::None;
        }

        let token = state.fetch.begin();
        let api = Arc::clone(&env.api);
        let (vendor_id, tour_id) = (state.vendor_id, state.tour_id);

        Effect::future(async move {
            let result = api
                .contacts_for(vendor_id, tour_id)
                .await
                .map(|contacts| contacts.into_iter().next());
            Some(ContactAction::Loaded { token, result })
        })
    }

    fn save(
        state: &mut ContactState,
        token: RequestToken,
        form: ContactForm,
        env: &FeatureEnvironment,
    ) -> Effect<ContactAction> {
        if let Some(in_flight) = state.save_token {
            tracing::warn!(?token, ?in_flight, "Refusing contact save while another runs");
            return Effect::future(async move {
                Some(ContactAction::SaveFailed {
                    token,
                    message: SAVE_IN_PROGRESS.to_string(),
                })
            });
        }

        let mutation = state
            .contact()
            .map_or(Mutation::Create, |contact| Mutation::Update(contact.id));
        state.save_token = Some(token);
        state.update_error = None;

        let api = Arc::clone(&env.api);
        let alerts = env.alerts.clone();
        let (vendor_id, tour_id) = (state.vendor_id, state.tour_id);

        Effect::future(async move {
            let result = match mutation {
                Mutation::Update(id) => api.update_contact(id, form).await,
                Mutation::Create => {
                    api.create_contact(NewContact::from_form(vendor_id, tour_id, &form))
                        .await
                },
            };

            match result {
                Ok(contact) => {
                    let message =
                        format!("Contact information {} successfully", mutation.past_tense());
                    alerts.notify(AlertKind::Success, message).await;
                    Some(ContactAction::Saved { token, contact })
                },
                Err(error) => {
                    let message =
                        format!("Failed to {} contact information: {error}", mutation.verb());
                    tracing::error!(%error, ?mutation, "Error saving contact");
                    alerts.notify(AlertKind::Error, message.clone()).await;
                    Some(ContactAction::SaveFailed { token, message })
                },
            }
        })
    }
}

impl Reducer for ContactReducer {
    type State = ContactState;
    type Action = ContactAction;
    type Environment = FeatureEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ContactAction::Mount { vendor_id, tour_id } => {
                if (vendor_id, tour_id) != (state.vendor_id, state.tour_id) {
                    *state = ContactState {
                        vendor_id,
                        tour_id,
                        ..ContactState::default()
                    };
                    state.fetch.reset();
                }
                smallvec![Self::fetch(state, env)]
            },
            ContactAction::Refetch => smallvec![Self::fetch(state, env)],
            ContactAction::Loaded { token, result } => {
                let result = result.map_err(|error| {
                    tracing::error!(%error, "Error fetching contact");
                    format!("Failed to load contact information: {error}")
                });
                state.fetch.settle(token, result);
                smallvec![Effect::None]
            },
            ContactAction::Save { token, form } => smallvec![Self::save(state, token, form, env)],
            ContactAction::Saved { token, contact } => {
                if state.save_token == Some(token) {
                    state.fetch.replace(contact);
                    state.save_token = None;
                } else {
                    tracing::debug!(?token, "Ignoring outcome of a superseded save");
                }
                smallvec![Effect::None]
            },
            ContactAction::SaveFailed { token, message } => {
                if state.save_token == Some(token) {
                    state.update_error = Some(message);
                    state.save_token = None;
                }
                smallvec![Effect::None]
            },
        }
    }
}

/// Store running one pair's contact
pub type ContactStore = Store<ContactState, ContactAction, FeatureEnvironment, ContactReducer>;

/// Create a contact store
#[must_use]
pub fn contact_store(env: FeatureEnvironment) -> ContactStore {
    Store::new(ContactState::default(), ContactReducer, env)
}

const fn loaded_token(action: &ContactAction) -> Option<RequestToken> {
    match action {
        ContactAction::Loaded { token, .. } => Some(*token),
        _ => None,
    }
}

/// Mount the pair and wait until the fetch it started settles
///
/// Returns at once when either id is zero.
pub async fn mount_contact(
    store: &ContactStore,
    vendor_id: VendorId,
    tour_id: TourId,
    timeout: Duration,
) {
    let action = ContactAction::Mount { vendor_id, tour_id };
    dispatch_fetch(store, action, |s| s.fetch.pending(), loaded_token, timeout).await;
}

/// Fetch the contact again and wait until that fetch settles
pub async fn refetch_contact(store: &ContactStore, timeout: Duration) {
    dispatch_fetch(store, ContactAction::Refetch, |s| s.fetch.pending(), loaded_token, timeout).await;
}

/// Submit `form` and report whether the server accepted it
///
/// Refused while another save of the same contact is in flight.
pub async fn save_contact(store: &ContactStore, form: ContactForm, timeout: Duration) -> bool {
    let token = RequestToken::issue();
    let settled = dispatch_and_wait(
        store,
        ContactAction::Save { token, form },
        |a| match a {
            ContactAction::Saved { token: t, .. } | ContactAction::SaveFailed { token: t, .. } => *t == token,
            _ => false,
        },
        timeout,
    )
    .await;
    matches!(settled, Some(ContactAction::Saved { .. }))
}
