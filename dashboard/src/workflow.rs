//! Ticket detail workflows
//!
//! The ticket's listing type picks exactly one workflow:
//!
//! - `new_listing`: the pair's cancellation policy and contact are fetched
//!   and edited directly.
//! - `multi_variant`: the pair must be set up first. Setup is a small state
//!   machine (`Required → InProgress → Complete`, failures fall back to
//!   `Required`) driven by an injected [`SetupProvisioner`]. Once complete,
//!   default forms are offered whose submissions are validated but not
//!   sent anywhere.

use crate::features::contact::{
    contact_store, mount_contact, refetch_contact, save_contact, ContactState, ContactStore,
};
use crate::features::policy::{
    mount_policy, policy_store, refetch_policy, save_policy, PolicyState, PolicyStore,
};
use crate::features::{dispatch_and_wait, Fetch, FeatureEnvironment};
use crate::forms::{ContactField, ContactFormState, PolicyField, PolicyFormState, ValidationErrors};
use crate::links::{LinkError, LinkRepository};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tour_desk_client::{ListingType, Ticket, TourId, VendorId};
use tour_desk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use tour_desk_runtime::Store;

/// Delay of [`SimulatedSetup`] unless configured otherwise
pub const DEFAULT_SETUP_DELAY: Duration = Duration::from_millis(1000);

/// What a form panel can show
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PanelView<F> {
    /// The entity fetch has not settled
    Loading,
    /// The entity fetch failed; offer a retry
    Failed {
        /// Display-ready message
        message: String,
    },
    /// The form can be edited
    Ready {
        /// Initial values
        form: F,
        /// A save is in flight
        saving: bool,
        /// Message of the last failed save
        save_error: Option<String>,
    },
}

impl<F> PanelView<F> {
    fn from_fetch<T>(
        fetch: &Fetch<T>,
        saving: bool,
        save_error: Option<&String>,
        form: impl FnOnce(Option<&T>) -> F,
    ) -> Self {
        if fetch.loading() {
            Self::Loading
        } else if let Some(message) = fetch.error() {
            Self::Failed {
                message: message.to_string(),
            }
        } else {
            Self::Ready {
                form: form(fetch.data()),
                saving,
                save_error: save_error.cloned(),
            }
        }
    }
}

/// Outcome of submitting a form
pub type Submission<F> = Result<bool, ValidationErrors<F>>;

/// Editable policy and contact of a `new_listing` ticket
pub struct NewListingWorkflow {
    policy: PolicyStore,
    contact: ContactStore,
    timeout: Duration,
}

impl NewListingWorkflow {
    /// Mount both features for the pair and wait for their fetches
    pub async fn open(
        env: FeatureEnvironment,
        vendor_id: VendorId,
        tour_id: TourId,
        timeout: Duration,
    ) -> Self {
        let workflow = Self {
            policy: policy_store(env.clone()),
            contact: contact_store(env),
            timeout,
        };
        tokio::join!(
            mount_policy(&workflow.policy, vendor_id, tour_id, timeout),
            mount_contact(&workflow.contact, vendor_id, tour_id, timeout),
        );
        workflow
    }

    /// Snapshot of the policy feature
    pub async fn policy_state(&self) -> PolicyState {
        self.policy.state(Clone::clone).await
    }

    /// Snapshot of the contact feature
    pub async fn contact_state(&self) -> ContactState {
        self.contact.state(Clone::clone).await
    }

    /// The policy panel
    pub async fn policy_panel(&self) -> PanelView<PolicyFormState> {
        self.policy
            .state(|s| {
                PanelView::from_fetch(
                    &s.fetch,
                    s.update_loading(),
                    s.update_error.as_ref(),
                    PolicyFormState::from_policy,
                )
            })
            .await
    }

    /// The contact panel
    pub async fn contact_panel(&self) -> PanelView<ContactFormState> {
        self.contact
            .state(|s| {
                PanelView::from_fetch(
                    &s.fetch,
                    s.update_loading(),
                    s.update_error.as_ref(),
                    ContactFormState::from_contact,
                )
            })
            .await
    }

    /// Validate `form` and save it
    ///
    /// # Errors
    ///
    /// Returns the field errors when validation fails; nothing is sent.
    pub async fn submit_policy(&self, form: &mut PolicyFormState) -> Submission<PolicyField> {
        let form = form.validate()?;
        Ok(save_policy(&self.policy, form, self.timeout).await)
    }

    /// Validate `form` and save it
    ///
    /// # Errors
    ///
    /// Returns the field errors when validation fails; nothing is sent.
    pub async fn submit_contact(&self, form: &mut ContactFormState) -> Submission<ContactField> {
        let form = form.validate()?;
        Ok(save_contact(&self.contact, form, self.timeout).await)
    }

    /// Fetch the policy again
    pub async fn retry_policy(&self) {
        refetch_policy(&self.policy, self.timeout).await;
    }

    /// Fetch the contact again
    pub async fn retry_contact(&self) {
        refetch_contact(&self.contact, self.timeout).await;
    }

    /// Stop both stores, waiting up to the configured timeout for effects
    pub async fn close(&self) {
        let (policy, contact) = tokio::join!(
            self.policy.shutdown(self.timeout),
            self.contact.shutdown(self.timeout)
        );
        if let Err(error) = policy.and(contact) {
            tracing::warn!(%error, "New listing workflow closed with pending effects");
        }
    }
}

impl std::fmt::Debug for NewListingWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewListingWorkflow")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Errors from a setup provisioner
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SetupError {
    /// Creating the vendor-tour link failed
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Boxed future returned by [`SetupProvisioner::provision`]
pub type SetupFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SetupError>> + Send + 'a>>;

/// Performs the one-off setup of a vendor/tour pair
pub trait SetupProvisioner: Send + Sync {
    /// Set the pair up
    fn provision(&self, vendor_id: VendorId, tour_id: TourId) -> SetupFuture<'_>;
}

/// Waits a fixed delay and touches nothing
#[derive(Clone, Copy, Debug)]
pub struct SimulatedSetup {
    delay: Duration,
}

impl SimulatedSetup {
    /// Provisioner that completes after `delay`
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedSetup {
    fn default() -> Self {
        Self::new(DEFAULT_SETUP_DELAY)
    }
}

impl SetupProvisioner for SimulatedSetup {
    fn provision(&self, vendor_id: VendorId, tour_id: TourId) -> SetupFuture<'_> {
        Box::pin(async move {
            tracing::debug!(vendor_id, tour_id, delay = ?self.delay, "Simulating setup");
            tokio::time::sleep(self.delay).await;
            Ok(())
        })
    }
}

/// Records the pair through a [`LinkRepository`]
pub struct LinkedSetup {
    links: Arc<dyn LinkRepository>,
}

impl LinkedSetup {
    /// Provisioner backed by `links`
    #[must_use]
    pub fn new(links: Arc<dyn LinkRepository>) -> Self {
        Self { links }
    }
}

impl std::fmt::Debug for LinkedSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkedSetup").finish_non_exhaustive()
    }
}

impl SetupProvisioner for LinkedSetup {
    fn provision(&self, vendor_id: VendorId, tour_id: TourId) -> SetupFuture<'_> {
        Box::pin(async move {
            self.links.create_if_absent(vendor_id, tour_id).await?;
            Ok(())
        })
    }
}

/// Where the pair is in its setup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SetupPhase {
    /// Setup has not run (or the last attempt failed)
    #[default]
    Required,
    /// The provisioner is running
    InProgress,
    /// Forms are available
    Complete,
}

/// State of the setup machine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SetupState {
    /// Vendor of the pair
    pub vendor_id: VendorId,
    /// Tour of the pair
    pub tour_id: TourId,
    /// Current phase
    pub phase: SetupPhase,
    /// Message of the last failed attempt
    pub error: Option<String>,
}

/// Actions of the setup machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetupAction {
    /// Start setup; ignored unless the phase is `Required`
    BeginSetup,
    /// The provisioner succeeded
    SetupFinished,
    /// The provisioner failed
    SetupFailed {
        /// Display-ready message
        message: String,
    },
}

/// Dependencies of the setup machine
#[derive(Clone)]
pub struct SetupEnvironment {
    /// Performs the setup
    pub provisioner: Arc<dyn SetupProvisioner>,
}

/// Reducer for the setup machine
#[derive(Clone, Debug, Default)]
pub struct SetupReducer;

impl Reducer for SetupReducer {
    type State = SetupState;
    type Action = SetupAction;
    type Environment = SetupEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SetupAction::BeginSetup => {
                if state.phase != SetupPhase::Required {
                    return smallvec![Effect::None];
                }
                state.phase = SetupPhase::InProgress;
                state.error = None;

                let provisioner = Arc::clone(&env.provisioner);
                let (vendor_id, tour_id) = (state.vendor_id, state.tour_id);
                smallvec![Effect::future(async move {
                    match provisioner.provision(vendor_id, tour_id).await {
                        Ok(()) => Some(SetupAction::SetupFinished),
                        Err(error) => {
                            tracing::error!(%error, vendor_id, tour_id, "Setup failed");
                            Some(SetupAction::SetupFailed {
                                message: format!("Failed to set up vendor tour: {error}"),
                            })
                        },
                    }
                })]
            },
            SetupAction::SetupFinished => {
                state.phase = SetupPhase::Complete;
                tracing::info!(
                    vendor_id = state.vendor_id,
                    tour_id = state.tour_id,
                    "Setup complete"
                );
                smallvec![Effect::None]
            },
            SetupAction::SetupFailed { message } => {
                state.phase = SetupPhase::Required;
                state.error = Some(message);
                smallvec![Effect::None]
            },
        }
    }
}

type SetupStore = Store<SetupState, SetupAction, SetupEnvironment, SetupReducer>;

/// Setup-gated forms of a `multi_variant` ticket
pub struct MultiVariantWorkflow {
    setup: SetupStore,
    timeout: Duration,
}

impl MultiVariantWorkflow {
    /// Fresh workflow in `Required`; nothing is fetched
    #[must_use]
    pub fn open(
        provisioner: Arc<dyn SetupProvisioner>,
        vendor_id: VendorId,
        tour_id: TourId,
        timeout: Duration,
    ) -> Self {
        let state = SetupState {
            vendor_id,
            tour_id,
            ..SetupState::default()
        };
        Self {
            setup: Store::new(state, SetupReducer, SetupEnvironment { provisioner }),
            timeout,
        }
    }

    /// Snapshot of the setup machine
    pub async fn state(&self) -> SetupState {
        self.setup.state(Clone::clone).await
    }

    /// Current phase
    pub async fn phase(&self) -> SetupPhase {
        self.setup.state(|s| s.phase).await
    }

    /// Start setup without waiting for it
    pub async fn begin_setup(&self) {
        if let Err(error) = self.setup.send(SetupAction::BeginSetup).await {
            tracing::warn!(%error, "Setup request rejected");
        }
    }

    /// Start setup and wait until it completes or fails
    pub async fn run_setup(&self) -> SetupPhase {
        if self.phase().await == SetupPhase::Required {
            dispatch_and_wait(
                &self.setup,
                SetupAction::BeginSetup,
                |a| matches!(a, SetupAction::SetupFinished | SetupAction::SetupFailed { .. }),
                self.timeout,
            )
            .await;
        }
        self.phase().await
    }

    /// Default forms, offered only once setup is complete
    pub async fn forms(&self) -> Option<(PolicyFormState, ContactFormState)> {
        (self.phase().await == SetupPhase::Complete)
            .then(|| (PolicyFormState::default(), ContactFormState::default()))
    }

    /// Validate `form`; accepted input is not persisted
    ///
    /// # Errors
    ///
    /// Returns the field errors when validation fails.
    pub fn submit_policy(&self, form: &mut PolicyFormState) -> Submission<PolicyField> {
        let form = form.validate()?;
        tracing::debug!(?form, "Accepted multi-variant policy");
        Ok(true)
    }

    /// Validate `form`; accepted input is not persisted
    ///
    /// # Errors
    ///
    /// Returns the field errors when validation fails.
    pub fn submit_contact(&self, form: &mut ContactFormState) -> Submission<ContactField> {
        let form = form.validate()?;
        tracing::debug!(?form, "Accepted multi-variant contact");
        Ok(true)
    }

    /// Stop the setup store; an unfinished setup is abandoned
    pub async fn close(&self) {
        if let Err(error) = self.setup.shutdown(Duration::ZERO).await {
            tracing::debug!(%error, "Abandoned pending setup");
        }
    }
}

impl std::fmt::Debug for MultiVariantWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiVariantWorkflow")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of a workflow
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkflowSnapshot {
    /// Policy and contact panels
    NewListing {
        /// Cancellation policy panel
        policy: PanelView<PolicyFormState>,
        /// Contact panel
        contact: PanelView<ContactFormState>,
    },
    /// Setup progress
    MultiVariant {
        /// Setup machine state
        setup: SetupState,
    },
}

/// The workflow selected by a ticket's listing type
#[derive(Debug)]
pub enum TicketWorkflow {
    /// Direct editing
    NewListing(NewListingWorkflow),
    /// Setup first, then stand-in forms
    MultiVariant(MultiVariantWorkflow),
}

impl TicketWorkflow {
    /// Open the workflow matching `ticket.listing_type`
    pub async fn open(
        ticket: &Ticket,
        env: FeatureEnvironment,
        provisioner: Arc<dyn SetupProvisioner>,
        timeout: Duration,
    ) -> Self {
        tracing::debug!(
            ticket_id = ticket.id,
            listing_type = %ticket.listing_type,
            "Opening workflow"
        );
        match ticket.listing_type {
            ListingType::NewListing => Self::NewListing(
                NewListingWorkflow::open(env, ticket.vendor_id, ticket.tour_id, timeout).await,
            ),
            ListingType::MultiVariant => Self::MultiVariant(MultiVariantWorkflow::open(
                provisioner,
                ticket.vendor_id,
                ticket.tour_id,
                timeout,
            )),
        }
    }

    /// Listing type this workflow serves
    #[must_use]
    pub const fn listing_type(&self) -> ListingType {
        match self {
            Self::NewListing(_) => ListingType::NewListing,
            Self::MultiVariant(_) => ListingType::MultiVariant,
        }
    }

    /// Current panels, for rendering
    pub async fn snapshot(&self) -> WorkflowSnapshot {
        match self {
            Self::NewListing(workflow) => {
                let (policy, contact) =
                    tokio::join!(workflow.policy_panel(), workflow.contact_panel());
                WorkflowSnapshot::NewListing { policy, contact }
            },
            Self::MultiVariant(workflow) => WorkflowSnapshot::MultiVariant {
                setup: workflow.state().await,
            },
        }
    }

    /// Stop the workflow's stores
    pub async fn close(&self) {
        match self {
            Self::NewListing(workflow) => workflow.close().await,
            Self::MultiVariant(workflow) => workflow.close().await,
        }
    }
}
