//! # Tour Desk
//!
//! Administrative dashboard for tour tickets. Each ticket pairs a vendor
//! with a tour and carries a listing type that decides how its cancellation
//! policy and contact information are managed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   handles   ┌──────────────┐
//! │ TourDeskApp  │────────────▶│ AlertBroker  │
//! └──────────────┘             └──────────────┘
//!        │ opens                      ▲ notify
//!        ▼                            │
//! ┌──────────────┐  Store<S, A, E, R> per feature
//! │TicketWorkflow│──▶ tickets · vendor_tour · policy · contact · link
//! └──────────────┘            │
//!                             ▼
//!                   TicketApi / LinkRepository
//! ```
//!
//! Every feature is a reducer driven by a [`tour_desk_runtime::Store`]:
//! fetches and saves run as effects, results come back as actions, and
//! request tokens keep a slow response from overwriting a newer one.

pub mod alerts;
pub mod app;
pub mod config;
pub mod features;
pub mod forms;
pub mod links;
pub mod storage;
pub mod view;
pub mod workflow;

pub use alerts::{Alert, AlertBroker, AlertError, AlertHandle, AlertId, AlertKind};
pub use app::{AppError, OpenTicket, TourDeskApp};
pub use config::{Config, LinkBackend, SetupMode};
pub use links::{LinkError, LinkRepository, LocalLinkRepository, RemoteLinkRepository};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StorageError};
pub use workflow::{
    LinkedSetup, MultiVariantWorkflow, NewListingWorkflow, PanelView, SetupPhase,
    SetupProvisioner, SimulatedSetup, TicketWorkflow,
};
