//! Application scope
//!
//! [`TourDeskApp`] wires the collaborators chosen by [`Config`]: the API
//! client, the link repository backend, the setup provisioner, and the
//! alert broker whose handles every feature receives.

use crate::alerts::{AlertBroker, AlertHandle};
use crate::config::{Config, LinkBackend, SetupMode};
use crate::features::link::{link_store, mount_link, LinkEnvironment, LinkStore};
use crate::features::tickets::{load_tickets, tickets_store, TicketsState, TicketsStore};
use crate::features::vendor_tour::{mount_vendor_tour, vendor_tour_store};
use crate::features::FeatureEnvironment;
use crate::links::{LinkRepository, LocalLinkRepository, RemoteLinkRepository};
use crate::storage::FileKeyValueStore;
use crate::view::{DashboardStats, TicketCard, TicketDetail, TicketList};
use crate::workflow::{LinkedSetup, SetupProvisioner, SimulatedSetup, TicketWorkflow};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tour_desk_client::{ApiClient, ApiError, Ticket, TicketApi, TourId, VendorId};
use tour_desk_core::environment::{Clock, SystemClock};

/// Application-level errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    /// The requested ticket could not be loaded
    #[error("Failed to load ticket {id}: {source}")]
    Ticket {
        /// Requested ticket
        id: u64,
        /// Underlying failure
        source: ApiError,
    },
}

/// The dashboard application
pub struct TourDeskApp {
    api: Arc<dyn TicketApi>,
    links: Arc<dyn LinkRepository>,
    provisioner: Arc<dyn SetupProvisioner>,
    alerts: AlertBroker,
    tickets: TicketsStore,
    wait_timeout: Duration,
}

impl TourDeskApp {
    /// Build the application against the configured API
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let api: Arc<dyn TicketApi> = Arc::new(ApiClient::new(config.api_url.clone()));
        Self::with_api(config, api, Arc::new(SystemClock))
    }

    /// Build the application around an existing API and clock
    #[must_use]
    pub fn with_api(config: &Config, api: Arc<dyn TicketApi>, clock: Arc<dyn Clock>) -> Self {
        let links: Arc<dyn LinkRepository> = match config.link_backend {
            LinkBackend::Remote => {
                Arc::new(RemoteLinkRepository::new(Arc::clone(&api), Arc::clone(&clock)))
            },
            LinkBackend::Local => Arc::new(LocalLinkRepository::new(
                Arc::new(FileKeyValueStore::new(config.storage_path.clone())),
                Arc::clone(&clock),
            )),
        };

        let provisioner: Arc<dyn SetupProvisioner> = match config.setup_mode {
            SetupMode::Simulated => Arc::new(SimulatedSetup::new(config.setup_delay())),
            SetupMode::Linked => Arc::new(LinkedSetup::new(Arc::clone(&links))),
        };

        let alerts = AlertBroker::new(clock, config.alert_timeout());
        let tickets = tickets_store(FeatureEnvironment::new(Arc::clone(&api), alerts.handle()));

        tracing::info!(
            api_url = %config.api_url,
            link_backend = ?config.link_backend,
            setup_mode = ?config.setup_mode,
            "Application initialized"
        );

        Self {
            api,
            links,
            provisioner,
            alerts,
            tickets,
            wait_timeout: config.wait_timeout(),
        }
    }

    fn feature_env(&self) -> FeatureEnvironment {
        FeatureEnvironment::new(Arc::clone(&self.api), self.alerts.handle())
    }

    /// A handle onto the alert queue
    #[must_use]
    pub fn alerts(&self) -> AlertHandle {
        self.alerts.handle()
    }

    /// The alert broker itself
    #[must_use]
    pub const fn alert_broker(&self) -> &AlertBroker {
        &self.alerts
    }

    /// Fetch the ticket list and return the settled state
    pub async fn refresh_tickets(&self) -> TicketsState {
        load_tickets(&self.tickets, self.wait_timeout).await;
        self.tickets().await
    }

    /// Current ticket list state, without fetching
    pub async fn tickets(&self) -> TicketsState {
        self.tickets.state(Clone::clone).await
    }

    /// Dashboard figures for the current ticket list
    pub async fn dashboard(&self) -> DashboardStats {
        self.tickets.state(DashboardStats::from_state).await
    }

    /// Ticket cards, each with its vendor and tour fetched concurrently
    pub async fn ticket_list(&self) -> TicketList {
        let tickets = self.tickets.state(|s| s.tickets().to_vec()).await;

        let cards = tickets.into_iter().map(|ticket| async move {
            let store = vendor_tour_store(self.feature_env());
            mount_vendor_tour(&store, ticket.vendor_id, ticket.tour_id, self.wait_timeout).await;
            let details = store.state(Clone::clone).await;
            TicketCard { ticket, details }
        });

        TicketList {
            cards: join_all(cards).await,
        }
    }

    async fn find_ticket(&self, id: u64) -> Result<Ticket, AppError> {
        if let Some(ticket) = self.tickets.state(|s| s.ticket(id).cloned()).await {
            return Ok(ticket);
        }
        self.api
            .ticket(id)
            .await
            .map_err(|source| AppError::Ticket { id, source })
    }

    /// Open a ticket's detail with the workflow its listing type selects
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Ticket`] if the ticket is neither in the loaded
    /// list nor retrievable by id.
    pub async fn open_ticket(&self, id: u64) -> Result<OpenTicket, AppError> {
        let ticket = self.find_ticket(id).await?;
        let workflow = TicketWorkflow::open(
            &ticket,
            self.feature_env(),
            Arc::clone(&self.provisioner),
            self.wait_timeout,
        )
        .await;
        tracing::info!(ticket_id = id, listing_type = %ticket.listing_type, "Opened ticket");

        Ok(OpenTicket { ticket, workflow })
    }

    /// Link feature for a pair, with its lookup settled
    pub async fn vendor_tour_link(&self, vendor_id: VendorId, tour_id: TourId) -> LinkStore {
        let env = LinkEnvironment::new(Arc::clone(&self.links), self.alerts.handle());
        let store = link_store(env);
        mount_link(&store, vendor_id, tour_id, self.wait_timeout).await;
        store
    }

    /// Stop the ticket store and close the alert broker
    pub async fn shutdown(&self) {
        if let Err(error) = self.tickets.shutdown(self.wait_timeout).await {
            tracing::warn!(%error, "Ticket store closed with pending effects");
        }
        self.alerts.shutdown().await;
        tracing::info!("Application shut down");
    }
}

impl std::fmt::Debug for TourDeskApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TourDeskApp")
            .field("alerts", &self.alerts)
            .field("wait_timeout", &self.wait_timeout)
            .finish_non_exhaustive()
    }
}

/// An opened ticket
///
/// Reopening a ticket creates a fresh workflow, so multi-variant setup
/// starts over.
#[derive(Debug)]
pub struct OpenTicket {
    /// The ticket
    pub ticket: Ticket,
    /// Its workflow
    pub workflow: TicketWorkflow,
}

impl OpenTicket {
    /// Render-ready snapshot of the detail page
    pub async fn detail(&self) -> TicketDetail {
        TicketDetail {
            ticket: self.ticket.clone(),
            workflow: self.workflow.snapshot().await,
        }
    }

    /// Stop the workflow
    pub async fn close(&self) {
        self.workflow.close().await;
    }
}
