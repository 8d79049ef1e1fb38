//! Plain-text rendering of the dashboard, ticket list, and ticket detail

use crate::features::tickets::TicketsState;
use crate::features::vendor_tour::VendorTourState;
use crate::forms::{ContactFormState, PolicyFormState};
use crate::workflow::{PanelView, SetupPhase, SetupState, WorkflowSnapshot};
use std::fmt::{self, Display, Formatter};
use tour_desk_client::{ListingType, Ticket};

/// Number of tickets listed under "Recent Activity"
pub const RECENT_TICKETS: usize = 4;

const LOADING: &str = "...";

/// `part` as a whole percentage of `total`, rounding halves up
#[must_use]
pub const fn percentage(part: usize, total: usize) -> usize {
    if total == 0 {
        0
    } else {
        (part * 200 + total) / (2 * total)
    }
}

/// `new_listing` → `new listing`
fn listing_words(listing_type: ListingType) -> String {
    listing_type.to_string().replace('_', " ")
}

/// Figures shown on the dashboard
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardStats {
    /// `None` while the list is loading
    pub counts: Option<ListingCounts>,
    /// Up to [`RECENT_TICKETS`] tickets, in list order
    pub recent: Vec<Ticket>,
    /// Fetch error, if the last load failed
    pub error: Option<String>,
}

/// Ticket counts by listing type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListingCounts {
    /// All tickets
    pub total: usize,
    /// `new_listing` tickets
    pub new_listings: usize,
    /// `multi_variant` tickets
    pub multi_variant: usize,
}

impl ListingCounts {
    /// Share of `new_listing`, as a whole percentage
    #[must_use]
    pub const fn new_listing_share(&self) -> usize {
        percentage(self.new_listings, self.total)
    }

    /// Share of `multi_variant`, as a whole percentage
    #[must_use]
    pub const fn multi_variant_share(&self) -> usize {
        percentage(self.multi_variant, self.total)
    }
}

impl DashboardStats {
    /// Derive the figures from the ticket list
    #[must_use]
    pub fn from_state(state: &TicketsState) -> Self {
        let counts = (!state.fetch.loading()).then(|| ListingCounts {
            total: state.tickets().len(),
            new_listings: state.count(ListingType::NewListing),
            multi_variant: state.count(ListingType::MultiVariant),
        });
        let recent = state.tickets().iter().take(RECENT_TICKETS).cloned().collect();

        Self {
            counts,
            recent,
            error: state.fetch.error().map(str::to_string),
        }
    }
}

impl Display for DashboardStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let [total, new_listings, multi_variant] = self.counts.map_or_else(
            || [LOADING.to_string(), LOADING.to_string(), LOADING.to_string()],
            |c| [c.total, c.new_listings, c.multi_variant].map(|n| n.to_string()),
        );

        writeln!(f, "Dashboard")?;
        if let Some(error) = &self.error {
            writeln!(f, "  {error}")?;
        }
        writeln!(f, "  Total Tickets: {total}")?;
        writeln!(f, "  New Listings: {new_listings}")?;
        writeln!(f, "  Multi-Variant: {multi_variant}")?;

        writeln!(f)?;
        writeln!(f, "Recent Activity")?;
        match &self.counts {
            None => writeln!(f, "  Loading...")?,
            Some(_) if self.recent.is_empty() => writeln!(f, "  No tickets found")?,
            Some(_) => {
                for ticket in &self.recent {
                    writeln!(
                        f,
                        "  {} (Type: {})",
                        ticket.product_name,
                        listing_words(ticket.listing_type)
                    )?;
                }
            },
        }

        writeln!(f)?;
        writeln!(f, "Ticket Distribution")?;
        match &self.counts {
            None => writeln!(f, "  Loading..."),
            Some(counts) if counts.total == 0 => writeln!(f, "  No data available"),
            Some(counts) => {
                writeln!(f, "  New Listing: {}%", counts.new_listing_share())?;
                writeln!(f, "  Multi-Variant: {}%", counts.multi_variant_share())
            },
        }
    }
}

/// One ticket with its vendor/tour details
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketCard {
    /// The ticket
    pub ticket: Ticket,
    /// Vendor and tour fetched for the card
    pub details: VendorTourState,
}

impl Display for TicketCard {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] {} (#{})",
            self.ticket.listing_type.label(),
            self.ticket.product_name,
            self.ticket.id
        )?;

        if self.details.fetch.loading() {
            return writeln!(f, "    Loading...");
        }
        if self.details.fetch.error().is_some() {
            return writeln!(f, "    Error loading details");
        }
        if let Some(vendor) = self.details.vendor() {
            writeln!(f, "    Vendor: {}", vendor.name)?;
        }
        if let Some(tour) = self.details.tour() {
            writeln!(f, "    Tour: {}", tour.name)?;
            writeln!(f, "    Location: {}", tour.location)?;
        }
        Ok(())
    }
}

/// The ticket list page
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TicketList {
    /// Cards in list order
    pub cards: Vec<TicketCard>,
}

impl Display for TicketList {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "Available Tickets")?;
        if self.cards.is_empty() {
            return writeln!(f, "  No tickets available");
        }
        for card in &self.cards {
            write!(f, "  {card}")?;
        }
        Ok(())
    }
}

/// The ticket detail page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketDetail {
    /// The ticket
    pub ticket: Ticket,
    /// Its workflow panels
    pub workflow: WorkflowSnapshot,
}

fn write_panel<F>(
    f: &mut Formatter<'_>,
    title: &str,
    panel: &PanelView<F>,
    fields: impl Fn(&mut Formatter<'_>, &F) -> fmt::Result,
) -> fmt::Result {
    writeln!(f, "  {title}")?;
    match panel {
        PanelView::Loading => writeln!(f, "    Loading..."),
        PanelView::Failed { message } => {
            writeln!(f, "    {message}")?;
            writeln!(f, "    (retry available)")
        },
        PanelView::Ready {
            form,
            saving,
            save_error,
        } => {
            fields(f, form)?;
            if *saving {
                writeln!(f, "    Saving...")?;
            }
            if let Some(error) = save_error {
                writeln!(f, "    {error}")?;
            }
            Ok(())
        },
    }
}

fn write_policy(f: &mut Formatter<'_>, form: &PolicyFormState) -> fmt::Result {
    writeln!(f, "    Status: {}", form.status())?;
    let minutes = if form.minutes().is_empty() { "not set" } else { form.minutes() };
    writeln!(f, "    Cancellation before (minutes): {minutes}")
}

fn write_contact(f: &mut Formatter<'_>, form: &ContactFormState) -> fmt::Result {
    writeln!(f, "    Phone: {}", form.phone())?;
    writeln!(f, "    Email: {}", form.email())
}

fn write_setup(f: &mut Formatter<'_>, setup: &SetupState) -> fmt::Result {
    match setup.phase {
        SetupPhase::Required => {
            writeln!(f, "  Setup Required")?;
            writeln!(
                f,
                "    Before you can manage the details, this vendor-tour combination must be set up."
            )?;
            if let Some(error) = &setup.error {
                writeln!(f, "    {error}")?;
            }
            Ok(())
        },
        SetupPhase::InProgress => writeln!(f, "  Setting up..."),
        SetupPhase::Complete => {
            writeln!(f, "  Setup Complete")?;
            writeln!(
                f,
                "    You can now manage the cancellation policy and contact information."
            )?;
            write_panel(
                f,
                "Cancellation Policy",
                &PanelView::Ready {
                    form: PolicyFormState::default(),
                    saving: false,
                    save_error: None,
                },
                write_policy,
            )?;
            write_panel(
                f,
                "Contact Information",
                &PanelView::Ready {
                    form: ContactFormState::default(),
                    saving: false,
                    save_error: None,
                },
                write_contact,
            )
        },
    }
}

impl Display for TicketDetail {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.ticket.product_name)?;
        writeln!(f, "  ID: {}", self.ticket.id)?;
        writeln!(f, "  Vendor ID: {}", self.ticket.vendor_id)?;
        writeln!(f, "  Tour ID: {}", self.ticket.tour_id)?;
        writeln!(f, "  Listing Type: {}", listing_words(self.ticket.listing_type))?;
        writeln!(f)?;

        match &self.workflow {
            WorkflowSnapshot::NewListing { policy, contact } => {
                write_panel(f, "Cancellation Policy", policy, write_policy)?;
                write_panel(f, "Contact Information", contact, write_contact)
            },
            WorkflowSnapshot::MultiVariant { setup } => write_setup(f, setup),
        }
    }
}
