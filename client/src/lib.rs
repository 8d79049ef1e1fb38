//! # Tour Desk API Client
//!
//! Rust client for the ticket API: vendors, tours, tickets, cancellation
//! policies, contacts, and vendor-tour links, all exchanged as plain JSON.
//!
//! ## Example
//!
//! ```no_run
//! use tour_desk_client::{ApiClient, TicketApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new("http://localhost:3000");
//!
//!     let tickets = client.tickets().await?;
//!     println!("{} tickets", tickets.len());
//!     Ok(())
//! }
//! ```
//!
//! Non-2xx responses become [`ApiError::Http`] carrying the server's
//! `message` (or one synthesized from the status); transport failures become
//! [`ApiError::Network`].

pub mod api;
pub mod client;
pub mod error;
pub mod types;

// Re-export main types for convenience
pub use api::{ApiFuture, TicketApi};
pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use types::{
    CancellationPolicy, CancellationPolicyForm, Contact, ContactForm, ListingType,
    NewCancellationPolicy, NewContact, NewVendorTourLink, PolicyStatus, Ticket, Tour, TourId,
    Vendor, VendorId, VendorTourLink,
};
