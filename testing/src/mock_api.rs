//! In-memory `TicketApi` for tests
//!
//! Holds one table per entity, records every call, and can be told to fail
//! or stall a given endpoint. Stalls use `tokio::time::sleep`, so tests
//! running with paused time control exactly when responses arrive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tour_desk_client::{
    ApiError, ApiFuture, CancellationPolicy, CancellationPolicyForm, Contact, ContactForm,
    NewCancellationPolicy, NewContact, NewVendorTourLink, Ticket, TicketApi, Tour, TourId, Vendor,
    VendorId, VendorTourLink,
};

/// Endpoint selector for injected failures and latency
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `GET /vendors`
    Vendors,
    /// `GET /vendors/{id}`
    Vendor,
    /// `GET /tours`
    Tours,
    /// `GET /tours/{id}`
    Tour,
    /// `GET /tickets`
    Tickets,
    /// `GET /tickets/{id}`
    Ticket,
    /// `GET /cancellationPolicy` with or without a pair filter
    CancellationPolicies,
    /// `PUT /cancellationPolicy/{id}`
    UpdateCancellationPolicy,
    /// `POST /cancellationPolicy`
    CreateCancellationPolicy,
    /// `GET /contact` with or without a pair filter
    Contacts,
    /// `PUT /contact/{id}`
    UpdateContact,
    /// `POST /contact`
    CreateContact,
    /// `GET /vendorTours?...`
    VendorTours,
    /// `POST /vendorTours`
    CreateVendorTour,
}

/// A recorded call with its arguments
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiCall {
    /// `vendors()`
    Vendors,
    /// `vendor(id)`
    Vendor(VendorId),
    /// `tours()`
    Tours,
    /// `tour(id)`
    Tour(TourId),
    /// `tickets()`
    Tickets,
    /// `ticket(id)`
    Ticket(u64),
    /// `cancellation_policies()`
    CancellationPolicies,
    /// `cancellation_policies_for(vendor, tour)`
    CancellationPoliciesFor(VendorId, TourId),
    /// `update_cancellation_policy(id, form)`
    UpdateCancellationPolicy(u64, CancellationPolicyForm),
    /// `create_cancellation_policy(body)`
    CreateCancellationPolicy(NewCancellationPolicy),
    /// `contacts()`
    Contacts,
    /// `contacts_for(vendor, tour)`
    ContactsFor(VendorId, TourId),
    /// `update_contact(id, form)`
    UpdateContact(u64, ContactForm),
    /// `create_contact(body)`
    CreateContact(NewContact),
    /// `vendor_tours_for(vendor, tour)`
    VendorToursFor(VendorId, TourId),
    /// `create_vendor_tour(body)`
    CreateVendorTour(NewVendorTourLink),
}

impl ApiCall {
    /// The endpoint this call targets
    #[must_use]
    pub const fn endpoint(&self) -> Endpoint {
        match self {
            Self::Vendors => Endpoint::Vendors,
            Self::Vendor(_) => Endpoint::Vendor,
            Self::Tours => Endpoint::Tours,
            Self::Tour(_) => Endpoint::Tour,
            Self::Tickets => Endpoint::Tickets,
            Self::Ticket(_) => Endpoint::Ticket,
            Self::CancellationPolicies | Self::CancellationPoliciesFor(..) => {
                Endpoint::CancellationPolicies
            },
            Self::UpdateCancellationPolicy(..) => Endpoint::UpdateCancellationPolicy,
            Self::CreateCancellationPolicy(_) => Endpoint::CreateCancellationPolicy,
            Self::Contacts | Self::ContactsFor(..) => Endpoint::Contacts,
            Self::UpdateContact(..) => Endpoint::UpdateContact,
            Self::CreateContact(_) => Endpoint::CreateContact,
            Self::VendorToursFor(..) => Endpoint::VendorTours,
            Self::CreateVendorTour(_) => Endpoint::CreateVendorTour,
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    vendors: Vec<Vendor>,
    tours: Vec<Tour>,
    tickets: Vec<Ticket>,
    policies: Vec<CancellationPolicy>,
    contacts: Vec<Contact>,
    links: Vec<VendorTourLink>,
    failures: HashMap<Endpoint, ApiError>,
    latency: HashMap<Endpoint, Duration>,
    calls: Vec<ApiCall>,
    next_id: u64,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory ticket API
///
/// Cloning yields another handle onto the same tables.
///
/// # Example
///
/// ```
/// use tour_desk_testing::mocks::{Endpoint, MockTicketApi};
/// use tour_desk_client::ApiError;
///
/// let api = MockTicketApi::new()
///     .with_vendor(tour_desk_testing::fixtures::vendor(1, "Acme Tours"))
///     .failing(Endpoint::Tickets, ApiError::http(500, None, None));
/// assert_eq!(api.calls().len(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MockTicketApi {
    tables: Arc<Mutex<Tables>>,
}

fn not_found() -> ApiError {
    ApiError::http(404, Some("Not Found"), None)
}

impl MockTicketApi {
    /// Create an empty mock; created entities get ids starting at 1000
    #[must_use]
    pub fn new() -> Self {
        let tables = Tables {
            next_id: 999,
            ..Tables::default()
        };
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a vendor
    #[must_use]
    pub fn with_vendor(self, vendor: Vendor) -> Self {
        self.lock().vendors.push(vendor);
        self
    }

    /// Seed a tour
    #[must_use]
    pub fn with_tour(self, tour: Tour) -> Self {
        self.lock().tours.push(tour);
        self
    }

    /// Seed a ticket
    #[must_use]
    pub fn with_ticket(self, ticket: Ticket) -> Self {
        self.lock().tickets.push(ticket);
        self
    }

    /// Seed a cancellation policy
    #[must_use]
    pub fn with_policy(self, policy: CancellationPolicy) -> Self {
        self.lock().policies.push(policy);
        self
    }

    /// Seed a contact
    #[must_use]
    pub fn with_contact(self, contact: Contact) -> Self {
        self.lock().contacts.push(contact);
        self
    }

    /// Seed a vendor-tour link
    #[must_use]
    pub fn with_link(self, link: VendorTourLink) -> Self {
        self.lock().links.push(link);
        self
    }

    /// Make every call to `endpoint` fail with `error`
    #[must_use]
    pub fn failing(self, endpoint: Endpoint, error: ApiError) -> Self {
        self.fail(endpoint, error);
        self
    }

    /// Make every call to `endpoint` fail with `error` from now on
    pub fn fail(&self, endpoint: Endpoint, error: ApiError) {
        self.lock().failures.insert(endpoint, error);
    }

    /// Stop failing `endpoint`
    pub fn recover(&self, endpoint: Endpoint) {
        self.lock().failures.remove(&endpoint);
    }

    /// Delay every response from `endpoint` by `latency`
    pub fn stall(&self, endpoint: Endpoint, latency: Duration) {
        self.lock().latency.insert(endpoint, latency);
    }

    /// Remove an injected delay
    pub fn unstall(&self, endpoint: Endpoint) {
        self.lock().latency.remove(&endpoint);
    }

    /// All calls so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Number of calls that targeted `endpoint`
    #[must_use]
    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.endpoint() == endpoint)
            .count()
    }

    /// Current cancellation policies
    #[must_use]
    pub fn policies(&self) -> Vec<CancellationPolicy> {
        self.lock().policies.clone()
    }

    /// Current contacts
    #[must_use]
    pub fn contacts(&self) -> Vec<Contact> {
        self.lock().contacts.clone()
    }

    /// Current vendor-tour links
    #[must_use]
    pub fn links(&self) -> Vec<VendorTourLink> {
        self.lock().links.clone()
    }

    /// Record `call`, honour injected latency and failure, then run `op`
    async fn respond<T, F>(&self, call: ApiCall, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Tables) -> Result<T, ApiError> + Send,
    {
        let endpoint = call.endpoint();
        let latency = {
            let mut tables = self.lock();
            tables.calls.push(call);
            tables.latency.get(&endpoint).copied()
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut tables = self.lock();
        if let Some(error) = tables.failures.get(&endpoint) {
            return Err(error.clone());
        }
        op(&mut tables)
    }
}

impl TicketApi for MockTicketApi {
    fn vendors(&self) -> ApiFuture<'_, Vec<Vendor>> {
        Box::pin(self.respond(ApiCall::Vendors, |t| Ok(t.vendors.clone())))
    }

    fn vendor(&self, id: VendorId) -> ApiFuture<'_, Vendor> {
        Box::pin(self.respond(ApiCall::Vendor(id), move |t| {
            t.vendors.iter().find(|v| v.id == id).cloned().ok_or_else(not_found)
        }))
    }

    fn tours(&self) -> ApiFuture<'_, Vec<Tour>> {
        Box::pin(self.respond(ApiCall::Tours, |t| Ok(t.tours.clone())))
    }

    fn tour(&self, id: TourId) -> ApiFuture<'_, Tour> {
        Box::pin(self.respond(ApiCall::Tour(id), move |t| {
            t.tours.iter().find(|tour| tour.id == id).cloned().ok_or_else(not_found)
        }))
    }

    fn tickets(&self) -> ApiFuture<'_, Vec<Ticket>> {
        Box::pin(self.respond(ApiCall::Tickets, |t| Ok(t.tickets.clone())))
    }

    fn ticket(&self, id: u64) -> ApiFuture<'_, Ticket> {
        Box::pin(self.respond(ApiCall::Ticket(id), move |t| {
            t.tickets.iter().find(|ticket| ticket.id == id).cloned().ok_or_else(not_found)
        }))
    }

    fn cancellation_policies(&self) -> ApiFuture<'_, Vec<CancellationPolicy>> {
        Box::pin(self.respond(ApiCall::CancellationPolicies, |t| Ok(t.policies.clone())))
    }

    fn cancellation_policies_for(
        &self,
        vendor_id: VendorId,
        tour_id: TourId,
    ) -> ApiFuture<'_, Vec<CancellationPolicy>> {
        let call = ApiCall::CancellationPoliciesFor(vendor_id, tour_id);
        Box::pin(self.respond(call, move |t| {
            Ok(t.policies
                .iter()
                .filter(|p| p.vendor_id == vendor_id && p.tour_id == tour_id)
                .cloned()
                .collect())
        }))
    }

    fn update_cancellation_policy(
        &self,
        id: u64,
        form: CancellationPolicyForm,
    ) -> ApiFuture<'_, CancellationPolicy> {
        let call = ApiCall::UpdateCancellationPolicy(id, form.clone());
        Box::pin(self.respond(call, move |t| {
            let policy = t.policies.iter_mut().find(|p| p.id == id).ok_or_else(not_found)?;
            policy.status = form.status;
            policy.cancellation_before_minutes = form.cancellation_before_minutes;
            Ok(policy.clone())
        }))
    }

    fn create_cancellation_policy(
        &self,
        policy: NewCancellationPolicy,
    ) -> ApiFuture<'_, CancellationPolicy> {
        let call = ApiCall::CreateCancellationPolicy(policy.clone());
        Box::pin(self.respond(call, move |t| {
            let created = CancellationPolicy {
                id: t.allocate_id(),
                vendor_id: policy.vendor_id,
                tour_id: policy.tour_id,
                status: policy.status,
                cancellation_before_minutes: policy.cancellation_before_minutes,
            };
            t.policies.push(created.clone());
            Ok(created)
        }))
    }

    fn contacts(&self) -> ApiFuture<'_, Vec<Contact>> {
        Box::pin(self.respond(ApiCall::Contacts, |t| Ok(t.contacts.clone())))
    }

    fn contacts_for(&self, vendor_id: VendorId, tour_id: TourId) -> ApiFuture<'_, Vec<Contact>> {
        let call = ApiCall::ContactsFor(vendor_id, tour_id);
        Box::pin(self.respond(call, move |t| {
            Ok(t.contacts
                .iter()
                .filter(|c| c.vendor_id == vendor_id && c.tour_id == tour_id)
                .cloned()
                .collect())
        }))
    }

    fn update_contact(&self, id: u64, form: ContactForm) -> ApiFuture<'_, Contact> {
        let call = ApiCall::UpdateContact(id, form.clone());
        Box::pin(self.respond(call, move |t| {
            let contact = t.contacts.iter_mut().find(|c| c.id == id).ok_or_else(not_found)?;
            contact.phone = form.phone;
            contact.email = form.email;
            Ok(contact.clone())
        }))
    }

    fn create_contact(&self, contact: NewContact) -> ApiFuture<'_, Contact> {
        let call = ApiCall::CreateContact(contact.clone());
        Box::pin(self.respond(call, move |t| {
            let created = Contact {
                id: t.allocate_id(),
                vendor_id: contact.vendor_id,
                tour_id: contact.tour_id,
                phone: contact.phone,
                email: contact.email,
            };
            t.contacts.push(created.clone());
            Ok(created)
        }))
    }

    fn vendor_tours_for(
        &self,
        vendor_id: VendorId,
        tour_id: TourId,
    ) -> ApiFuture<'_, Vec<VendorTourLink>> {
        let call = ApiCall::VendorToursFor(vendor_id, tour_id);
        Box::pin(self.respond(call, move |t| {
            Ok(t.links
                .iter()
                .filter(|l| l.vendor_id == vendor_id && l.tour_id == tour_id)
                .cloned()
                .collect())
        }))
    }

    fn create_vendor_tour(&self, link: NewVendorTourLink) -> ApiFuture<'_, VendorTourLink> {
        let call = ApiCall::CreateVendorTour(link.clone());
        Box::pin(self.respond(call, move |t| {
            let created = VendorTourLink {
                id: t.allocate_id(),
                vendor_id: link.vendor_id,
                tour_id: link.tour_id,
                created_at: link.created_at,
            };
            t.links.push(created.clone());
            Ok(created)
        }))
    }
}
