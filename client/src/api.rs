//! The `TicketApi` trait: one method per endpoint
//!
//! Features depend on `Arc<dyn TicketApi>` rather than on [`ApiClient`], so
//! tests can inject an in-memory backend.

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::types::{
    CancellationPolicy, CancellationPolicyForm, Contact, ContactForm, NewCancellationPolicy,
    NewContact, NewVendorTourLink, Ticket, Tour, TourId, Vendor, VendorId, VendorTourLink,
};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`TicketApi`] methods
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Remote ticket API
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so the trait stays object-safe
/// (`Arc<dyn TicketApi>`).
pub trait TicketApi: Send + Sync {
    /// `GET /vendors`
    fn vendors(&self) -> ApiFuture<'_, Vec<Vendor>>;

    /// `GET /vendors/{id}`
    fn vendor(&self, id: VendorId) -> ApiFuture<'_, Vendor>;

    /// `GET /tours`
    fn tours(&self) -> ApiFuture<'_, Vec<Tour>>;

    /// `GET /tours/{id}`
    fn tour(&self, id: TourId) -> ApiFuture<'_, Tour>;

    /// `GET /tickets`
    fn tickets(&self) -> ApiFuture<'_, Vec<Ticket>>;

    /// `GET /tickets/{id}`
    fn ticket(&self, id: u64) -> ApiFuture<'_, Ticket>;

    /// `GET /cancellationPolicy`
    fn cancellation_policies(&self) -> ApiFuture<'_, Vec<CancellationPolicy>>;

    /// `GET /cancellationPolicy?vendorId=&tourId=`
    fn cancellation_policies_for(
        &self,
        vendor_id: VendorId,
        tour_id: TourId,
    ) -> ApiFuture<'_, Vec<CancellationPolicy>>;

    /// `PUT /cancellationPolicy/{id}`
    fn update_cancellation_policy(
        &self,
        id: u64,
        form: CancellationPolicyForm,
    ) -> ApiFuture<'_, CancellationPolicy>;

    /// `POST /cancellationPolicy`
    fn create_cancellation_policy(
        &self,
        policy: NewCancellationPolicy,
    ) -> ApiFuture<'_, CancellationPolicy>;

    /// `GET /contact`
    fn contacts(&self) -> ApiFuture<'_, Vec<Contact>>;

    /// `GET /contact?vendorId=&tourId=`
    fn contacts_for(&self, vendor_id: VendorId, tour_id: TourId) -> ApiFuture<'_, Vec<Contact>>;

    /// `PUT /contact/{id}`
    fn update_contact(&self, id: u64, form: ContactForm) -> ApiFuture<'_, Contact>;

    /// `POST /contact`
    fn create_contact(&self, contact: NewContact) -> ApiFuture<'_, Contact>;

    /// `GET /vendorTours?vendorId=&tourId=`
    fn vendor_tours_for(
        &self,
        vendor_id: VendorId,
        tour_id: TourId,
    ) -> ApiFuture<'_, Vec<VendorTourLink>>;

    /// `POST /vendorTours`
    fn create_vendor_tour(&self, link: NewVendorTourLink) -> ApiFuture<'_, VendorTourLink>;
}

fn pair_query(vendor_id: VendorId, tour_id: TourId) -> String {
    format!("vendorId={vendor_id}&tourId={tour_id}")
}

impl TicketApi for ApiClient {
    fn vendors(&self) -> ApiFuture<'_, Vec<Vendor>> {
        Box::pin(self.get::<Vec<Vendor>>("/vendors"))
    }

    fn vendor(&self, id: VendorId) -> ApiFuture<'_, Vendor> {
        Box::pin(async move { self.get::<Vendor>(&format!("/vendors/{id}")).await })
    }

    fn tours(&self) -> ApiFuture<'_, Vec<Tour>> {
        Box::pin(self.get::<Vec<Tour>>("/tours"))
    }

    fn tour(&self, id: TourId) -> ApiFuture<'_, Tour> {
        Box::pin(async move { self.get::<Tour>(&format!("/tours/{id}")).await })
    }

    fn tickets(&self) -> ApiFuture<'_, Vec<Ticket>> {
        Box::pin(self.get::<Vec<Ticket>>("/tickets"))
    }

    fn ticket(&self, id: u64) -> ApiFuture<'_, Ticket> {
        Box::pin(async move { self.get::<Ticket>(&format!("/tickets/{id}")).await })
    }

    fn cancellation_policies(&self) -> ApiFuture<'_, Vec<CancellationPolicy>> {
        Box::pin(self.get::<Vec<CancellationPolicy>>("/cancellationPolicy"))
    }

    fn cancellation_policies_for(
        &self,
        vendor_id: VendorId,
        tour_id: TourId,
    ) -> ApiFuture<'_, Vec<CancellationPolicy>> {
        let endpoint = format!("/cancellationPolicy?{}", pair_query(vendor_id, tour_id));
        Box::pin(async move { self.get::<Vec<CancellationPolicy>>(&endpoint).await })
    }

    fn update_cancellation_policy(
        &self,
        id: u64,
        form: CancellationPolicyForm,
    ) -> ApiFuture<'_, CancellationPolicy> {
        Box::pin(async move {
            self.put::<CancellationPolicy, _>(&format!("/cancellationPolicy/{id}"), &form)
                .await
        })
    }

    fn create_cancellation_policy(
        &self,
        policy: NewCancellationPolicy,
    ) -> ApiFuture<'_, CancellationPolicy> {
        Box::pin(async move {
            self.post::<CancellationPolicy, _>("/cancellationPolicy", &policy)
                .await
        })
    }

    fn contacts(&self) -> ApiFuture<'_, Vec<Contact>> {
        Box::pin(self.get::<Vec<Contact>>("/contact"))
    }

    fn contacts_for(&self, vendor_id: VendorId, tour_id: TourId) -> ApiFuture<'_, Vec<Contact>> {
        let endpoint = format!("/contact?{}", pair_query(vendor_id, tour_id));
        Box::pin(async move { self.get::<Vec<Contact>>(&endpoint).await })
    }

    fn update_contact(&self, id: u64, form: ContactForm) -> ApiFuture<'_, Contact> {
        Box::pin(async move { self.put::<Contact, _>(&format!("/contact/{id}"), &form).await })
    }

    fn create_contact(&self, contact: NewContact) -> ApiFuture<'_, Contact> {
        Box::pin(async move { self.post::<Contact, _>("/contact", &contact).await })
    }

    fn vendor_tours_for(
        &self,
        vendor_id: VendorId,
        tour_id: TourId,
    ) -> ApiFuture<'_, Vec<VendorTourLink>> {
        let endpoint = format!("/vendorTours?{}", pair_query(vendor_id, tour_id));
        Box::pin(async move { self.get::<Vec<VendorTourLink>>(&endpoint).await })
    }

    fn create_vendor_tour(&self, link: NewVendorTourLink) -> ApiFuture<'_, VendorTourLink> {
        Box::pin(async move { self.post::<VendorTourLink, _>("/vendorTours", &link).await })
    }
}
