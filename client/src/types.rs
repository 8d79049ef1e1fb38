//! Wire types for the ticket API
//!
//! Request and response bodies are the entity shapes verbatim, with
//! camelCase field names and no envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vendor identifier
pub type VendorId = u64;

/// Tour identifier
pub type TourId = u64;

/// A vendor (read-only)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vendor {
    /// Vendor ID
    pub id: VendorId,
    /// Display name
    pub name: String,
}

/// A tour (read-only)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tour {
    /// Tour ID
    pub id: TourId,
    /// Display name
    pub name: String,
    /// Where the tour takes place
    pub location: String,
}

/// Which workflow a ticket is handled by
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    /// Policy and contact can be edited directly
    NewListing,
    /// The vendor/tour pairing must be set up first
    MultiVariant,
}

impl ListingType {
    /// Human-readable label, e.g. "New Listing"
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NewListing => "New Listing",
            Self::MultiVariant => "Multi Variant",
        }
    }
}

impl std::fmt::Display for ListingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewListing => write!(f, "new_listing"),
            Self::MultiVariant => write!(f, "multi_variant"),
        }
    }
}

/// A ticket linking a vendor and a tour (read-only)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Ticket ID
    pub id: u64,
    /// Vendor the ticket belongs to
    pub vendor_id: VendorId,
    /// Tour the ticket belongs to
    pub tour_id: TourId,
    /// Product shown to operators
    pub product_name: String,
    /// Selects the workflow
    pub listing_type: ListingType,
}

/// Whether a cancellation policy is in force
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyStatus {
    /// Policy applies
    #[default]
    Active,
    /// Policy is disabled
    Inactive,
}

impl PolicyStatus {
    /// Wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

impl std::fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cancellation policy for a vendor/tour pairing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPolicy {
    /// Policy ID
    pub id: u64,
    /// Vendor
    pub vendor_id: VendorId,
    /// Tour
    pub tour_id: TourId,
    /// Active or not
    pub status: PolicyStatus,
    /// Minimum notice before cancellation; `None` means no time restriction
    #[serde(default)]
    pub cancellation_before_minutes: Option<u32>,
}

/// Body of `PUT /cancellationPolicy/{id}`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPolicyForm {
    /// Active or not
    pub status: PolicyStatus,
    /// Minimum notice in minutes
    #[serde(default)]
    pub cancellation_before_minutes: Option<u32>,
}

/// Body of `POST /cancellationPolicy`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewCancellationPolicy {
    /// Vendor
    pub vendor_id: VendorId,
    /// Tour
    pub tour_id: TourId,
    /// Active or not
    pub status: PolicyStatus,
    /// Minimum notice in minutes
    pub cancellation_before_minutes: Option<u32>,
}

impl NewCancellationPolicy {
    /// Build a create body from form values scoped to a vendor/tour
    #[must_use]
    pub const fn from_form(vendor_id: VendorId, tour_id: TourId, form: &CancellationPolicyForm) -> Self {
        Self {
            vendor_id,
            tour_id,
            status: form.status,
            cancellation_before_minutes: form.cancellation_before_minutes,
        }
    }
}

/// Contact details for a vendor/tour pairing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Contact ID
    pub id: u64,
    /// Vendor
    pub vendor_id: VendorId,
    /// Tour
    pub tour_id: TourId,
    /// Phone number
    pub phone: String,
    /// Email address
    pub email: String,
}

/// Body of `PUT /contact/{id}`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactForm {
    /// Phone number
    pub phone: String,
    /// Email address
    pub email: String,
}

/// Body of `POST /contact`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    /// Vendor
    pub vendor_id: VendorId,
    /// Tour
    pub tour_id: TourId,
    /// Phone number
    pub phone: String,
    /// Email address
    pub email: String,
}

impl NewContact {
    /// Build a create body from form values scoped to a vendor/tour
    #[must_use]
    pub fn from_form(vendor_id: VendorId, tour_id: TourId, form: &ContactForm) -> Self {
        Self {
            vendor_id,
            tour_id,
            phone: form.phone.clone(),
            email: form.email.clone(),
        }
    }
}

/// Records that a vendor/tour pairing has been initialized
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VendorTourLink {
    /// Link ID
    pub id: u64,
    /// Vendor
    pub vendor_id: VendorId,
    /// Tour
    pub tour_id: TourId,
    /// When the pairing was initialized
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /vendorTours`; `createdAt` is stamped by the caller
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewVendorTourLink {
    /// Vendor
    pub vendor_id: VendorId,
    /// Tour
    pub tour_id: TourId,
    /// Stamp taken at call time
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ticket_wire_shape() {
        let ticket: Ticket = serde_json::from_value(json!({
            "id": 3,
            "vendorId": 10,
            "tourId": 20,
            "productName": "Sunset Cruise",
            "listingType": "multi_variant"
        }))
        .unwrap();

        assert_eq!(ticket.vendor_id, 10);
        assert_eq!(ticket.listing_type, ListingType::MultiVariant);
        assert_eq!(ticket.listing_type.label(), "Multi Variant");
    }

    #[test]
    fn test_policy_minutes_may_be_null_or_absent() {
        let with_null: CancellationPolicy = serde_json::from_value(json!({
            "id": 1, "vendorId": 1, "tourId": 2,
            "status": "INACTIVE", "cancellationBeforeMinutes": null
        }))
        .unwrap();
        let absent: CancellationPolicy = serde_json::from_value(json!({
            "id": 1, "vendorId": 1, "tourId": 2, "status": "ACTIVE"
        }))
        .unwrap();

        assert_eq!(with_null.status, PolicyStatus::Inactive);
        assert_eq!(with_null.cancellation_before_minutes, None);
        assert_eq!(absent.cancellation_before_minutes, None);
    }

    #[test]
    fn test_new_policy_serializes_null_minutes() {
        let body = NewCancellationPolicy::from_form(1, 2, &CancellationPolicyForm::default());
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(
            value,
            json!({
                "vendorId": 1,
                "tourId": 2,
                "status": "ACTIVE",
                "cancellationBeforeMinutes": null
            })
        );
    }

    #[test]
    fn test_link_created_at_is_iso8601() {
        let link = NewVendorTourLink {
            vendor_id: 1,
            tour_id: 2,
            created_at: DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let value = serde_json::to_value(&link).unwrap();

        assert_eq!(value["createdAt"], json!("2025-01-01T00:00:00Z"));
    }
}
