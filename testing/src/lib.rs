//! # Tour Desk Testing
//!
//! Testing utilities and helpers for the Tour Desk dashboard.
//!
//! This crate provides:
//! - Mock implementations of Environment traits (clock, ticket API)
//! - Entity fixtures
//! - proptest strategies for form input
//! - The [`ReducerTest`] Given/When/Then harness
//!
//! ## Example
//!
//! ```ignore
//! use tour_desk_testing::{fixtures, mocks::MockTicketApi};
//!
//! #[tokio::test]
//! async fn loads_policy() {
//!     let api = MockTicketApi::new().with_policy(fixtures::policy(1, 10, 20));
//!     let store = policy_store(FeatureEnvironment::new(Arc::new(api.clone()), alerts));
//!     mount_policy(&store, 10, 20, Duration::from_secs(1)).await;
//!     assert_eq!(api.call_count(Endpoint::CancellationPolicies), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use tour_desk_core::environment::Clock;

mod mock_api;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::Mutex;

    pub use crate::mock_api::{ApiCall, Endpoint, MockTicketApi};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use tour_desk_testing::mocks::FixedClock;
    /// use tour_desk_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that moves forward only when told to
    #[derive(Debug)]
    pub struct ManualClock {
        time: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start at `time`
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Mutex::new(time),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self
                .time
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    /// 2025-01-01 00:00:00 UTC
    ///
    /// # Panics
    ///
    /// Never in practice; the timestamp is a constant.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }
}

/// Entity fixtures with predictable names
pub mod fixtures {
    use tour_desk_client::{
        CancellationPolicy, Contact, ListingType, PolicyStatus, Ticket, Tour, TourId, Vendor,
        VendorId, VendorTourLink,
    };

    /// A vendor
    #[must_use]
    pub fn vendor(id: VendorId, name: &str) -> Vendor {
        Vendor {
            id,
            name: name.to_string(),
        }
    }

    /// A tour located in "Lisbon"
    #[must_use]
    pub fn tour(id: TourId, name: &str) -> Tour {
        Tour {
            id,
            name: name.to_string(),
            location: "Lisbon".to_string(),
        }
    }

    /// A ticket named `Product {id}`
    #[must_use]
    pub fn ticket(id: u64, vendor_id: VendorId, tour_id: TourId, listing_type: ListingType) -> Ticket {
        Ticket {
            id,
            vendor_id,
            tour_id,
            product_name: format!("Product {id}"),
            listing_type,
        }
    }

    /// An active policy requiring 24 hours' notice
    #[must_use]
    pub const fn policy(id: u64, vendor_id: VendorId, tour_id: TourId) -> CancellationPolicy {
        CancellationPolicy {
            id,
            vendor_id,
            tour_id,
            status: PolicyStatus::Active,
            cancellation_before_minutes: Some(1440),
        }
    }

    /// A contact with a valid phone and email
    #[must_use]
    pub fn contact(id: u64, vendor_id: VendorId, tour_id: TourId) -> Contact {
        Contact {
            id,
            vendor_id,
            tour_id,
            phone: "+351 912 345 678".to_string(),
            email: format!("ops{vendor_id}@example.com"),
        }
    }

    /// A link stamped at the test epoch
    #[must_use]
    pub fn link(id: u64, vendor_id: VendorId, tour_id: TourId) -> VendorTourLink {
        VendorTourLink {
            id,
            vendor_id,
            tour_id,
            created_at: super::mocks::epoch(),
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use std::sync::{Arc, Mutex, PoisonError};
    use tracing::subscriber::DefaultGuard;
    use tracing_subscriber::util::SubscriberInitExt;

    /// Install a test-friendly tracing subscriber (idempotent)
    ///
    /// Honours `RUST_LOG`; output is captured per test by the harness.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    }

    /// Log lines written while a [`capture_logs`] guard is alive
    #[derive(Clone, Debug, Default)]
    pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        /// Everything written so far, without colour codes
        #[must_use]
        pub fn contents(&self) -> String {
            let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
            String::from_utf8_lossy(&bytes).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Route every event on this thread into a buffer until the guard drops
    ///
    /// Use with a current-thread runtime so spawned effects log to the same
    /// subscriber.
    #[must_use]
    pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let guard = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .set_default();
        (logs, guard)
    }
}

/// Property-based testing utilities using proptest
pub mod properties {
    use proptest::prelude::*;

    /// Addresses of the form `local@domain.tld` without whitespace
    pub fn valid_email() -> impl Strategy<Value = String> {
        ("[a-z0-9._%+-]{1,12}", "[a-z0-9-]{1,12}", "[a-z]{2,6}")
            .prop_map(|(local, domain, tld)| format!("{local}@{domain}.{tld}"))
    }

    /// Strings that can never be a valid address: no `@`, or whitespace inside
    pub fn invalid_email() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-z0-9.]{0,20}",
            ("[a-z]{1,6}", "[a-z]{1,6}").prop_map(|(a, b)| format!("{a} {b}@x.io")),
            "[a-z]{1,8}@[a-z]{1,8}",
        ]
    }

    /// Phone numbers with at least ten characters
    pub fn valid_phone() -> impl Strategy<Value = String> {
        "\\+?[0-9]{10,15}"
    }

    /// Non-blank phone numbers that are too short
    pub fn short_phone() -> impl Strategy<Value = String> {
        "[0-9]{1,9}"
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, MockTicketApi, test_clock};
pub use reducer_test::{ReducerTest, assertions};
