//! Vendor-tour link persistence
//!
//! Two interchangeable backends sit behind [`LinkRepository`]: the remote API
//! and a local key/value store. Both treat the first record matching a
//! vendor/tour pair as authoritative, and both create only when no such
//! record exists.

use crate::storage::{KeyValueStore, StorageError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tour_desk_client::{ApiError, NewVendorTourLink, TicketApi, TourId, VendorId, VendorTourLink};
use tour_desk_core::environment::Clock;

/// Storage key holding the JSON array of links
pub const LINKS_KEY: &str = "vendorTours";

/// Errors from a link repository
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The remote API failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The local store failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Boxed future returned by [`LinkRepository`] methods
pub type LinkFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LinkError>> + Send + 'a>>;

/// Lookup and idempotent creation of vendor-tour links
pub trait LinkRepository: Send + Sync {
    /// First link for the pair, if any
    fn find(&self, vendor_id: VendorId, tour_id: TourId) -> LinkFuture<'_, Option<VendorTourLink>>;

    /// Existing link for the pair, or a newly created one
    fn create_if_absent(
        &self,
        vendor_id: VendorId,
        tour_id: TourId,
    ) -> LinkFuture<'_, VendorTourLink>;
}

/// Links stored under [`LINKS_KEY`] in a [`KeyValueStore`]
pub struct LocalLinkRepository {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write_lock: tokio::sync::Mutex<()>,
}

impl LocalLinkRepository {
    /// Repository over `store`, stamping new links with `clock`
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Every persisted link, in insertion order
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Storage`] if the store fails or holds invalid JSON.
    pub async fn all(&self) -> Result<Vec<VendorTourLink>, LinkError> {
        match self.store.get(LINKS_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).map_err(StorageError::from)?),
            None => Ok(Vec::new()),
        }
    }

    fn next_id(&self, links: &[VendorTourLink]) -> u64 {
        let now = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or(0);
        let floor = links.iter().map(|l| l.id).max().map_or(0, |max| max + 1);
        now.max(floor)
    }
}

impl std::fmt::Debug for LocalLinkRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalLinkRepository").finish_non_exhaustive()
    }
}

impl LinkRepository for LocalLinkRepository {
    fn find(&self, vendor_id: VendorId, tour_id: TourId) -> LinkFuture<'_, Option<VendorTourLink>> {
        Box::pin(async move {
            let links = self.all().await?;
            Ok(links
                .into_iter()
                .find(|l| l.vendor_id == vendor_id && l.tour_id == tour_id))
        })
    }

    fn create_if_absent(
        &self,
        vendor_id: VendorId,
        tour_id: TourId,
    ) -> LinkFuture<'_, VendorTourLink> {
        Box::pin(async move {
            let _guard = self.write_lock.lock().await;
            let mut links = self.all().await?;

            if let Some(existing) = links
                .iter()
                .find(|l| l.vendor_id == vendor_id && l.tour_id == tour_id)
            {
                return Ok(existing.clone());
            }

            let link = VendorTourLink {
                id: self.next_id(&links),
                vendor_id,
                tour_id,
                created_at: self.clock.now(),
            };
            links.push(link.clone());

            let encoded = serde_json::to_string(&links).map_err(StorageError::from)?;
            self.store.set(LINKS_KEY, encoded).await?;
            tracing::info!(link_id = link.id, vendor_id, tour_id, "Created local vendor tour link");

            Ok(link)
        })
    }
}

/// Links stored by the remote API
pub struct RemoteLinkRepository {
    api: Arc<dyn TicketApi>,
    clock: Arc<dyn Clock>,
}

impl RemoteLinkRepository {
    /// Repository over `api`, stamping `createdAt` with `clock`
    #[must_use]
    pub fn new(api: Arc<dyn TicketApi>, clock: Arc<dyn Clock>) -> Self {
        Self { api, clock }
    }
}

impl std::fmt::Debug for RemoteLinkRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLinkRepository").finish_non_exhaustive()
    }
}

impl LinkRepository for RemoteLinkRepository {
    fn find(&self, vendor_id: VendorId, tour_id: TourId) -> LinkFuture<'_, Option<VendorTourLink>> {
        Box::pin(async move {
            let links = self.api.vendor_tours_for(vendor_id, tour_id).await?;
            Ok(links.into_iter().next())
        })
    }

    fn create_if_absent(
        &self,
        vendor_id: VendorId,
        tour_id: TourId,
    ) -> LinkFuture<'_, VendorTourLink> {
        Box::pin(async move {
            if let Some(existing) = self.find(vendor_id, tour_id).await? {
                return Ok(existing);
            }

            let link = self
                .api
                .create_vendor_tour(NewVendorTourLink {
                    vendor_id,
                    tour_id,
                    created_at: self.clock.now(),
                })
                .await?;
            tracing::info!(link_id = link.id, vendor_id, tour_id, "Created vendor tour link");

            Ok(link)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;
    use tour_desk_testing::mocks::{
        epoch, ApiCall, Endpoint, FixedClock, ManualClock, MockTicketApi,
    };
    use tour_desk_testing::{fixtures, test_clock};

    fn local() -> (LocalLinkRepository, Arc<MemoryKeyValueStore>) {
        let store = Arc::new(MemoryKeyValueStore::new());
        let repo = LocalLinkRepository::new(store.clone(), Arc::new(test_clock()));
        (repo, store)
    }

    #[tokio::test]
    async fn test_local_empty_store_finds_nothing() {
        let (repo, _) = local();
        assert_eq!(repo.find(1, 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_local_create_stamps_clock() {
        let (repo, store) = local();
        let link = repo.create_if_absent(1, 2).await.unwrap();

        let epoch_ms = u64::try_from(test_clock().now().timestamp_millis()).unwrap();
        assert_eq!(link.id, epoch_ms);
        assert_eq!(link.created_at, test_clock().now());

        let raw = store.get(LINKS_KEY).await.unwrap().unwrap();
        let persisted: Vec<VendorTourLink> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, vec![link]);
    }

    #[tokio::test]
    async fn test_local_ids_bumped_within_same_millisecond() {
        let (repo, _) = local();
        let first = repo.create_if_absent(1, 2).await.unwrap();
        let second = repo.create_if_absent(1, 3).await.unwrap();

        assert_eq!(second.id, first.id + 1);
    }

    #[tokio::test]
    async fn test_local_ids_follow_the_clock() {
        let clock = Arc::new(ManualClock::new(epoch()));
        let repo = LocalLinkRepository::new(Arc::new(MemoryKeyValueStore::new()), clock.clone());

        let first = repo.create_if_absent(1, 2).await.unwrap();
        clock.advance(chrono::Duration::seconds(5));
        let second = repo.create_if_absent(3, 4).await.unwrap();

        assert_eq!(second.id, first.id + 5_000);
        assert_eq!(second.created_at, clock.now());
        assert_eq!(repo.find(1, 2).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_local_rejects_corrupt_value() {
        let (repo, store) = local();
        store.set(LINKS_KEY, "[{]".to_string()).await.unwrap();

        assert!(matches!(
            repo.find(1, 2).await.unwrap_err(),
            LinkError::Storage(StorageError::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_returns_existing_without_post() {
        let api = MockTicketApi::new().with_link(fixtures::link(7, 1, 2));
        let repo = RemoteLinkRepository::new(Arc::new(api.clone()), Arc::new(test_clock()));

        let link = repo.create_if_absent(1, 2).await.unwrap();

        assert_eq!(link.id, 7);
        assert_eq!(api.call_count(Endpoint::CreateVendorTour), 0);
    }

    #[tokio::test]
    async fn test_remote_creates_with_clock_stamp() {
        let api = MockTicketApi::new();
        let clock = FixedClock::new(epoch());
        let repo = RemoteLinkRepository::new(Arc::new(api.clone()), Arc::new(clock.clone()));

        repo.create_if_absent(4, 5).await.unwrap();

        assert_eq!(
            api.calls(),
            vec![
                ApiCall::VendorToursFor(4, 5),
                ApiCall::CreateVendorTour(NewVendorTourLink {
                    vendor_id: 4,
                    tour_id: 5,
                    created_at: clock.now(),
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_remote_failure_is_api_error() {
        let api = MockTicketApi::new().failing(Endpoint::VendorTours, ApiError::network("offline"));
        let repo = RemoteLinkRepository::new(Arc::new(api), Arc::new(test_clock()));

        let error = repo.find(1, 2).await.unwrap_err();
        assert_eq!(error.to_string(), "Network error: offline");
    }
}
