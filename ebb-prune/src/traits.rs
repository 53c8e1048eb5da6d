//! Seams between the engine and whatever service hosts the history.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ebb_common::Result;

/// An item that can age out of history.
pub trait Prunable {
    /// Service-assigned id. Ids rise with recency, which is what makes
    /// id-keyed paging work.
    fn id(&self) -> u64;
    fn created_at(&self) -> DateTime<Utc>;
}

/// Serves history newest-first in pages keyed by an inclusive upper id.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Prunable + Clone + Send + Sync;

    /// Fetch the next page with ids at or below `before_id`; `None` means
    /// start from the newest item. An empty page ends the walk.
    async fn page_before(&self, before_id: Option<u64>) -> Result<Vec<Self::Item>>;
}

/// The removal side of a [`PageSource`].
#[async_trait]
pub trait BulkRemove: PageSource {
    /// Delete exactly `items`, in order, stopping at the first failure.
    async fn delete_all(&self, items: &[Self::Item]) -> Result<()>;
}
