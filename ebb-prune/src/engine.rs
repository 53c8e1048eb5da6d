//! The three-step pruning pass: collect, filter, delete.
use chrono::{DateTime, Duration, Utc};
use ebb_common::{EbbError, Result};
use serde::Serialize;
use tracing::info;

use crate::traits::{BulkRemove, PageSource, Prunable};

/// What one pruning pass did.
#[derive(Debug, Clone, Serialize)]
pub struct PruneReport {
    /// Items seen while walking the full history.
    pub collected: usize,
    /// Items older than the cutoff.
    pub expired: usize,
    /// Items actually deleted; zero on a dry run.
    pub deleted: usize,
    pub cutoff: DateTime<Utc>,
    pub dry_run: bool,
}

/// Walk the full history, newest to oldest, until a page comes back empty.
///
/// Each page moves the cursor to one below the oldest id seen, so the next
/// request cannot refetch the boundary item. A source that fails to move
/// the cursor down aborts the walk instead of looping forever.
pub async fn collect_history<S>(source: &S) -> Result<Vec<S::Item>>
where
    S: PageSource,
{
    let mut collected = Vec::new();
    let mut cursor: Option<u64> = None;
    loop {
        let page = source.page_before(cursor).await?;
        let Some(last) = page.last() else {
            break;
        };
        let next_cursor = last.id().saturating_sub(1);
        if let Some(current) = cursor {
            if next_cursor >= current {
                return Err(EbbError::Pagination(format!(
                    "cursor failed to advance: {next_cursor} after {current}"
                )));
            }
        }
        collected.extend(page);
        cursor = Some(next_cursor);
    }
    Ok(collected)
}

/// Items strictly older than `cutoff`, original order preserved, input
/// untouched. An item stamped exactly at the cutoff is still fresh.
pub fn select_expired<T>(items: &[T], cutoff: DateTime<Utc>) -> Vec<T>
where
    T: Prunable + Clone,
{
    items
        .iter()
        .filter(|item| item.created_at() < cutoff)
        .cloned()
        .collect()
}

/// One full pruning pass over `collection`.
///
/// The cutoff is fixed once at entry, so a slow walk cannot shift which
/// items qualify mid-run. A dry run reports what would go without calling
/// the delete step; the delete step is also skipped outright when nothing
/// expired.
pub async fn prune<C>(collection: &C, window: Duration, dry_run: bool) -> Result<PruneReport>
where
    C: BulkRemove,
{
    // Plain subtraction panics when the window reaches past the calendar.
    let cutoff = Utc::now()
        .checked_sub_signed(window)
        .ok_or_else(|| EbbError::Config(format!("retention window too large: {window}")))?;
    info!(event = "prune.start", cutoff = %cutoff, dry_run, "starting pruning pass");

    let collected = collect_history(collection).await?;
    let expired = select_expired(&collected, cutoff);
    info!(
        event = "prune.selected",
        collected = collected.len(),
        expired = expired.len(),
        "selected expired items"
    );

    let deleted = if dry_run || expired.is_empty() {
        0
    } else {
        collection.delete_all(&expired).await?;
        expired.len()
    };

    let report = PruneReport {
        collected: collected.len(),
        expired: expired.len(),
        deleted,
        cutoff,
        dry_run,
    };
    info!(
        event = "prune.complete",
        collected = report.collected,
        expired = report.expired,
        deleted = report.deleted,
        dry_run = report.dry_run,
        "pruning pass complete"
    );
    Ok(report)
}
