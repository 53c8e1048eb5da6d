//! Retention pruning engine: walk history, keep what aged out, delete it.
//!
//! The engine is service-agnostic. Anything that serves pages of items
//! with ids and timestamps can be pruned; `ebb-social` supplies the
//! adapter for the Twitter/X v1.1 timeline.
pub mod engine;
pub mod traits;

pub use engine::{PruneReport, collect_history, prune, select_expired};
pub use traits::{BulkRemove, PageSource, Prunable};
