//! Twitter/X v1.1 integration surface.
//!
//! Submodules provide the signed HTTP client wrapper, strongly typed
//! response models, and the timeline adapter that exposes an account's
//! history as pages of prunable items.
pub mod client;
pub mod timeline;
pub mod types;

pub use client::TwitterApi;
pub use timeline::UserTimeline;
pub use types::{TimelineQuery, Tweet};
