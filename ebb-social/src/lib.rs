//! Social network clients used by the pruning engine.
//!
//! Currently only the Twitter/X v1.1 surface is implemented: the signed
//! REST client, the typed response models, and the timeline adapter the
//! engine walks.
pub mod twitter;
