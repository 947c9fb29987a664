//! State module for tracking indexing progress
//!
//! # Components
//!
//! - `SiteStatus`: persisted status of each configured site
//! - `IndexingPhase`: in-memory lifecycle of a full indexing run
//! - `SeenUrls` and `CancelFlag`: the lifecycle objects shared by all crawl tasks

mod phase;
mod shared;
mod site_status;

// Re-export main types
pub use phase::IndexingPhase;
pub use shared::{CancelFlag, SeenUrls};
pub use site_status::SiteStatus;
