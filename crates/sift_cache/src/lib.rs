//! Incremental test-execution cache.
//!
//! Decides, on every run, which test modules can be skipped because neither
//! their own logic nor the logic they depend on has changed, and which must
//! re-execute because their content changed or a compiled artifact they
//! exercise changed. State persists across runs in a single human-diffable
//! JSON document per project.

#![warn(missing_docs)]

pub mod artifact;
pub mod error;
pub mod invalidate;
pub mod ledger;
pub mod manifest;
pub mod session;

pub use artifact::{current_digests, detect_changes, ArtifactProvider, BuildArtifact};
pub use error::CacheError;
pub use invalidate::{evict_stale, invalidate, Invalidation};
pub use ledger::{CoverageLedger, MemoryLedger};
pub use manifest::{CachedTest, CoverageMap, Manifest};
pub use session::SessionCache;
