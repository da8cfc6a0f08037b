//! Query-and-consistency engine for the asset vault.
//!
//! This crate sits between callers and the two external stores:
//! - [`TagIndex`]: in-process tag to asset membership
//! - [`SearchQueryPlanner`]: combined text + tag search with explicit dedupe
//! - [`DeletionPipeline`]: blob-then-metadata deletion with an orphan ledger
//! - [`CacheCoordinator`]: result caching with mutation-driven invalidation
//! - [`Catalog`]: the caller-facing facade composing all of the above

pub mod cache;
pub mod catalog;
pub mod deletion;
pub mod error;
pub mod metrics;
pub mod planner;
pub mod tag_index;

pub use cache::{CacheCoordinator, CacheKey, Lookup, Mutation};
pub use catalog::{Catalog, UploadRequest};
pub use deletion::{DeletionPipeline, DeletionReport, DeletionState, OrphanLedger, OrphanRecord};
pub use error::{CatalogError, CatalogResult, ErrorKind};
pub use planner::SearchQueryPlanner;
pub use tag_index::TagIndex;
