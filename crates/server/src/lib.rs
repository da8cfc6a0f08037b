//! HTTP API server for the asset vault.
//!
//! This crate exposes the catalog over HTTP:
//! - Combined text + tag search
//! - Raw-body uploads and content downloads
//! - Asset edits, tagging and two-step deletion
//! - Tag management
//! - Overview stats and orphaned-asset visibility

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
