//! Repository traits for metadata operations.

pub mod assets;
pub mod tags;
pub mod tombstones;

pub use assets::{AssetFilter, AssetRepo};
pub use tags::{Association, TagRepo};
pub use tombstones::TombstoneRepo;
