//! HTTP request handlers.

pub mod admin;
pub mod assets;
pub mod common;
pub mod health;
pub mod stats;
pub mod tags;

pub use admin::*;
pub use assets::*;
pub use common::*;
pub use health::*;
pub use stats::*;
pub use tags::*;
