//! # nostalgix_core
//!
//! Core authentication and session logic for Nostalgix.

pub mod auth;
pub mod migrate;
pub mod models;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
