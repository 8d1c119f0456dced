//! HTTP API: routing, request-metadata extraction, and response mapping.
//!
//! Everything framework-specific lives here; the engine crates below never
//! see axum types.

pub mod app;
pub mod meta;
pub mod respond;

pub use app::{build_app, AppState};
