//! `storegate-auth` — caller identity and capability evaluation (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: identity is
//! resolved from an explicit session plus bootstrap hints, and scoped
//! permissions arrive through the [`CapabilitySource`] seam.

pub mod capability;
pub mod csrf;
pub mod evaluate;
pub mod identity;
pub mod permission;
pub mod table;

pub use capability::{Capability, ResourceCapabilitySet};
pub use csrf::{get_or_create_token, CsrfError, CsrfToken};
pub use evaluate::{evaluate, CapabilityLookup, CapabilitySource, CapabilitySourceError};
pub use identity::{resolve_identity, CallerIdentity, IdentityHints, UserRecord};
pub use permission::{Permission, Role};
pub use table::InMemoryCapabilityTable;
