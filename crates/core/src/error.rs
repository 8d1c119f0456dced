//! Engine error model.

use thiserror::Error;

/// Result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level error.
///
/// Keep this focused on the failure taxonomy the fragment pipeline actually
/// distinguishes. Most failure paths in this system degrade to a documented
/// fallback value instead of surfacing here; the variants below are the ones
/// a caller can observe.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// External bootstrap/auth code failed or leaked unusable output.
    /// Recovered locally (guest identity); carried for banner rendering.
    #[error("bootstrap failure: {0}")]
    Bootstrap(String),

    /// The resource-permission subsystem could not be reached at all.
    #[error("permission subsystem unavailable: {0}")]
    PermissionUnavailable(String),

    /// The caller may not view the requested resource.
    /// `authenticated` decides the HTTP mapping (403 vs. 401).
    #[error("access denied for resource '{resource}'")]
    AccessDenied { resource: String, authenticated: bool },

    /// Both secure random sources failed; no anti-forgery token can be
    /// issued, so the request must fail loudly.
    #[error("csrf token generation failed: {0}")]
    CsrfGeneration(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Output capture was driven through an invalid state transition.
    #[error("output capture misuse: {0}")]
    CaptureState(String),
}

impl EngineError {
    pub fn bootstrap(msg: impl Into<String>) -> Self {
        Self::Bootstrap(msg.into())
    }

    pub fn permission_unavailable(msg: impl Into<String>) -> Self {
        Self::PermissionUnavailable(msg.into())
    }

    pub fn access_denied(resource: impl Into<String>, authenticated: bool) -> Self {
        Self::AccessDenied {
            resource: resource.into(),
            authenticated,
        }
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn capture_state(msg: impl Into<String>) -> Self {
        Self::CaptureState(msg.into())
    }
}
