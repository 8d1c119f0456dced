//! Permission and role identifiers.
//!
//! Both are modeled as opaque strings at this layer. Permissions follow the
//! `<resource>.<action>` convention (e.g. `"brands.manage"`); a special
//! wildcard permission `"*"` lets policy layers express "allow all" without
//! hardcoding domain permissions.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The coarse management permission for a resource (`"<resource>.manage"`).
    pub fn manage(resource: &str) -> Self {
        Self(Cow::Owned(format!("{resource}.manage")))
    }

    /// The creation permission for a resource (`"<resource>.create"`).
    pub fn create(resource: &str) -> Self {
        Self(Cow::Owned(format!("{resource}.create")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role identifier used for RBAC.
///
/// Opaque at this layer; mapping roles to permissions is the job of the
/// permission table behind [`crate::CapabilitySource`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Roles that grant unrestricted access to every resource.
    pub fn is_super_admin(&self) -> bool {
        matches!(self.as_str(), "super_admin" | "superadmin")
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
