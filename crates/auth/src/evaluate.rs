//! Capability evaluation.
//!
//! Combines two independent permission models into one
//! [`ResourceCapabilitySet`]:
//!
//! - **role-based**: coarse `"<resource>.manage"` / `"<resource>.create"`
//!   permissions held by the caller;
//! - **resource-scoped**: per-capability rows in the permission table,
//!   queried through the [`CapabilitySource`] seam.
//!
//! The tri-state lookup result is load-bearing: "no rows configured at all"
//! must stay distinguishable from "rows configured, access denied" for the
//! tenant-view fallback below to work. A boolean seam cannot express that.

use thiserror::Error;

use crate::{Capability, CallerIdentity, Permission, ResourceCapabilitySet};

/// Outcome of a single scoped-capability lookup.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CapabilityLookup {
    Granted,
    Denied,
    /// No row exists for this (tenant, resource, capability) at all.
    Unconfigured,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilitySourceError {
    /// The permission subsystem could not be reached. Implementations must
    /// bound their own lookups and report expiry through this variant.
    #[error("permission subsystem unavailable: {0}")]
    Unavailable(String),
}

/// Seam to the resource-permission table.
///
/// Queried fresh per request so evaluations reflect live table state.
pub trait CapabilitySource: Send + Sync {
    fn has_capability(
        &self,
        identity: &CallerIdentity,
        resource: &str,
        capability: Capability,
    ) -> Result<CapabilityLookup, CapabilitySourceError>;
}

/// Compute the full capability matrix for one caller on one resource.
///
/// Policy, in order:
/// - super-admin short-circuits every flag to granted;
/// - a source error (subsystem absent or timed out) denies everything;
/// - when the source has no rows configured at all for this caller/resource,
///   a minimal `view_tenant` grant is substituted so tenants that have not
///   yet populated granular permissions are not locked out of their own
///   admin. This is a deliberate safety valve; every use of it emits an
///   audit event.
pub fn evaluate(
    source: &dyn CapabilitySource,
    resource: &str,
    identity: &CallerIdentity,
) -> ResourceCapabilitySet {
    if identity.is_super_admin {
        return ResourceCapabilitySet::unrestricted(resource);
    }

    let management = identity.has_permission(&Permission::manage(resource))
        || identity.has_permission(&Permission::create(resource));

    let mut set = ResourceCapabilitySet::denied(resource);
    set.management = management;

    let mut unconfigured = 0usize;
    for capability in Capability::ALL {
        match source.has_capability(identity, resource, capability) {
            Ok(CapabilityLookup::Granted) => set.set(capability, true),
            Ok(CapabilityLookup::Denied) => {}
            Ok(CapabilityLookup::Unconfigured) => unconfigured += 1,
            Err(CapabilitySourceError::Unavailable(reason)) => {
                tracing::warn!(
                    resource,
                    caller = %identity.id,
                    %reason,
                    "permission subsystem unavailable, denying all capabilities"
                );
                return ResourceCapabilitySet::denied(resource);
            }
        }
    }

    if unconfigured == Capability::ALL.len() {
        set.set(Capability::ViewTenant, true);
        tracing::warn!(
            target: "audit",
            resource,
            caller = %identity.id,
            tenant = %identity.tenant_id,
            "no permission rows configured; granting tenant-view fallback"
        );
    }

    set
}
