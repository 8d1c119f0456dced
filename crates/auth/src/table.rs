//! In-memory resource-permission table.
//!
//! Backs tests and the demo server; production deployments put their
//! database-backed table behind the same [`CapabilitySource`] seam. Rows are
//! keyed by `(role id, resource, capability)`, mirroring the permission
//! table's shape. A present row carries its stored grant/deny bit; a missing
//! row is `Denied` when the resource has rows for other roles (configured,
//! just not for this caller) and `Unconfigured` only when the resource has
//! no rows at all.

use std::collections::HashMap;
use std::sync::RwLock;

use storegate_core::RoleId;

use crate::{
    Capability, CallerIdentity, CapabilityLookup, CapabilitySource, CapabilitySourceError,
};

#[derive(Debug, Default)]
pub struct InMemoryCapabilityTable {
    rows: RwLock<HashMap<(RoleId, String, Capability), bool>>,
}

impl InMemoryCapabilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, role: RoleId, resource: &str, capability: Capability) {
        self.insert(role, resource, capability, true);
    }

    pub fn deny(&self, role: RoleId, resource: &str, capability: Capability) {
        self.insert(role, resource, capability, false);
    }

    fn insert(&self, role: RoleId, resource: &str, capability: Capability, granted: bool) {
        self.rows
            .write()
            .unwrap()
            .insert((role, resource.to_owned(), capability), granted);
    }
}

impl CapabilitySource for InMemoryCapabilityTable {
    fn has_capability(
        &self,
        identity: &CallerIdentity,
        resource: &str,
        capability: Capability,
    ) -> Result<CapabilityLookup, CapabilitySourceError> {
        let rows = self.rows.read().unwrap();
        Ok(
            match rows.get(&(identity.role_id, resource.to_owned(), capability)) {
                Some(true) => CapabilityLookup::Granted,
                Some(false) => CapabilityLookup::Denied,
                None if rows.keys().any(|(_, r, _)| r == resource) => CapabilityLookup::Denied,
                None => CapabilityLookup::Unconfigured,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{evaluate, IdentityHints, UserRecord};
    use storegate_core::Session;

    fn clerk(role: i64) -> CallerIdentity {
        crate::resolve_identity(
            &Session::new("s"),
            &IdentityHints {
                user: Some(UserRecord {
                    id: Some(5),
                    role_id: Some(role),
                    ..UserRecord::default()
                }),
            },
        )
    }

    #[test]
    fn rows_resolve_per_role_and_capability() {
        let table = InMemoryCapabilityTable::new();
        table.grant(RoleId::new(2), "brands", Capability::ViewAll);
        table.deny(RoleId::new(2), "brands", Capability::DeleteAll);

        let set = evaluate(&table, "brands", &clerk(2));
        assert!(set.view_all);
        assert!(!set.delete_all);
    }

    #[test]
    fn configured_resource_denies_roles_without_rows() {
        let table = InMemoryCapabilityTable::new();
        table.grant(RoleId::new(2), "brands", Capability::ViewAll);

        // Rows exist for brands, just not for this role: denied, no fallback.
        let set = evaluate(&table, "brands", &clerk(9));
        assert!(!set.can_view());
    }

    #[test]
    fn resource_without_any_rows_reports_unconfigured() {
        let table = InMemoryCapabilityTable::new();
        table.grant(RoleId::new(2), "brands", Capability::ViewAll);

        // No rows at all for carts: the tenant-view fallback applies.
        let set = evaluate(&table, "carts", &clerk(9));
        assert!(set.view_tenant);
    }
}
