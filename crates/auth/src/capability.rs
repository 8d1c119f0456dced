//! Resource capability matrix.
//!
//! One [`ResourceCapabilitySet`] per `(resource, caller)` pair replaces the
//! per-fragment tangle of individual `can_*` booleans: computed once per
//! request, passed down, never cached across requests.

use serde::Serialize;

/// The eight scoped capability dimensions a resource-permission table can
/// grant independently.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewAll,
    ViewOwn,
    ViewTenant,
    Create,
    EditAll,
    EditOwn,
    DeleteAll,
    DeleteOwn,
}

impl Capability {
    pub const ALL: [Capability; 8] = [
        Capability::ViewAll,
        Capability::ViewOwn,
        Capability::ViewTenant,
        Capability::Create,
        Capability::EditAll,
        Capability::EditOwn,
        Capability::DeleteAll,
        Capability::DeleteOwn,
    ];

    /// Capability name as stored in the permission table.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ViewAll => "view_all",
            Capability::ViewOwn => "view_own",
            Capability::ViewTenant => "view_tenant",
            Capability::Create => "create",
            Capability::EditAll => "edit_all",
            Capability::EditOwn => "edit_own",
            Capability::DeleteAll => "delete_all",
            Capability::DeleteOwn => "delete_own",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully evaluated capabilities of one caller on one resource.
///
/// # Invariants
/// - A super-admin caller gets every flag, for any resource name.
/// - Aggregates are pure ORs of the scoped flags (plus `management` for
///   edit/delete); they are derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceCapabilitySet {
    pub resource: String,
    pub view_all: bool,
    pub view_own: bool,
    pub view_tenant: bool,
    pub create: bool,
    pub edit_all: bool,
    pub edit_own: bool,
    pub delete_all: bool,
    pub delete_own: bool,
    /// Coarse role-based management capability (`"<resource>.manage"` or
    /// `"<resource>.create"` held by the caller).
    pub management: bool,
}

impl ResourceCapabilitySet {
    /// Everything denied.
    pub fn denied(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            view_all: false,
            view_own: false,
            view_tenant: false,
            create: false,
            edit_all: false,
            edit_own: false,
            delete_all: false,
            delete_own: false,
            management: false,
        }
    }

    /// Everything granted (super-admin short-circuit).
    pub fn unrestricted(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            view_all: true,
            view_own: true,
            view_tenant: true,
            create: true,
            edit_all: true,
            edit_own: true,
            delete_all: true,
            delete_own: true,
            management: true,
        }
    }

    pub fn set(&mut self, capability: Capability, granted: bool) {
        match capability {
            Capability::ViewAll => self.view_all = granted,
            Capability::ViewOwn => self.view_own = granted,
            Capability::ViewTenant => self.view_tenant = granted,
            Capability::Create => self.create = granted,
            Capability::EditAll => self.edit_all = granted,
            Capability::EditOwn => self.edit_own = granted,
            Capability::DeleteAll => self.delete_all = granted,
            Capability::DeleteOwn => self.delete_own = granted,
        }
    }

    pub fn get(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewAll => self.view_all,
            Capability::ViewOwn => self.view_own,
            Capability::ViewTenant => self.view_tenant,
            Capability::Create => self.create,
            Capability::EditAll => self.edit_all,
            Capability::EditOwn => self.edit_own,
            Capability::DeleteAll => self.delete_all,
            Capability::DeleteOwn => self.delete_own,
        }
    }

    pub fn can_view(&self) -> bool {
        self.view_all || self.view_own || self.view_tenant
    }

    pub fn can_edit(&self) -> bool {
        self.edit_all || self.edit_own || self.management
    }

    pub fn can_delete(&self) -> bool {
        self.delete_all || self.delete_own || self.management
    }
}
