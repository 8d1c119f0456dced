//! Caller identity resolution.
//!
//! Builds one normalized [`CallerIdentity`] per request from whatever auth
//! state exists, in strict precedence order, and never fails: every broken or
//! missing input degrades one tier, ending at the guest identity.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;

use storegate_core::session::{coerce_i64, keys};
use storegate_core::{EntityId, RoleId, Session, TenantId, UserId};

use crate::{Permission, Role};

/// Normalized caller identity for one request.
///
/// Created once, immutable afterward. The guest identity is the zero value:
/// `id = 0`, `role_id = 0`, empty permission and role sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallerIdentity {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub role_id: RoleId,
    pub tenant_id: TenantId,
    pub entity_id: Option<EntityId>,
    pub preferred_language: Option<String>,
    pub permissions: HashSet<Permission>,
    pub roles: HashSet<Role>,
    pub is_super_admin: bool,
}

impl CallerIdentity {
    /// The anonymous fallback identity.
    pub fn guest() -> Self {
        Self {
            id: UserId::zero(),
            username: "guest".to_owned(),
            email: None,
            role_id: RoleId::zero(),
            tenant_id: TenantId::zero(),
            entity_id: None,
            preferred_language: None,
            permissions: HashSet::new(),
            roles: HashSet::new(),
            is_super_admin: false,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.id.is_zero()
    }

    pub fn is_authenticated(&self) -> bool {
        !self.is_guest()
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
            || self.permissions.iter().any(Permission::is_wildcard)
    }
}

/// A loosely-typed user record, as stored by login flows (session `user` key)
/// or produced by the bootstrap layer.
///
/// Field extraction is tolerant: ids may arrive as numbers or numeric
/// strings, collections may be absent. [`UserRecord::from_value`] owns all of
/// that coercion so identity resolution itself stays dumb.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserRecord {
    pub id: Option<i64>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role_id: Option<i64>,
    pub tenant_id: Option<i64>,
    pub entity_id: Option<i64>,
    pub preferred_language: Option<String>,
    pub permissions: Vec<String>,
    pub roles: Vec<String>,
    pub is_super_admin: bool,
}

impl UserRecord {
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let string_list = |key: &str| -> Vec<String> {
            match obj.get(key) {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_owned)
                    .collect(),
                _ => Vec::new(),
            }
        };

        Some(Self {
            id: obj.get("id").and_then(coerce_i64),
            username: obj.get("username").and_then(Value::as_str).map(str::to_owned),
            email: obj.get("email").and_then(Value::as_str).map(str::to_owned),
            role_id: obj.get("role_id").and_then(coerce_i64),
            tenant_id: obj.get("tenant_id").and_then(coerce_i64),
            entity_id: obj.get("entity_id").and_then(coerce_i64),
            preferred_language: obj
                .get("preferred_language")
                .and_then(Value::as_str)
                .map(str::to_owned),
            permissions: string_list("permissions"),
            roles: string_list("roles"),
            is_super_admin: obj
                .get("is_super_admin")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        })
    }
}

/// Identity material handed over by the bootstrap layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityHints {
    /// A user record the bootstrap code already materialized, if any.
    pub user: Option<UserRecord>,
}

/// Resolve the caller identity for this request.
///
/// Precedence: bootstrap-materialized user, then the session `user` record,
/// then individual session scalars, then guest. Infallible: this function can
/// only degrade, never error.
pub fn resolve_identity(session: &Session, hints: &IdentityHints) -> CallerIdentity {
    if let Some(record) = &hints.user {
        return identity_from_record(record);
    }

    if let Some(record) = session.user_record().and_then(UserRecord::from_value) {
        return identity_from_record(&record);
    }

    if let Some(user_id) = session.get_i64(keys::USER_ID) {
        return identity_from_scalars(session, user_id);
    }

    CallerIdentity::guest()
}

fn identity_from_record(record: &UserRecord) -> CallerIdentity {
    let roles: HashSet<Role> = record
        .roles
        .iter()
        .map(|r| Role::new(r.clone()))
        .collect();

    let permissions: HashSet<Permission> = record
        .permissions
        .iter()
        .map(|p| Permission::new(p.clone()))
        .collect();

    let is_super_admin = record.is_super_admin || roles.iter().any(Role::is_super_admin);

    CallerIdentity {
        id: record.id.map(UserId::new).unwrap_or_default(),
        username: record
            .username
            .clone()
            .unwrap_or_else(|| "guest".to_owned()),
        email: record.email.clone(),
        role_id: record.role_id.map(RoleId::new).unwrap_or_default(),
        tenant_id: record.tenant_id.map(TenantId::new).unwrap_or_default(),
        entity_id: record.entity_id.map(EntityId::new),
        preferred_language: record.preferred_language.clone(),
        permissions,
        roles,
        is_super_admin,
    }
}

/// Minimal identity synthesized from individual session scalars, for sessions
/// written by legacy login code that never stored a full user record.
fn identity_from_scalars(session: &Session, user_id: i64) -> CallerIdentity {
    let permissions: HashSet<Permission> = session
        .permission_names()
        .into_iter()
        .map(Permission::new)
        .collect();

    CallerIdentity {
        id: UserId::new(user_id),
        username: session
            .get_str(keys::USERNAME)
            .unwrap_or("guest")
            .to_owned(),
        email: None,
        role_id: session
            .get_i64(keys::ROLE_ID)
            .map(RoleId::new)
            .unwrap_or_default(),
        tenant_id: TenantId::zero(),
        entity_id: None,
        preferred_language: session
            .get_str(keys::PREFERRED_LANGUAGE)
            .map(str::to_owned),
        permissions,
        roles: HashSet::new(),
        is_super_admin: false,
    }
}
