//! Explicit session state.
//!
//! The engine never reads ambient/global request state. The hosting
//! environment loads the caller's session record once, hands it to the
//! pipeline as a [`Session`] value, and persists it back afterwards through
//! the [`SessionStore`] seam.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde_json::Value;

/// Session keys the engine reads or writes. Everything else in the record is
/// carried through untouched.
pub mod keys {
    pub const USER: &str = "user";
    pub const USER_ID: &str = "user_id";
    pub const USERNAME: &str = "username";
    pub const ROLE_ID: &str = "role_id";
    pub const PERMISSIONS: &str = "permissions";
    pub const PREFERRED_LANGUAGE: &str = "preferred_language";
    pub const CSRF_TOKEN: &str = "csrf_token";
}

/// A caller's server-side session record.
///
/// Values are loosely typed (`serde_json::Value`) because the record is
/// shared with legacy writers; the typed accessors below own all coercion so
/// downstream code never re-sniffs.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: String,
    values: BTreeMap<String, Value>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn from_values(id: impl Into<String>, values: BTreeMap<String, Value>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// The raw authenticated-user record, if a login flow stored one.
    pub fn user_record(&self) -> Option<&Value> {
        self.get(keys::USER).filter(|v| v.is_object())
    }

    /// Integer read with coercion: JSON numbers and numeric strings both
    /// count. Legacy writers store ids either way.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        coerce_i64(self.get(key)?)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// Permission names stored in the session, coerced to a string list.
    /// Accepts a JSON array of strings or a single comma-separated string.
    pub fn permission_names(&self) -> Vec<String> {
        match self.get(keys::PERMISSIONS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_owned)
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.get_str(keys::CSRF_TOKEN)
    }

    pub fn set_csrf_token(&mut self, token: impl Into<String>) {
        self.set(keys::CSRF_TOKEN, Value::String(token.into()));
    }
}

/// Coerce a loosely-typed session value to an integer.
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Persistence seam for session records.
///
/// The hosting environment owns serialization and expiry; the engine only
/// reads and writes specific keys of one record per request.
pub trait SessionStore: Send + Sync {
    fn load(&self, session_id: &str) -> Option<Session>;
    fn save(&self, session: &Session);
}

/// In-memory store for tests and the demo server.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: Mutex<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, session_id: &str) -> Option<Session> {
        self.inner.lock().unwrap().get(session_id).cloned()
    }

    fn save(&self, session: &Session) {
        self.inner
            .lock()
            .unwrap()
            .insert(session.id().to_owned(), session.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_coercion_accepts_numbers_and_numeric_strings() {
        let mut session = Session::new("s1");
        session.set(keys::USER_ID, json!(7));
        assert_eq!(session.get_i64(keys::USER_ID), Some(7));

        session.set(keys::USER_ID, json!("8"));
        assert_eq!(session.get_i64(keys::USER_ID), Some(8));

        session.set(keys::USER_ID, json!({"nested": true}));
        assert_eq!(session.get_i64(keys::USER_ID), None);
    }

    #[test]
    fn permission_names_accept_array_or_csv() {
        let mut session = Session::new("s1");
        session.set(keys::PERMISSIONS, json!(["brands.manage", "carts.create"]));
        assert_eq!(
            session.permission_names(),
            vec!["brands.manage".to_string(), "carts.create".to_string()]
        );

        session.set(keys::PERMISSIONS, json!("brands.manage, carts.create ,"));
        assert_eq!(
            session.permission_names(),
            vec!["brands.manage".to_string(), "carts.create".to_string()]
        );
    }

    #[test]
    fn user_record_must_be_an_object() {
        let mut session = Session::new("s1");
        session.set(keys::USER, json!("not-an-object"));
        assert!(session.user_record().is_none());

        session.set(keys::USER, json!({"id": 1}));
        assert!(session.user_record().is_some());
    }

    #[test]
    fn store_round_trips_sessions() {
        let store = InMemorySessionStore::new();
        let mut session = Session::new("abc");
        session.set_csrf_token("deadbeef");
        store.save(&session);

        let loaded = store.load("abc").unwrap();
        assert_eq!(loaded.csrf_token(), Some("deadbeef"));
        assert!(store.load("missing").is_none());
    }
}
