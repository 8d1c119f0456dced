//! Flattened translation tree.

use std::collections::HashMap;

use serde_json::Value;

/// A module's translations, flattened for lookup.
///
/// Every leaf of the source document is registered twice: under its full
/// dotted path (`a.b.c`) and, first-write-wins, under its bare leaf key
/// (`c`). The short-key map is the fallback tier for call sites that only
/// know the trailing segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationTree {
    full: HashMap<String, String>,
    short: HashMap<String, String>,
}

impl TranslationTree {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Flatten a translation document.
    ///
    /// Accepts both the `{ "strings": { ...nested... } }` wrapper and a bare
    /// nested object. Non-object documents produce an empty tree.
    pub fn from_document(doc: &Value) -> Self {
        let root = match doc.get("strings") {
            Some(wrapped) if wrapped.is_object() => wrapped,
            _ => doc,
        };

        let mut tree = Self::default();
        if let Some(obj) = root.as_object() {
            for (key, value) in obj {
                tree.flatten_into(key, key, value);
            }
        }
        tree
    }

    fn flatten_into(&mut self, path: &str, leaf: &str, value: &Value) {
        match value {
            Value::String(s) => self.register(path, leaf, s.clone()),
            // Numeric/bool leaves occur in real files; render them as text.
            Value::Number(n) => self.register(path, leaf, n.to_string()),
            Value::Bool(b) => self.register(path, leaf, b.to_string()),
            Value::Object(obj) => {
                for (key, nested) in obj {
                    let child = format!("{path}.{key}");
                    self.flatten_into(&child, key, nested);
                }
            }
            // Arrays and nulls are not translatable leaves.
            Value::Array(_) | Value::Null => {}
        }
    }

    fn register(&mut self, path: &str, leaf: &str, value: String) {
        self.short
            .entry(leaf.to_owned())
            .or_insert_with(|| value.clone());
        self.full.insert(path.to_owned(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.full.is_empty()
    }

    pub fn len(&self) -> usize {
        self.full.len()
    }

    /// Resolve a dotted key.
    ///
    /// Tiers: exact dotted key, then the key's last segment against the
    /// short-key map, then `fallback` if non-empty, then the key itself.
    pub fn get<'a>(&'a self, key: &'a str, fallback: &'a str) -> &'a str {
        if let Some(value) = self.full.get(key) {
            return value;
        }

        let leaf = key.rsplit('.').next().unwrap_or(key);
        if let Some(value) = self.short.get(leaf) {
            return value;
        }

        if !fallback.is_empty() {
            return fallback;
        }

        key
    }
}
