//! Translation file resolution.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::TranslationTree;

pub const DEFAULT_LANGUAGE: &str = "en";

/// Loads per-module translation files from
/// `<languages_root>/<Module>/<language>.json`.
///
/// Each module may carry its own language whitelist; a requested language
/// outside it is silently replaced by the default. Load failures degrade to
/// the default-language file and then to the empty tree — callers supply
/// literal fallback text per lookup.
#[derive(Debug, Clone)]
pub struct I18nResolver {
    languages_root: PathBuf,
    default_language: String,
    whitelists: HashMap<String, Vec<String>>,
}

impl I18nResolver {
    pub fn new(languages_root: impl Into<PathBuf>) -> Self {
        Self {
            languages_root: languages_root.into(),
            default_language: DEFAULT_LANGUAGE.to_owned(),
            whitelists: HashMap::new(),
        }
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.default_language = language.into();
        self
    }

    /// Allow the listed languages for one module (the default language is
    /// always allowed).
    pub fn with_whitelist(
        mut self,
        module: impl Into<String>,
        languages: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.whitelists.insert(
            module.into(),
            languages.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Load a module's translations for the requested language.
    pub fn load(&self, module: &str, language: &str) -> TranslationTree {
        let language = self.effective_language(module, language);

        if let Some(tree) = self.load_file(module, language) {
            return tree;
        }

        if language != self.default_language {
            tracing::debug!(
                module,
                language,
                "translation file unreadable, falling back to default language"
            );
            if let Some(tree) = self.load_file(module, &self.default_language) {
                return tree;
            }
        }

        tracing::debug!(module, "no translation file readable, using empty tree");
        TranslationTree::empty()
    }

    /// Whitelist check; anything not explicitly allowed becomes the default.
    /// Also rejects codes that could escape the languages root.
    fn effective_language<'a>(&'a self, module: &str, language: &'a str) -> &'a str {
        if language == self.default_language {
            return language;
        }

        let safe = !language.is_empty()
            && language
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        let whitelisted = self
            .whitelists
            .get(module)
            .is_some_and(|langs| langs.iter().any(|l| l == language));

        if safe && whitelisted {
            language
        } else {
            &self.default_language
        }
    }

    fn load_file(&self, module: &str, language: &str) -> Option<TranslationTree> {
        let path = self
            .languages_root
            .join(module)
            .join(format!("{language}.json"));

        let raw = std::fs::read_to_string(&path).ok()?;
        let doc: serde_json::Value = serde_json::from_str(&raw).ok()?;
        Some(TranslationTree::from_document(&doc))
    }
}
