//! `storegate-i18n` — per-module translation loading and key resolution.
//!
//! Nothing in this crate returns an error: every failure (unknown language,
//! unreadable file, malformed document, missing key) degrades to the next
//! fallback tier, ending at the literal key so the UI never renders blank
//! text.

pub mod resolver;
pub mod tree;

pub use resolver::I18nResolver;
pub use tree::TranslationTree;
