//! `storegate-observability` — process logging and the diagnostic sink.

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Out-of-band diagnostic log (append-only, write-only).
pub mod diag;

pub use diag::{DiagnosticSink, FileDiagnosticLog, MemoryDiagnosticLog};
