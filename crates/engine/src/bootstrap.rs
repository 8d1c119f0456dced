//! Defensive execution of external bootstrap code.
//!
//! The auth/session bootstrap is not fully trusted: it may print, panic, or
//! try to answer the request itself with JSON. It runs here inside a capture
//! so none of that reaches the client, and the run is classified exactly
//! once into a [`BootstrapResult`] — callers never re-sniff the output.

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;

use storegate_auth::IdentityHints;
use storegate_core::Session;
use storegate_observability::DiagnosticSink;

use crate::OutputCapture;

/// External initialization unit (auth/session bootstrap).
///
/// Anything it wants to emit goes through the capture it is handed; a
/// returned error or a panic is contained by the loader.
pub trait BootstrapUnit: Send + Sync {
    /// Short name used in diagnostic-log lines.
    fn name(&self) -> &str {
        "bootstrap"
    }

    fn run(&self, session: &mut Session, out: &mut OutputCapture)
        -> anyhow::Result<IdentityHints>;
}

/// Structured error recovered from JSON a bootstrap unit tried to emit.
#[derive(Debug, Clone, PartialEq)]
pub struct LeakedJson {
    /// Human-readable message extracted from the payload.
    pub message: String,
    pub raw: Value,
}

impl LeakedJson {
    fn from_value(raw: Value) -> Self {
        let message = raw
            .get("error")
            .and_then(Value::as_str)
            .or_else(|| raw.get("message").and_then(Value::as_str))
            .unwrap_or("bootstrap attempted an API response")
            .to_owned();
        Self { message, raw }
    }
}

/// One-shot classification of a bootstrap run.
#[derive(Debug, PartialEq)]
pub enum BootstrapResult {
    /// Ran cleanly, produced no output.
    Clean(IdentityHints),
    /// Ran, but printed non-JSON text. Legitimate legacy output: the
    /// assembler re-emits it verbatim.
    LeakedText { hints: IdentityHints, text: String },
    /// Ran, but emitted JSON — it tried to act as an API responder. The
    /// payload is suppressed from the HTML stream and surfaced as a
    /// sanitized error instead.
    LeakedError { hints: IdentityHints, error: LeakedJson },
    /// Returned an error or panicked. Identity degrades to guest.
    Failed { reason: String },
}

impl BootstrapResult {
    /// Identity material for the resolver; failure degrades to no hints.
    pub fn hints(&self) -> IdentityHints {
        match self {
            BootstrapResult::Clean(hints)
            | BootstrapResult::LeakedText { hints, .. }
            | BootstrapResult::LeakedError { hints, .. } => hints.clone(),
            BootstrapResult::Failed { .. } => IdentityHints::default(),
        }
    }

    /// Whether a "server error" banner must be queued for shell rendering.
    pub fn needs_banner(&self) -> bool {
        matches!(
            self,
            BootstrapResult::Failed { .. } | BootstrapResult::LeakedError { .. }
        )
    }

    /// Text safe to forward to the HTML stream, if any.
    pub fn passthrough_text(&self) -> Option<&str> {
        match self {
            BootstrapResult::LeakedText { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Run a bootstrap unit so that it cannot corrupt the response.
///
/// Never fatal: every failure path degrades to guest identity and a
/// diagnostic-log entry. Panics are contained, the Rust analogue of
/// escalating warnings to catchable failures so partial execution cannot
/// silently continue.
pub fn load_defensively(
    unit: &dyn BootstrapUnit,
    session: &mut Session,
    diag: &dyn DiagnosticSink,
) -> BootstrapResult {
    let mut capture = OutputCapture::start();

    let outcome = catch_unwind(AssertUnwindSafe(|| unit.run(session, &mut capture)));
    let captured = capture.finish();

    match outcome {
        Err(panic) => {
            let reason = panic_message(&panic);
            diag.record(&format!("{} panicked: {reason}", unit.name()));
            tracing::error!(unit = unit.name(), %reason, "bootstrap panicked");
            BootstrapResult::Failed { reason }
        }
        Ok(Err(err)) => {
            let reason = format!("{err:#}");
            diag.record(&format!("{} failed: {reason}", unit.name()));
            tracing::warn!(unit = unit.name(), %reason, "bootstrap failed");
            BootstrapResult::Failed { reason }
        }
        Ok(Ok(hints)) => classify_output(unit.name(), hints, captured, diag),
    }
}

fn classify_output(
    unit_name: &str,
    hints: IdentityHints,
    captured: String,
    diag: &dyn DiagnosticSink,
) -> BootstrapResult {
    let trimmed = captured.trim();
    if trimmed.is_empty() {
        return BootstrapResult::Clean(hints);
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(raw) = serde_json::from_str::<Value>(trimmed) {
            let error = LeakedJson::from_value(raw);
            diag.record(&format!(
                "{unit_name} emitted JSON, suppressed from HTML stream: {}",
                error.message
            ));
            return BootstrapResult::LeakedError { hints, error };
        }
    }

    BootstrapResult::LeakedText {
        hints,
        text: captured,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storegate_auth::UserRecord;
    use storegate_observability::MemoryDiagnosticLog;

    struct Quiet;
    impl BootstrapUnit for Quiet {
        fn run(
            &self,
            _session: &mut Session,
            _out: &mut OutputCapture,
        ) -> anyhow::Result<IdentityHints> {
            Ok(IdentityHints {
                user: Some(UserRecord {
                    id: Some(3),
                    ..UserRecord::default()
                }),
            })
        }
    }

    struct Chatty;
    impl BootstrapUnit for Chatty {
        fn run(
            &self,
            _session: &mut Session,
            out: &mut OutputCapture,
        ) -> anyhow::Result<IdentityHints> {
            out.write("legacy banner text");
            Ok(IdentityHints::default())
        }
    }

    struct JsonResponder;
    impl BootstrapUnit for JsonResponder {
        fn run(
            &self,
            _session: &mut Session,
            out: &mut OutputCapture,
        ) -> anyhow::Result<IdentityHints> {
            out.write(r#" {"error": "db gone", "code": 500} "#);
            Ok(IdentityHints::default())
        }
    }

    struct Panicking;
    impl BootstrapUnit for Panicking {
        fn run(
            &self,
            _session: &mut Session,
            _out: &mut OutputCapture,
        ) -> anyhow::Result<IdentityHints> {
            panic!("warning escalated to error");
        }
    }

    struct Erroring;
    impl BootstrapUnit for Erroring {
        fn run(
            &self,
            _session: &mut Session,
            _out: &mut OutputCapture,
        ) -> anyhow::Result<IdentityHints> {
            anyhow::bail!("auth include missing")
        }
    }

    #[test]
    fn clean_run_passes_hints_through() {
        let diag = MemoryDiagnosticLog::new();
        let mut session = Session::new("s");
        let result = load_defensively(&Quiet, &mut session, &diag);

        assert!(matches!(result, BootstrapResult::Clean(_)));
        assert_eq!(result.hints().user.unwrap().id, Some(3));
        assert!(!result.needs_banner());
        assert!(diag.is_empty());
    }

    #[test]
    fn plain_text_output_is_preserved_for_passthrough() {
        let diag = MemoryDiagnosticLog::new();
        let mut session = Session::new("s");
        let result = load_defensively(&Chatty, &mut session, &diag);

        assert_eq!(result.passthrough_text(), Some("legacy banner text"));
        assert!(!result.needs_banner());
    }

    #[test]
    fn json_output_is_suppressed_and_recorded() {
        let diag = MemoryDiagnosticLog::new();
        let mut session = Session::new("s");
        let result = load_defensively(&JsonResponder, &mut session, &diag);

        let BootstrapResult::LeakedError { error, .. } = &result else {
            panic!("expected LeakedError, got {result:?}");
        };
        assert_eq!(error.message, "db gone");
        assert!(result.needs_banner());
        assert!(result.passthrough_text().is_none());
        assert_eq!(diag.events().len(), 1);
    }

    #[test]
    fn panic_degrades_to_failed_with_diagnostics() {
        let diag = MemoryDiagnosticLog::new();
        let mut session = Session::new("s");
        let result = load_defensively(&Panicking, &mut session, &diag);

        let BootstrapResult::Failed { reason } = &result else {
            panic!("expected Failed, got {result:?}");
        };
        assert!(reason.contains("warning escalated"));
        assert!(result.hints().user.is_none());
        assert_eq!(diag.events().len(), 1);
    }

    #[test]
    fn returned_error_degrades_to_failed() {
        let diag = MemoryDiagnosticLog::new();
        let mut session = Session::new("s");
        let result = load_defensively(&Erroring, &mut session, &diag);

        assert!(matches!(result, BootstrapResult::Failed { .. }));
        assert!(result.needs_banner());
    }

    #[test]
    fn malformed_json_counts_as_plain_text() {
        struct Broken;
        impl BootstrapUnit for Broken {
            fn run(
                &self,
                _session: &mut Session,
                out: &mut OutputCapture,
            ) -> anyhow::Result<IdentityHints> {
                out.write("{ this is not json");
                Ok(IdentityHints::default())
            }
        }

        let diag = MemoryDiagnosticLog::new();
        let mut session = Session::new("s");
        let result = load_defensively(&Broken, &mut session, &diag);
        assert!(matches!(result, BootstrapResult::LeakedText { .. }));
    }
}
