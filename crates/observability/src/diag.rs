//! Out-of-band diagnostic log.
//!
//! Failures inside the fragment pipeline must never reach the HTTP response
//! body; they go here instead. The sink is write-only: nothing in the engine
//! reads it back.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};

/// Write-only diagnostic event sink.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, message: &str);
}

/// Append-only file sink, one `[ISO8601 timestamp] message` line per event.
///
/// The file is opened in append mode and each event is a single `write_all`
/// of one line, so concurrent request-handling processes interleave whole
/// lines without in-process locking. The mutex below only serializes writers
/// within this process.
#[derive(Debug)]
pub struct FileDiagnosticLog {
    path: PathBuf,
    writer: Mutex<()>,
}

impl FileDiagnosticLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DiagnosticSink for FileDiagnosticLog {
    fn record(&self, message: &str) {
        let line = format!(
            "[{}] {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            message.replace('\n', " ")
        );

        let _guard = self.writer.lock().unwrap();
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(line.as_bytes()));

        if let Err(e) = result {
            // Last resort: the diagnostic channel itself is down. Tracing is
            // the only remaining out-of-band surface; stdout stays clean.
            tracing::error!("diagnostic log write failed: {e}");
        }
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemoryDiagnosticLog {
    events: Mutex<Vec<String>>,
}

impl MemoryDiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }
}

impl DiagnosticSink for MemoryDiagnosticLog {
    fn record(&self, message: &str) {
        self.events.lock().unwrap().push(message.to_owned());
    }
}
