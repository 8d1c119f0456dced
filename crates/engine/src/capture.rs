//! Output capture and shell pairing.
//!
//! Two explicit objects instead of nested implicit output buffers:
//! [`OutputCapture`], a linear buffer handed to untrusted code, and
//! [`ShellTracker`], the state machine that guarantees shell open/close
//! markup is emitted in matched pairs.

use storegate_core::{EngineError, EngineResult};

/// Captures everything untrusted code writes during its execution.
///
/// Nothing written here reaches the client directly; the assembler inspects
/// the captured text once and decides what, if anything, to forward.
#[derive(Debug, Default)]
pub struct OutputCapture {
    buffer: String,
}

impl OutputCapture {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn write(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Consume the capture and hand back everything written into it.
    pub fn finish(self) -> String {
        self.buffer
    }
}

impl core::fmt::Write for OutputCapture {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.buffer.push_str(s);
        Ok(())
    }
}

/// Output-rendering states of one assembled response.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShellState {
    NotStarted,
    ShellOpened,
    BodyBuffered,
    Flushed,
    ErrorSubstituted,
    ShellClosed,
}

/// Tracks shell open/close pairing for a single assembler instance.
///
/// `close` is only legal if `open` ran on this same tracker; the decision is
/// carried in state, never sniffed from emitted markup.
#[derive(Debug)]
pub struct ShellTracker {
    state: ShellState,
}

impl ShellTracker {
    pub fn new() -> Self {
        Self {
            state: ShellState::NotStarted,
        }
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    pub fn opened(&self) -> bool {
        self.state != ShellState::NotStarted
    }

    pub fn open(&mut self) -> EngineResult<()> {
        self.transition(ShellState::NotStarted, ShellState::ShellOpened)
    }

    pub fn buffer_body(&mut self) -> EngineResult<()> {
        self.transition(ShellState::ShellOpened, ShellState::BodyBuffered)
    }

    pub fn flush(&mut self) -> EngineResult<()> {
        self.transition(ShellState::BodyBuffered, ShellState::Flushed)
    }

    pub fn substitute_error(&mut self) -> EngineResult<()> {
        self.transition(ShellState::BodyBuffered, ShellState::ErrorSubstituted)
    }

    pub fn close(&mut self) -> EngineResult<()> {
        match self.state {
            ShellState::Flushed | ShellState::ErrorSubstituted => {
                self.state = ShellState::ShellClosed;
                Ok(())
            }
            other => Err(EngineError::capture_state(format!(
                "close from {other:?}"
            ))),
        }
    }

    fn transition(&mut self, from: ShellState, to: ShellState) -> EngineResult<()> {
        if self.state != from {
            return Err(EngineError::capture_state(format!(
                "{to:?} from {:?}",
                self.state
            )));
        }
        self.state = to;
        Ok(())
    }
}

impl Default for ShellTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;

    #[test]
    fn capture_collects_writes_in_order() {
        let mut capture = OutputCapture::start();
        capture.write("one ");
        write!(capture, "{}", 2).unwrap();
        assert_eq!(capture.finish(), "one 2");
    }

    #[test]
    fn happy_path_reaches_shell_closed() {
        let mut tracker = ShellTracker::new();
        tracker.open().unwrap();
        tracker.buffer_body().unwrap();
        tracker.flush().unwrap();
        tracker.close().unwrap();
        assert_eq!(tracker.state(), ShellState::ShellClosed);
    }

    #[test]
    fn error_substitution_path_reaches_shell_closed() {
        let mut tracker = ShellTracker::new();
        tracker.open().unwrap();
        tracker.buffer_body().unwrap();
        tracker.substitute_error().unwrap();
        tracker.close().unwrap();
        assert_eq!(tracker.state(), ShellState::ShellClosed);
    }

    #[test]
    fn close_without_open_is_rejected() {
        let mut tracker = ShellTracker::new();
        assert!(tracker.close().is_err());
    }

    #[test]
    fn skipping_states_is_rejected() {
        let mut tracker = ShellTracker::new();
        tracker.open().unwrap();
        assert!(tracker.flush().is_err());
        assert!(tracker.close().is_err());
    }
}
