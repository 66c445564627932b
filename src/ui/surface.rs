//! Status and output regions.
//!
//! A [`Surface`] has two regions: a one-line status and a free-form output
//! buffer. The output can be replaced or appended to; appends are the only
//! way streamed text reaches it.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where the front-end writes what the user sees.
pub trait Surface: Send + Sync {
    /// Replace the status line.
    fn set_status(&self, msg: &str);

    /// Replace the output buffer.
    fn set_output(&self, msg: &str);

    /// Append to the output buffer.
    fn append_output(&self, msg: &str);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct MemoryState {
    status: String,
    output: String,
    status_history: Vec<String>,
    output_history: Vec<String>,
}

/// In-memory surface. Keeps every status and every replaced output.
#[derive(Debug, Default)]
pub struct MemorySurface {
    state: Mutex<MemoryState>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> String {
        lock(&self.state).status.clone()
    }

    pub fn output(&self) -> String {
        lock(&self.state).output.clone()
    }

    /// Every status set so far, oldest first.
    pub fn status_history(&self) -> Vec<String> {
        lock(&self.state).status_history.clone()
    }

    /// Every value passed to `set_output`, oldest first.
    pub fn output_history(&self) -> Vec<String> {
        lock(&self.state).output_history.clone()
    }
}

impl Surface for MemorySurface {
    fn set_status(&self, msg: &str) {
        let mut state = lock(&self.state);
        state.status = msg.to_string();
        state.status_history.push(msg.to_string());
    }

    fn set_output(&self, msg: &str) {
        let mut state = lock(&self.state);
        state.output = msg.to_string();
        state.output_history.push(msg.to_string());
    }

    fn append_output(&self, msg: &str) {
        lock(&self.state).output.push_str(msg);
    }
}

struct TerminalState {
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    /// Last write was a single-line `set_output` that can be redrawn in place.
    replaceable: bool,
    /// Cursor is not at the start of a line.
    line_open: bool,
}

impl TerminalState {
    /// Finish an open output line so the next write starts on its own line.
    fn close_line(&mut self) {
        if self.line_open {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
        }
        self.replaceable = false;
        self.line_open = false;
    }
}

/// Terminal surface: status on stderr, output on stdout.
pub struct TerminalSurface {
    state: Mutex<TerminalState>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::with_writers(std::io::stdout(), std::io::stderr())
    }

    /// Surface writing output to `out` and status lines to `err`.
    pub fn with_writers(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
        Self {
            state: Mutex::new(TerminalState {
                out: Box::new(out),
                err: Box::new(err),
                replaceable: false,
                line_open: false,
            }),
        }
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for TerminalSurface {
    fn set_status(&self, msg: &str) {
        let mut state = lock(&self.state);
        state.close_line();
        let _ = writeln!(state.err, "Status: {msg}");
        let _ = state.err.flush();
    }

    fn set_output(&self, msg: &str) {
        let mut state = lock(&self.state);

        if state.replaceable {
            // Redraw the previous transient line.
            let _ = write!(state.out, "\r\x1b[2K");
        } else if state.line_open {
            let _ = writeln!(state.out);
        }

        let _ = write!(state.out, "{msg}");
        let _ = state.out.flush();

        state.replaceable = !msg.contains('\n');
        state.line_open = !msg.is_empty() && !msg.ends_with('\n');
    }

    fn append_output(&self, msg: &str) {
        if msg.is_empty() {
            return;
        }
        let mut state = lock(&self.state);
        let _ = write!(state.out, "{msg}");
        let _ = state.out.flush();

        state.replaceable = false;
        state.line_open = !msg.ends_with('\n');
    }
}
