//! Workflow command output.
//!
//! The runner interprets stdout lines of the form `::command::payload`:
//! `debug`, `warning` and `error` become annotations, `add-mask`
//! registers a value for redaction in the step transcript. Plain lines
//! pass through as regular log output.

use std::io::Write;

/// Writes workflow commands to an output sink.
///
/// Production code uses [`Logger::stdout`]; tests inject a `Vec<u8>`.
pub struct Logger<W: Write> {
    out: W,
}

impl Logger<std::io::Stdout> {
    /// Creates a logger that prints to stdout.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> Logger<W> {
    /// Creates a logger writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Prints a message at the debug level. Hidden unless the workflow
    /// runs with step debugging enabled.
    pub fn debug(&mut self, message: &str) {
        self.command("debug", message);
    }

    /// Prints a plain informational message.
    pub fn info(&mut self, message: &str) {
        let _ = writeln!(self.out, "{message}");
    }

    /// Prints a warning annotation.
    pub fn warning(&mut self, message: &str) {
        self.command("warning", message);
    }

    /// Prints an error annotation.
    pub fn error(&mut self, message: &str) {
        self.command("error", message);
    }

    /// Tells the runner to mask the supplied value in all future output.
    pub fn set_secret(&mut self, value: &str) {
        self.command("add-mask", value);
    }

    fn command(&mut self, name: &str, payload: &str) {
        let _ = writeln!(self.out, "::{name}::{}", escape_data(payload));
    }
}

/// Escapes a command payload. `%`, CR and LF are significant to the
/// runner's command parser.
fn escape_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
