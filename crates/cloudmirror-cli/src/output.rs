//! Human and JSON renderings of command results
//!
//! Results go to stdout and diagnostics to stderr. In JSON mode every line
//! on stdout is one JSON document, so informational chatter and labelled
//! fields are dropped there; commands emit a single object through
//! [`OutputFormatter::print_json`] instead.

use std::cell::RefCell;
use std::io::{self, Write};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    /// A labelled value, e.g. one line of a run summary
    fn field(&self, label: &str, value: &str);
    fn print_json(&self, value: &serde_json::Value);
}

/// Writes command output in one [`OutputFormat`]
///
/// Write errors (a closed pipe, usually) are ignored rather than aborting
/// the command.
pub struct Printer<W: Write, E: Write> {
    format: OutputFormat,
    out: RefCell<W>,
    err: RefCell<E>,
}

impl Printer<io::Stdout, io::Stderr> {
    pub fn stdio(format: OutputFormat) -> Self {
        Self::new(format, io::stdout(), io::stderr())
    }
}

impl<W: Write, E: Write> Printer<W, E> {
    pub fn new(format: OutputFormat, out: W, err: E) -> Self {
        Self {
            format,
            out: RefCell::new(out),
            err: RefCell::new(err),
        }
    }

    fn out_line(&self, line: &str) {
        let _ = writeln!(self.out.borrow_mut(), "{line}");
    }

    fn err_line(&self, line: &str) {
        let _ = writeln!(self.err.borrow_mut(), "{line}");
    }

    #[cfg(test)]
    fn into_parts(self) -> (W, E) {
        (self.out.into_inner(), self.err.into_inner())
    }
}

impl<W: Write, E: Write> OutputFormatter for Printer<W, E> {
    fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => self.out_line(&format!("\u{2713} {message}")),
            OutputFormat::Json => self.out_line(
                &serde_json::json!({"success": true, "message": message}).to_string(),
            ),
        }
    }

    fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Human => self.err_line(&format!("\u{2717} Error: {message}")),
            OutputFormat::Json => self.err_line(
                &serde_json::json!({"success": false, "error": message}).to_string(),
            ),
        }
    }

    fn warn(&self, message: &str) {
        match self.format {
            OutputFormat::Human => self.err_line(&format!("\u{26a0} Warning: {message}")),
            OutputFormat::Json => self.err_line(
                &serde_json::json!({"level": "warning", "message": message}).to_string(),
            ),
        }
    }

    fn info(&self, message: &str) {
        if self.format == OutputFormat::Human {
            self.out_line(&format!("  {message}"));
        }
    }

    fn field(&self, label: &str, value: &str) {
        if self.format == OutputFormat::Human {
            self.out_line(&format!("  {:<22} {value}", format!("{label}:")));
        }
    }

    fn print_json(&self, value: &serde_json::Value) {
        if self.format == OutputFormat::Json {
            self.out_line(&serde_json::to_string_pretty(value).unwrap_or_default());
        }
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    Box::new(Printer::stdio(format))
}
