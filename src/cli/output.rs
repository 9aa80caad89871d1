//! Operator-facing text for the `check` and `run` commands.
//!
//! Summary blocks are rendered to a string before printing so their layout
//! can be tested without capturing stdout.

use std::fmt::{Display, Write as _};
use std::io::{self, Write};

const RULE_WIDTH: usize = 56;
const LABEL_WIDTH: usize = 18;

/// Outcome marker for a one-line status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Passed,
    Warning,
    Failed,
}

impl Status {
    const fn marker(self) -> &'static str {
        match self {
            Self::Passed => "✓",
            Self::Warning => "⚠",
            Self::Failed => "✗",
        }
    }
}

/// Print a status line. Failures go to stderr.
pub fn status(status: Status, message: &str) {
    match status {
        Status::Failed => eprintln!("{} {message}", status.marker()),
        _ => println!("{} {message}", status.marker()),
    }
}

/// A titled block of aligned fields, optionally followed by a table.
#[derive(Debug, Clone, Default)]
pub struct Block {
    title: String,
    lines: Vec<String>,
}

impl Block {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, label: &str, value: impl Display) -> Self {
        self.lines.push(format!("  {label:<LABEL_WIDTH$} {value}"));
        self
    }

    /// Continuation text aligned under the previous field's value.
    #[must_use]
    pub fn note(self, text: impl Display) -> Self {
        self.field("", text)
    }

    /// Append a rendered table, indented and separated by a blank line.
    #[must_use]
    pub fn table(mut self, rendered: &str) -> Self {
        self.lines.push(String::new());
        self.lines.extend(rendered.lines().map(|line| format!("  {line}")));
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{}", "─".repeat(RULE_WIDTH));
        for line in &self.lines {
            let _ = writeln!(out, "{line}");
        }
        out
    }

    pub fn print(&self) {
        println!();
        print!("{}", self.render());
    }
}

/// An in-progress step printed as `Label... ok`.
#[must_use = "finish the step to end its line"]
pub struct Step;

impl Step {
    pub fn start(label: &str) -> Self {
        print!("{label}... ");
        let _ = io::stdout().flush();
        Self
    }

    pub fn finish(self, success: bool) {
        println!("{}", if success { "ok" } else { "failed" });
    }
}
