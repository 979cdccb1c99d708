// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Per-unit diagnostic collection.

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One diagnostic line for the external log sink.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    /// Terminal rendering with a colored severity tag.
    pub fn render(&self) -> String {
        let tag = match self.severity {
            Severity::Error => "error:".red().bold(),
            Severity::Warning => "warning:".yellow().bold(),
        };
        format!("{tag} {}", self.message)
    }
}

/// Collector owned by one transformation pass. When silenced,
/// warnings are dropped at the door.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    silent: bool,
}

impl Diagnostics {
    pub fn new(silent: bool) -> Self {
        Self {
            entries: Vec::new(),
            silent,
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        if self.silent {
            return;
        }
        self.entries.push(Diagnostic::warning(message));
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.entries)
    }
}
