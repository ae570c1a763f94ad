//! Collected export diagnostics.
//!
//! Recoverable problems never abort an export. They are recorded here and
//! mirrored to the `log` facade so a CLI user sees them as they happen while
//! library callers can inspect them afterwards.

use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single reported condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

/// Ordered list of diagnostics for one export run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and forward it to the logger.
    pub fn report(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info => log::info!("{}", message),
            Severity::Warning => log::warn!("{}", message),
            Severity::Error => log::error!("{}", message),
        }
        self.entries.push(Diagnostic::new(severity, message));
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }

    /// Number of diagnostics at warning level or above.
    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity >= Severity::Warning)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check whether any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|d| d.message.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_and_count() {
        let mut diags = Diagnostics::new();
        diags.report(Severity::Info, "exported 3 shapes");
        diags.report(Severity::Warning, "node Foo is not supported");
        diags.report(Severity::Error, "mesh Bar is broken");

        assert_eq!(diags.entries().len(), 3);
        assert_eq!(diags.warning_count(), 2);
        assert!(diags.contains("Foo"));
        assert!(!diags.contains("Baz"));
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::new(Severity::Warning, "something odd");
        assert_eq!(d.to_string(), "[warning] something odd");
    }
}
