//! Output formatting

use crate::config::{CliConfig, Verbosity};
use console::{style, Term};
use console_harness::{ResourceKind, TeardownReport};

/// Writes user-facing lines to stdout, colored when allowed
#[derive(Debug)]
pub struct Printer {
    term: Term,
    color: bool,
    verbosity: Verbosity,
}

impl Printer {
    /// Printer for the given CLI configuration
    #[must_use]
    pub fn new(config: &CliConfig) -> Self {
        Self {
            term: Term::stdout(),
            color: config.color.should_color(),
            verbosity: config.verbosity,
        }
    }

    fn line(&self, text: &str) {
        // Broken pipe on stdout is not worth failing the command for
        let _ = self.term.write_line(text);
    }

    /// Unconditional output (data the command was asked for)
    pub fn data(&self, text: &str) {
        self.line(text);
    }

    /// Section header
    pub fn header(&self, text: &str) {
        if self.verbosity.is_quiet() {
            return;
        }
        if self.color {
            self.line(&style(text).bold().to_string());
        } else {
            self.line(text);
        }
    }

    /// Success line
    pub fn success(&self, text: &str) {
        if self.verbosity.is_quiet() {
            return;
        }
        let mark = if self.color {
            style("✓").green().to_string()
        } else {
            "ok".to_string()
        };
        self.line(&format!("{mark} {text}"));
    }

    /// Failure line; shown even in quiet mode
    pub fn failure(&self, text: &str) {
        let mark = if self.color {
            style("✗").red().to_string()
        } else {
            "FAILED".to_string()
        };
        self.line(&format!("{mark} {text}"));
    }

    /// One kind's listing
    pub fn listing(&self, kind: ResourceKind, names: &[String]) {
        self.header(&format!("{kind} ({})", names.len()));
        for name in names {
            self.data(&format!("  {name}"));
        }
    }

    /// Teardown outcome
    pub fn report(&self, report: &TeardownReport) {
        for record in &report.deleted {
            self.success(&format!("deleted {record}"));
        }
        for (kind, error) in &report.listing_failures {
            self.failure(&format!("could not list {kind}: {error}"));
        }
        for failure in &report.failures {
            self.failure(&format!("{}: {}", failure.record, failure.error));
        }
        self.header(&format!(
            "{} deleted, {} failed",
            report.deleted.len(),
            report.failures.len()
        ));
    }
}

/// Format a boolean for display
#[must_use]
pub const fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_no() {
        assert_eq!(yes_no(true), "yes");
        assert_eq!(yes_no(false), "no");
    }

    #[test]
    fn test_printer_honors_color_choice() {
        let config = CliConfig::new().with_color(crate::config::ColorChoice::Never);
        let printer = Printer::new(&config);
        assert!(!printer.color);
        assert_eq!(printer.verbosity, Verbosity::Normal);
    }
}
