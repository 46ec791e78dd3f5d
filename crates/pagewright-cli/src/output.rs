//! Console output for scenario lists and run summaries

use console::{Style, Term};
use pagewright::scenarios::{Scenario, ScenarioOutcome, ScenarioReport, SuiteSummary};

/// Writes human-readable lines to stdout
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl Reporter {
    /// Create a new reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stdout(),
            use_color,
            quiet,
        }
    }

    fn paint(&self, text: &str, style: &Style) -> String {
        if self.use_color {
            style.apply_to(text).force_styling(true).to_string()
        } else {
            text.to_string()
        }
    }

    fn line(&self, text: &str) {
        if !self.quiet {
            let _ = self.term.write_line(text);
        }
    }

    /// One line for a finished scenario
    #[must_use]
    pub fn format_report(&self, report: &ScenarioReport) -> String {
        let status = match &report.outcome {
            ScenarioOutcome::Passed => self.paint("PASS", &Style::new().green().bold()),
            ScenarioOutcome::Skipped { .. } => self.paint("SKIP", &Style::new().yellow()),
            ScenarioOutcome::Failed { .. } => self.paint("FAIL", &Style::new().red().bold()),
        };
        let mut line = format!(
            "{status} {} {} ({} ms)",
            report.id, report.title, report.elapsed_ms
        );
        match &report.outcome {
            ScenarioOutcome::Skipped { reason } => line.push_str(&format!("\n     skipped: {reason}")),
            ScenarioOutcome::Failed { error } => {
                line.push_str(&format!("\n     {}", self.paint(error, &Style::new().red())));
                if let Some(url) = report.diagnostics.get("url") {
                    line.push_str(&format!("\n     at {url}"));
                }
            }
            ScenarioOutcome::Passed => {}
        }
        line
    }

    /// Totals line
    #[must_use]
    pub fn format_summary(&self, summary: &SuiteSummary) -> String {
        let style = if summary.all_passed() {
            Style::new().green().bold()
        } else {
            Style::new().red().bold()
        };
        let totals = format!(
            "{} passed, {} failed, {} skipped ({} total) in {:.1}s",
            summary.passed_count(),
            summary.failed_count(),
            summary.skipped_count(),
            summary.total(),
            summary.elapsed_ms as f64 / 1000.0
        );
        self.paint(&totals, &style)
    }

    /// Print every report grouped under its module, then totals
    pub fn print_summary(&self, summary: &SuiteSummary) {
        let mut module = "";
        for report in &summary.reports {
            if report.module != module {
                module = &report.module;
                self.line(&self.paint(module, &Style::new().cyan().bold()));
            }
            self.line(&format!("  {}", self.format_report(report)));
        }
        self.line("");
        self.line(&self.format_summary(summary));
    }

    /// Table of catalog entries
    #[must_use]
    pub fn format_catalog(&self, scenarios: &[Scenario]) -> String {
        let mut out = String::new();
        for scenario in scenarios {
            let skip = scenario
                .skip
                .map(|reason| format!("  [skip: {reason}]"))
                .unwrap_or_default();
            out.push_str(&format!(
                "{}  {:<22} {}{}\n",
                self.paint(scenario.id, &Style::new().bold()),
                scenario.module,
                scenario.title,
                skip
            ));
        }
        out.push_str(&format!("{} scenarios", scenarios.len()));
        out
    }

    /// Print the catalog table
    pub fn print_catalog(&self, scenarios: &[Scenario]) {
        let _ = self.term.write_line(&self.format_catalog(scenarios));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn report(id: &str, outcome: ScenarioOutcome) -> ScenarioReport {
        let mut diagnostics = BTreeMap::new();
        let _ = diagnostics.insert("url".to_string(), "https://www.littmann.in/x".to_string());
        ScenarioReport {
            id: id.to_string(),
            title: "Search for a product".to_string(),
            module: "Search Functionality".to_string(),
            outcome,
            elapsed_ms: 1234,
            diagnostics,
        }
    }

    #[test]
    fn test_passed_line() {
        let reporter = Reporter::new(false, false);
        let line = reporter.format_report(&report("TC013", ScenarioOutcome::Passed));
        assert_eq!(line, "PASS TC013 Search for a product (1234 ms)");
    }

    #[test]
    fn test_failed_line_includes_error_and_url() {
        let reporter = Reporter::new(false, false);
        let line = reporter.format_report(&report(
            "TC014",
            ScenarioOutcome::Failed {
                error: "Element not found".to_string(),
            },
        ));
        assert!(line.starts_with("FAIL TC014"));
        assert!(line.contains("Element not found"));
        assert!(line.contains("at https://www.littmann.in/x"));
    }

    #[test]
    fn test_skipped_line_has_reason() {
        let reporter = Reporter::new(false, false);
        let line = reporter.format_report(&report("TC017", ScenarioOutcome::skipped("redirect")));
        assert!(line.contains("skipped: redirect"));
    }

    #[test]
    fn test_summary_totals() {
        let reporter = Reporter::new(false, true);
        let summary = SuiteSummary {
            reports: vec![
                report("TC013", ScenarioOutcome::Passed),
                report("TC017", ScenarioOutcome::skipped("redirect")),
            ],
            elapsed_ms: 2500,
        };
        assert_eq!(
            reporter.format_summary(&summary),
            "1 passed, 0 failed, 1 skipped (2 total) in 2.5s"
        );
    }

    #[test]
    fn test_catalog_table_lists_every_entry() {
        let reporter = Reporter::new(false, false);
        let catalog = pagewright::catalog();
        let table = reporter.format_catalog(&catalog);
        assert!(table.contains("TC001"));
        assert!(table.contains("[skip: "));
        assert!(table.ends_with(&format!("{} scenarios", catalog.len())));
    }

    #[test]
    fn test_color_adds_escape_codes() {
        let reporter = Reporter::new(true, false);
        let line = reporter.format_report(&report("TC013", ScenarioOutcome::Passed));
        assert!(line.contains('\u{1b}'));
    }
}
