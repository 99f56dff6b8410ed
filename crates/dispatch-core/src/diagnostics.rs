//! Diagnostics collected while reading a case and checking its structure.
//!
//! Reading a case is lenient: malformed numbers are coerced, rows without a
//! required value are skipped, and none of that stops the run. Every such
//! repair is recorded here so the user can see what was changed.
//!
//! - Severity levels (Warning, Error)
//! - Categories for grouping issues (`coerce`, `skip`, `structure`, ...)
//! - Optional entity references (e.g. "Load_node_3")
//! - Optional line numbers pointing into the source CSV
//!
//! # Example
//!
//! ```
//! use dispatch_core::diagnostics::Diagnostics;
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning("structure", "Case has no branches");
//! diag.add_warning_with_entity("structure", "Bus has no connections", "Bus_node_4");
//!
//! assert_eq!(diag.warning_count(), 2);
//! assert_eq!(diag.summary(), "2 warnings");
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Data was repaired and the run continued
    Warning,
    /// The model cannot be trusted as-is
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g. "coerce", "skip", "structure")
    pub category: String,
    pub message: String,
    /// Line in the source file, header counted as line 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            line: None,
            entity: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }

        Ok(())
    }
}

fn issue_summary(warnings: usize, errors: usize) -> String {
    let plural = |n: usize| if n == 1 { "" } else { "s" };
    match (warnings, errors) {
        (0, 0) => "No issues".to_string(),
        (w, 0) => format!("{} warning{}", w, plural(w)),
        (0, e) => format!("{} error{}", e, plural(e)),
        (w, e) => format!("{} warning{}, {} error{}", w, plural(w), e, plural(e)),
    }
}

/// Collection of diagnostic issues produced by a structural check
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message));
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn summary(&self) -> String {
        issue_summary(self.warning_count(), self.error_count())
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

// ============================================================================
// Case-Reading Extensions
// ============================================================================

/// Counters for a case read.
///
/// Kept apart from the issue list because the reader sets them directly
/// while the issues are appended as rows are visited.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaseStats {
    pub buses: usize,
    pub branches: usize,
    pub generators: usize,
    pub renewables: usize,
    pub loads: usize,
    pub skipped_rows: usize,
    pub coerced_cells: usize,
}

/// Statistics plus issues for one case directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaseDiagnostics {
    pub stats: CaseStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl CaseDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cell that could not be parsed and was replaced by `fallback`
    pub fn record_coerced(
        &mut self,
        sheet: &str,
        line: usize,
        column: &str,
        raw: &str,
        fallback: f64,
    ) {
        let message = format!(
            "{sheet}: column '{column}' value '{raw}' is not numeric, using {fallback}"
        );
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, "coerce", message).with_line(line));
        self.stats.coerced_cells += 1;
    }

    /// Record a row dropped because a required value was absent.
    ///
    /// Skips are expected in sparse sheets, so only the counter moves.
    pub fn record_skipped(&mut self) {
        self.stats.skipped_rows += 1;
    }

    /// Record a row dropped because a required value could not be parsed
    pub fn record_unreadable_row(&mut self, sheet: &str, line: usize, column: &str, raw: &str) {
        let message = format!("{sheet}: column '{column}' value '{raw}' is not usable, row skipped");
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, "skip", message).with_line(line));
        self.stats.skipped_rows += 1;
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    /// Append issues from a structural check
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} buses, {} branches, {} gens, {} renewables, {} loads | {}",
            self.stats.buses,
            self.stats.branches,
            self.stats.generators,
            self.stats.renewables,
            self.stats.loads,
            issue_summary(self.warning_count(), self.error_count())
        )
    }
}

impl std::fmt::Display for CaseDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Case: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.add_warning("structure", "no branches");
        diag.add_error("structure", "no buses");

        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.error_count(), 1);
        assert!(diag.has_issues());
        assert!(diag.has_errors());
    }

    #[test]
    fn test_diagnostic_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Warning, "coerce", "bad value")
            .with_entity("Generator_node_2_seg1")
            .with_line(3);

        let display = format!("{}", issue);
        assert_eq!(
            display,
            "[warning:coerce] bad value (Generator_node_2_seg1) at line 3"
        );
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");

        diag.add_warning("structure", "warning");
        assert_eq!(diag.summary(), "1 warning");

        diag.add_error("structure", "error");
        assert_eq!(diag.summary(), "1 warning, 1 error");

        diag.add_warning("structure", "another warning");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
    }

    #[test]
    fn test_case_diagnostics_counters() {
        let mut diag = CaseDiagnostics::new();
        diag.stats.buses = 3;
        diag.stats.loads = 2;

        diag.record_coerced("generators.csv", 4, "Pmin (MW)", "n/a", 0.0);
        diag.record_skipped();

        assert_eq!(diag.stats.coerced_cells, 1);
        assert_eq!(diag.stats.skipped_rows, 1);
        assert_eq!(diag.warning_count(), 1);
        assert_eq!(diag.issues[0].line, Some(4));
        assert!(diag.issues[0].message.contains("'n/a'"));

        let summary = diag.summary();
        assert!(summary.contains("3 buses"));
        assert!(summary.contains("1 warning"));
    }

    #[test]
    fn test_case_diagnostics_serialization() {
        let mut diag = CaseDiagnostics::new();
        diag.stats.branches = 2;
        let mut structural = Diagnostics::new();
        structural.add_warning_with_entity("structure", "isolated", "Bus_node_3");
        diag.merge(structural);

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"branches\": 2"));
        assert!(json.contains("\"entity\": \"Bus_node_3\""));
    }
}
