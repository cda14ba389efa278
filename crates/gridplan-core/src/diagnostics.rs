//! Diagnostics collected while checking instances and solutions.
//!
//! Evaluation never prints. Anything a caller may want to show a user
//! (violated feasibility checks, suspicious instance topology) is collected
//! into a [`Diagnostics`] value so the caller decides whether to display,
//! log or discard it.
//!
//! - Severity levels (Warning, Error)
//! - Categories for grouping issues (routing, conservation, reliability, ...)
//! - Optional entity references (e.g., "Site#3", "Link#12")
//!
//! # Example
//!
//! ```
//! use gridplan_core::diagnostics::{DiagnosticIssue, Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("topology", "Site is not touched by any link", "Site#4");
//! diag.add(
//!     DiagnosticIssue::new(Severity::Error, "reliability", "Failure probability above threshold")
//!         .with_entity("Site#1"),
//! );
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but not invalid
    Warning,
    /// A check failed
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g., "routing", "coverage", "topology")
    pub category: String,
    /// Human-readable description of the issue
    pub message: String,
    /// Optional entity reference (e.g., "Site#3")
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
            entity: None,
        }
    }

    /// Add entity reference to the issue
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

/// Ordered collection of diagnostic issues
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw issue directly
    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
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

    /// Get issues filtered by category
    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Get issues naming a given entity
    pub fn issues_for_entity<'a>(
        &'a self,
        entity: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues
            .iter()
            .filter(move |i| i.entity.as_deref() == Some(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(category: &str, message: &str, entity: &str) -> DiagnosticIssue {
        DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity)
    }

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.add_warning_with_entity("topology", "isolated demand node", "Demand#3");
        diag.add(error("coverage", "demand not routed", "Demand#1"));
        diag.add_warning_with_entity("topology", "untouched site", "Site#2");

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.add(error("reliability", "probability above threshold", "Site#1"));

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"entity\": \"Site#1\""));
    }

    #[test]
    fn test_filters() {
        let mut diag = Diagnostics::new();
        diag.add_warning_with_entity("topology", "untouched site", "Site#2");
        diag.add(error("reliability", "too risky", "Site#2"));
        diag.add(error("coverage", "unrouted demand", "Demand#1"));

        assert_eq!(diag.issues_by_category("topology").count(), 1);
        assert_eq!(diag.issues_for_entity("Site#2").count(), 2);
        assert_eq!(diag.issues_for_entity("Demand#4").count(), 0);
    }
}
