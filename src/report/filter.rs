use ahash::AHashSet;

use crate::report::{Confidence, ErrorKey, LogReport, Severity};

/// Determines whether a given report should be printed.
#[derive(Debug)]
pub struct ReportFilter {
    /// Minimum severity to log
    pub min_severity: Severity,
    /// Minimum confidence to log
    pub min_confidence: Confidence,
    /// Keys that are never logged
    pub ignored: AHashSet<ErrorKey>,
}

impl Default for ReportFilter {
    fn default() -> Self {
        ReportFilter {
            min_severity: Severity::Untidy,
            min_confidence: Confidence::Weak,
            ignored: AHashSet::default(),
        }
    }
}

impl ReportFilter {
    /// Returns true iff the report should be printed.
    pub fn should_print_report(&self, report: &LogReport) -> bool {
        self.should_print(report.severity, report.confidence, report.key)
    }

    pub fn should_print(&self, severity: Severity, confidence: Confidence, key: ErrorKey) -> bool {
        if key == ErrorKey::Config {
            // Config problems undermine the whole run. They must always be printed.
            return true;
        }
        severity >= self.min_severity
            && confidence >= self.min_confidence
            && !self.ignored.contains(&key)
    }
}
