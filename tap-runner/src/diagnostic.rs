// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostics produced from a test program run.

use serde::Serialize;
use std::fmt;

/// How serious a [`Diagnostic`] is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Something went wrong.
    Error,

    /// Something is worth looking at, but isn't a failure.
    Warning,
}

impl Severity {
    /// Returns the lowercase name of this severity.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed category of a [`Diagnostic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticSummary {
    /// The program couldn't be run to completion, or its output couldn't be
    /// read as a report.
    ProgramFailed,

    /// A test failed.
    TestFailure,

    /// A test marked TODO passed.
    UnexpectedPass,

    /// The program wrote to stderr during an otherwise successful run.
    StrayStderr,
}

impl DiagnosticSummary {
    /// Returns the summary text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProgramFailed => "Test program failed",
            Self::TestFailure => "Test failure",
            Self::UnexpectedPass => "Test passed unexpectedly",
            Self::StrayStderr => "Error messages from test program",
        }
    }

    /// Returns the severity that diagnostics with this summary carry.
    pub fn severity(self) -> Severity {
        match self {
            Self::UnexpectedPass => Severity::Warning,
            Self::ProgramFailed | Self::TestFailure | Self::StrayStderr => Severity::Error,
        }
    }
}

impl fmt::Display for DiagnosticSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DiagnosticSummary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A single message about a test program run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// The severity.
    pub severity: Severity,

    /// A short, fixed description of what kind of problem this is.
    pub summary: DiagnosticSummary,

    /// The full message. May span multiple lines.
    pub detail: String,
}

impl Diagnostic {
    /// Creates a new diagnostic, with the severity implied by `summary`.
    pub fn new(summary: DiagnosticSummary, detail: impl Into<String>) -> Self {
        Self {
            severity: summary.severity(),
            summary,
            detail: detail.into(),
        }
    }

    /// Returns true if this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.summary, self.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(DiagnosticSummary::ProgramFailed, "Test program failed", Severity::Error ; "program failed")]
    #[test_case(DiagnosticSummary::TestFailure, "Test failure", Severity::Error ; "test failure")]
    #[test_case(DiagnosticSummary::UnexpectedPass, "Test passed unexpectedly", Severity::Warning ; "unexpected pass")]
    #[test_case(DiagnosticSummary::StrayStderr, "Error messages from test program", Severity::Error ; "stray stderr")]
    fn summary_text_and_severity(summary: DiagnosticSummary, text: &str, severity: Severity) {
        assert_eq!(summary.as_str(), text);
        assert_eq!(summary.severity(), severity);
    }

    #[test]
    fn serializes_summary_as_text() {
        let diagnostic = Diagnostic::new(DiagnosticSummary::UnexpectedPass, "Bonus test pass: x.");
        let json = serde_json::to_value(&diagnostic).expect("serializes");
        assert_eq!(
            json,
            serde_json::json!({
                "severity": "warning",
                "summary": "Test passed unexpectedly",
                "detail": "Bonus test pass: x.",
            })
        );
    }
}
