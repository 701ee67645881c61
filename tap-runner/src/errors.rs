// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by tap-runner.

use std::{fmt, process::ExitStatus, sync::Arc};
use thiserror::Error;

/// An error that occurs while constructing a
/// [`TestProgramSpec`](crate::program::TestProgramSpec).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgramSpecError {
    /// The program list was empty.
    #[error("program must have at least one element to specify the executable to run")]
    EmptyProgram,
}

/// The standard stream a read error occurred on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    /// Standard output.
    Stdout,

    /// Standard error.
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// An error that occurred while running the test program.
///
/// Stored in [`ProcessOutcome::execution_error`](crate::runner::ProcessOutcome::execution_error).
/// A zero exit status never produces one of these, regardless of the test
/// results the program reported.
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// The program could not be located or started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// The executable that was being started.
        program: String,

        /// The underlying error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The program exited with a non-zero status or was killed by a signal.
    #[error("program exited unsuccessfully ({status})")]
    Exited {
        /// The exit status.
        status: ExitStatus,
    },

    /// Execution was cancelled, and the program was terminated.
    #[error("execution was cancelled")]
    Cancelled,

    /// Waiting for the program to exit failed.
    #[error("failed to wait for program to exit: {source}")]
    Wait {
        /// The underlying error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Reading one of the program's output streams failed.
    #[error("failed to read {stream} of program: {source}")]
    ReadOutput {
        /// The stream that failed.
        stream: OutputStream,

        /// The underlying error.
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl ExecutionError {
    /// Returns true if this error was caused by cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// An error returned when a test program's standard output cannot be read as
/// a TAP report.
///
/// A `Bail out!` directive is also reported through this type, since it
/// equally prevents a report from being produced.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub struct MalformedReportError {
    line: Option<usize>,
    kind: MalformedReportKind,
}

impl MalformedReportError {
    pub(crate) fn new(line: Option<usize>, kind: MalformedReportKind) -> Self {
        Self { line, kind }
    }

    /// Returns the 1-based line number the error was detected on, if it is
    /// attributable to a single line.
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// Returns the kind of error.
    pub fn kind(&self) -> &MalformedReportKind {
        &self.kind
    }
}

impl fmt::Display for MalformedReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "malformed TAP report at line {line}: {}", self.kind),
            None => write!(f, "malformed TAP report: {}", self.kind),
        }
    }
}

/// The kind of [`MalformedReportError`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MalformedReportKind {
    /// The stream contained neither a plan nor any test lines.
    #[error("no test results found")]
    NoResults,

    /// A non-empty plan was declared, but no tests were reported.
    #[error("planned {planned} tests, but none were reported")]
    PlannedButEmpty {
        /// The number of planned tests.
        planned: u64,
    },

    /// A `1..0` plan skipped every test, so there are no results.
    #[error("test program skipped all tests{}", DisplayReason(.reason.as_deref()))]
    SkippedAll {
        /// The text after `#` on the plan line, if any.
        reason: Option<String>,
    },

    /// The version line named an unsupported version.
    #[error("unsupported TAP version `{version}`")]
    InvalidVersion {
        /// The version text as found.
        version: String,
    },

    /// A version line appeared after other significant lines.
    #[error("TAP version line must be the first line")]
    VersionNotFirst,

    /// A line started like a plan but could not be parsed as one.
    #[error("invalid plan `{text}`")]
    InvalidPlan {
        /// The plan text as found.
        text: String,
    },

    /// More than one plan was found.
    #[error("more than one plan found")]
    DuplicatePlan,

    /// A plan was found between test lines.
    #[error("plan must appear before the first test or after the last test")]
    PlanNotAtEnds,

    /// A test line used the number 0.
    #[error("test numbers must start at 1")]
    ZeroTestNumber,

    /// A test number was not greater than the previous one.
    #[error("test number {number} is not greater than the previous test number {previous}")]
    NonIncreasingNumber {
        /// The number of this test.
        number: u64,

        /// The number of the previous test.
        previous: u64,
    },

    /// A test number was larger than the plan allows.
    #[error("test number {number} is out of the planned range 1..{planned}")]
    NumberExceedsPlan {
        /// The number of this test.
        number: u64,

        /// The number of planned tests.
        planned: u64,
    },

    /// A YAML diagnostic block was not closed before the end of input.
    #[error("YAML diagnostic block starting at line {start} was never closed")]
    UnterminatedYaml {
        /// The line the block started on.
        start: usize,
    },

    /// The test program gave up with `Bail out!`.
    #[error("test program bailed out{}", DisplayReason(.reason.as_deref()))]
    BailOut {
        /// The reason given, if any.
        reason: Option<String>,
    },
}

struct DisplayReason<'a>(Option<&'a str>);

impl fmt::Display for DisplayReason<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(reason) => write!(f, ": {reason}"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_report_display() {
        let err = MalformedReportError::new(
            Some(3),
            MalformedReportKind::NonIncreasingNumber {
                number: 2,
                previous: 2,
            },
        );
        assert_eq!(
            err.to_string(),
            "malformed TAP report at line 3: test number 2 is not greater than the previous test number 2"
        );

        let err = MalformedReportError::new(None, MalformedReportKind::NoResults);
        assert_eq!(err.to_string(), "malformed TAP report: no test results found");
    }

    #[test]
    fn bail_out_display() {
        let kind = MalformedReportKind::BailOut {
            reason: Some("database down".to_owned()),
        };
        assert_eq!(kind.to_string(), "test program bailed out: database down");

        let kind = MalformedReportKind::BailOut { reason: None };
        assert_eq!(kind.to_string(), "test program bailed out");
    }
}
