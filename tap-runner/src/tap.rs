// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading [TAP](https://testanything.org/) reports.
//!
//! A [`TestReport`] is read from the complete standard output of a test
//! program with [`TestReport::parse`]. Versions 12, 13 and 14 of the protocol
//! are understood, except for subtests: indented subtest output is ignored,
//! and the parent's summary line is what gets recorded.

mod line;
mod parse;

use crate::errors::MalformedReportError;
use serde::Serialize;
use std::{borrow::Cow, fmt};

/// A parsed TAP report.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TestReport {
    /// The version declared by a `TAP version` line, if any.
    pub version: Option<u32>,

    /// The plan, if one was found.
    pub plan: Option<TestPlan>,

    /// Test results in the order they were reported.
    pub tests: Vec<TestResult>,

    /// Comment lines that appeared before the first test.
    pub preamble: Vec<String>,
}

impl TestReport {
    /// Parses a TAP stream.
    ///
    /// Lines that aren't part of the protocol are ignored, but a stream
    /// without a single test line is an error. This includes a `1..0` plan
    /// that skips everything.
    pub fn parse(input: &str) -> Result<Self, MalformedReportError> {
        parse::parse(input)
    }

    /// Returns the number of tests that failed and were not marked TODO.
    pub fn failed_count(&self) -> usize {
        self.tests
            .iter()
            .filter(|test| test.outcome == TestOutcome::Fail && !test.is_expected_failure())
            .count()
    }
}

/// The `1..N` line of a report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestPlan {
    /// The number of tests planned.
    pub count: u64,

    /// The text after `#` on the plan line.
    pub reason: Option<String>,
}

/// The result of a single test.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TestResult {
    /// The test number. If the line omitted it, this is one more than the
    /// previous test's number.
    pub number: u64,

    /// The test's description, if any.
    pub name: Option<String>,

    /// Whether the test passed.
    pub outcome: TestOutcome,

    /// A `TODO` or `SKIP` directive on the test line.
    pub directive: Option<Directive>,

    /// Diagnostic lines following the test line, in order.
    pub diagnostics: Vec<String>,
}

impl TestResult {
    /// Returns true if the test is marked as expected to fail (`# TODO`).
    pub fn is_expected_failure(&self) -> bool {
        matches!(self.directive, Some(Directive::Todo { .. }))
    }

    /// Returns the test's name, or `anonymous test #N` if it has none.
    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.name {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("anonymous test #{}", self.number)),
        }
    }
}

/// Whether a test passed or failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestOutcome {
    /// `ok`
    Pass,

    /// `not ok`
    Fail,
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "ok"),
            Self::Fail => write!(f, "not ok"),
        }
    }
}

/// A directive attached to a test line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Directive {
    /// The test is known to fail. A failure is not an error, and a pass is a
    /// bonus.
    Todo {
        /// The text following `TODO`.
        reason: Option<String>,
    },

    /// The test was not run.
    Skip {
        /// The text following `SKIP`.
        reason: Option<String>,
    },
}
