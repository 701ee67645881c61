// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning a test program run into diagnostics.
//!
//! The order of the returned diagnostics is fixed:
//!
//! 1. If the program failed to run, or its output isn't a valid report, a
//!    single [`ProgramFailed`](DiagnosticSummary::ProgramFailed) error and
//!    nothing else.
//! 2. Otherwise, one diagnostic per reportable test, in report order.
//! 3. Then, if the program wrote anything to stderr, a trailing
//!    [`StrayStderr`](DiagnosticSummary::StrayStderr) error.

use crate::{
    diagnostic::{Diagnostic, DiagnosticSummary},
    program::TestProgramSpec,
    runner::{LocalRunner, ProcessOutcome, ProcessRunner},
    tap::{TestOutcome, TestReport, TestResult},
};
use swrite::{SWrite, swrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Runs test programs and maps their results to [`Diagnostic`]s.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticMapper<R = LocalRunner> {
    runner: R,
}

impl DiagnosticMapper<LocalRunner> {
    /// Creates a new mapper that runs programs as local child processes, with
    /// the default grace period.
    pub fn local() -> Self {
        Self::new(LocalRunner::new())
    }
}

impl<R: ProcessRunner> DiagnosticMapper<R> {
    /// Creates a new mapper that runs programs with `runner`.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Returns the runner.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runs the program described by `spec` and returns the diagnostics for
    /// the run.
    ///
    /// Every failure, including cancellation, is reported as a diagnostic.
    #[instrument(level = "debug", skip_all, fields(program = spec.executable()))]
    pub async fn evaluate(
        &self,
        spec: &TestProgramSpec,
        cancel: &CancellationToken,
    ) -> Vec<Diagnostic> {
        let outcome = self.runner.run(spec, cancel).await;
        let diagnostics = map_outcome(&outcome);
        debug!(count = diagnostics.len(), "mapped test program outcome");
        diagnostics
    }
}

/// Maps a finished run to diagnostics.
///
/// This is a pure function of `outcome`: the same outcome always produces the
/// same diagnostics.
pub fn map_outcome(outcome: &ProcessOutcome) -> Vec<Diagnostic> {
    let stderr = outcome.stderr_lossy();

    if let Some(error) = &outcome.execution_error {
        let mut detail = format!("Error running test program: {error}.");
        push_stderr(&mut detail, &stderr);
        return vec![Diagnostic::new(DiagnosticSummary::ProgramFailed, detail)];
    }

    let report = match TestReport::parse(&outcome.stdout_lossy()) {
        Ok(report) => report,
        Err(error) => {
            debug!(%error, "test program output is not a valid report");
            let mut detail = format!("Error during test program: {error}.");
            push_stderr(&mut detail, &stderr);
            return vec![Diagnostic::new(DiagnosticSummary::ProgramFailed, detail)];
        }
    };

    let mut diagnostics: Vec<_> = report.tests.iter().filter_map(map_test).collect();
    if !stderr.is_empty() {
        diagnostics.push(Diagnostic::new(
            DiagnosticSummary::StrayStderr,
            render_stderr(&stderr),
        ));
    }
    diagnostics
}

fn map_test(test: &TestResult) -> Option<Diagnostic> {
    match (test.outcome, test.is_expected_failure()) {
        (TestOutcome::Fail, false) => {
            let mut detail = format!("Test failed: {}.", test.display_name());
            push_test_diagnostics(&mut detail, &test.diagnostics);
            Some(Diagnostic::new(DiagnosticSummary::TestFailure, detail))
        }
        (TestOutcome::Pass, true) => {
            let mut detail = format!(
                "Bonus test pass: {}.\n\n\
                 This test is marked as a TODO test, but yet it passed. \
                 Consider removing the TODO directive from this test.",
                test.display_name(),
            );
            push_test_diagnostics(&mut detail, &test.diagnostics);
            Some(Diagnostic::new(DiagnosticSummary::UnexpectedPass, detail))
        }
        (TestOutcome::Pass, false) | (TestOutcome::Fail, true) => None,
    }
}

fn push_test_diagnostics(detail: &mut String, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    detail.push_str("\n\nDiagnostic output from test:\n");
    for line in lines {
        swrite!(detail, "  {line}\n");
    }
}

fn push_stderr(detail: &mut String, stderr: &str) {
    if !stderr.is_empty() {
        detail.push_str("\n\n");
        detail.push_str(&render_stderr(stderr));
    }
}

fn render_stderr(stderr: &str) -> String {
    let mut out = String::from("The test program produced the following error messages:\n");
    out.push_str(&stderr.replace('\n', "\n  "));
    out
}
