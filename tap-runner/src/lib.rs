// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Run a test program, read its [TAP](https://testanything.org/) output, and
//! turn the results into an ordered list of [`Diagnostic`](diagnostic::Diagnostic)s.
//!
//! The flow of a single evaluation is:
//!
//! 1. A [`ProcessRunner`](runner::ProcessRunner) runs the program described
//!    by a [`TestProgramSpec`](program::TestProgramSpec), capturing stdout
//!    and stderr separately.
//! 2. On success, stdout is parsed as a [`TestReport`](tap::TestReport).
//! 3. [`DiagnosticMapper`](mapper::DiagnosticMapper) folds the process
//!    outcome and the report into diagnostics.
//!
//! Nothing here prints or persists the diagnostics. That is left to callers
//! such as `tap-check`.

pub mod diagnostic;
pub mod env;
pub mod errors;
pub mod mapper;
pub mod program;
pub mod runner;
pub mod tap;
mod test_command;
