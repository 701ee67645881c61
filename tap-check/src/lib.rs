// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run a test program that produces [TAP](https://testanything.org/) output,
//! and report its failures as diagnostics.
//!
//! This crate is the command-line front end for
//! [tap-runner](https://crates.io/crates/tap-runner). Its library form exists
//! only to share code with the binary, and is not a stable API.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod reporter;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
