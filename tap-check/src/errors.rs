// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use tap_runner::errors::ProgramSpecError;
use thiserror::Error;

use crate::output::StderrStyles;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// Documented exit codes for `tap-check` runs.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum TapCheckExitCode {}

impl TapCheckExitCode {
    /// The program ran, and no error diagnostics were produced.
    pub const OK: i32 = 0;

    /// At least one error diagnostic was produced, or a warning was produced
    /// with `--deny-warnings`.
    pub const DIAGNOSTICS_FOUND: i32 = 100;

    /// The program to run couldn't be determined from the arguments and
    /// configuration.
    pub const SETUP_ERROR: i32 = 96;

    /// Writing diagnostics to the output failed.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that prevented `tap-check` from evaluating the test program.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("failed to read config file")]
    ConfigReadError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to parse config file")]
    ConfigParseError {
        path: Utf8PathBuf,
        #[source]
        err: toml::de::Error,
    },
    #[error("no test program specified")]
    NoProgram,
    #[error("invalid test program")]
    InvalidProgram {
        #[from]
        err: ProgramSpecError,
    },
    #[error("failed to build async runtime")]
    RuntimeBuildError {
        #[source]
        err: std::io::Error,
    },
    #[error("failed to write output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn config_read_error(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::ConfigReadError {
            path: path.into(),
            err,
        }
    }

    pub(crate) fn config_parse_error(path: impl Into<Utf8PathBuf>, err: toml::de::Error) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigReadError { .. }
            | Self::ConfigParseError { .. }
            | Self::NoProgram
            | Self::InvalidProgram { .. }
            | Self::RuntimeBuildError { .. } => TapCheckExitCode::SETUP_ERROR,
            Self::WriteOutputError { .. } => TapCheckExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::ConfigReadError { path, err } => {
                log::error!("failed to read config file at {}", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::ConfigParseError { path, err } => {
                log::error!("failed to parse config file at {}", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::NoProgram => {
                log::error!(
                    "no test program specified: pass it after `{}`, or set `{}` in a config file",
                    "--".style(styles.bold),
                    "program".style(styles.bold),
                );
                None
            }
            Self::InvalidProgram { err } => {
                log::error!("invalid test program");
                Some(err as &dyn Error)
            }
            Self::RuntimeBuildError { err } => {
                log::error!("failed to build async runtime");
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { err } => {
                log::error!("failed to write output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            log::error!("  caused by: {err}");
            next_error = err.source();
        }
    }
}
