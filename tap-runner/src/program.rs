// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The description of a test program to run.

use crate::{env::EnvironmentMap, errors::ProgramSpecError};
use serde::Deserialize;

/// A test program: the executable, its arguments and environment overrides.
///
/// The program list is guaranteed to be non-empty. This is checked by
/// [`TestProgramSpec::new`] and during deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTestProgramSpec")]
pub struct TestProgramSpec {
    program: Vec<String>,
    environment: EnvironmentMap,
}

impl TestProgramSpec {
    /// Creates a new `TestProgramSpec`.
    ///
    /// `program` is the executable followed by its arguments.
    pub fn new(
        program: impl IntoIterator<Item = impl Into<String>>,
        environment: EnvironmentMap,
    ) -> Result<Self, ProgramSpecError> {
        let program: Vec<String> = program.into_iter().map(Into::into).collect();
        if program.is_empty() {
            return Err(ProgramSpecError::EmptyProgram);
        }
        Ok(Self {
            program,
            environment,
        })
    }

    /// Returns the executable to run.
    pub fn executable(&self) -> &str {
        // The constructor guarantees at least one element.
        &self.program[0]
    }

    /// Returns the arguments passed to the executable.
    pub fn args(&self) -> &[String] {
        &self.program[1..]
    }

    /// Returns the full program list, executable first.
    pub fn program(&self) -> &[String] {
        &self.program
    }

    /// Returns the environment overrides.
    pub fn environment(&self) -> &EnvironmentMap {
        &self.environment
    }

    /// Returns a mutable reference to the environment overrides.
    pub fn environment_mut(&mut self) -> &mut EnvironmentMap {
        &mut self.environment
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTestProgramSpec {
    program: Vec<String>,
    #[serde(default)]
    environment: EnvironmentMap,
}

impl TryFrom<RawTestProgramSpec> for TestProgramSpec {
    type Error = ProgramSpecError;

    fn try_from(raw: RawTestProgramSpec) -> Result<Self, Self::Error> {
        Self::new(raw.program, raw.environment)
    }
}
