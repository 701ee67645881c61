// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, WrapErr};
use tap_runner::{env::EnvironmentMap, program::TestProgramSpec};

/// A test program written to a temporary directory.
pub(crate) struct ScriptFixture {
    // Held so the script outlives the run.
    _dir: Utf8TempDir,
    pub(crate) spec: TestProgramSpec,
}

impl ScriptFixture {
    /// Writes `body` to a script run with `sh`.
    pub(crate) fn new(body: &str) -> Result<Self> {
        Self::with_env(body, EnvironmentMap::new())
    }

    pub(crate) fn with_env(body: &str, environment: EnvironmentMap) -> Result<Self> {
        let dir = camino_tempfile::tempdir().wrap_err("failed to create temp dir")?;
        let path = dir.path().join("tests.sh");
        std::fs::write(&path, body).wrap_err_with(|| format!("failed to write {path}"))?;

        let spec = TestProgramSpec::new(["sh", path.as_str()], environment)?;
        Ok(Self { _dir: dir, spec })
    }
}
