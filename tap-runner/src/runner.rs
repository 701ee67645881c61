// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running the test program.
//!
//! [`LocalRunner`] starts the program as a child process, collects its
//! stdout and stderr into separate buffers, and waits for it to exit. The
//! wait can be interrupted at any point through a [`CancellationToken`]; the
//! child is always terminated and reaped before a cancelled outcome is
//! returned.
//!
//! There is no internal timeout. Callers that need one should cancel the
//! token when it expires.

use crate::{
    errors::ExecutionError,
    program::TestProgramSpec,
    test_command::{ChildFds, ChildOutputMut, make_command},
};
use bytes::Bytes;
use std::{borrow::Cow, process::ExitStatus, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        use unix as os;
    } else if #[cfg(windows)] {
        mod windows;
        use windows as os;
    } else {
        compile_error!("unsupported target platform");
    }
}

/// Runs a test program to completion.
///
/// [`DiagnosticMapper`](crate::mapper::DiagnosticMapper) is generic over this
/// trait, so that its policy can be exercised without real processes.
pub trait ProcessRunner {
    /// Runs the program described by `spec`.
    ///
    /// Failures are reported through [`ProcessOutcome::execution_error`],
    /// never as a panic or a separate error path.
    fn run(
        &self,
        spec: &TestProgramSpec,
        cancel: &CancellationToken,
    ) -> impl Future<Output = ProcessOutcome> + Send;
}

/// The result of running a test program once.
#[derive(Clone, Debug)]
pub struct ProcessOutcome {
    /// Everything the program wrote to stdout.
    pub stdout: Bytes,

    /// Everything the program wrote to stderr.
    pub stderr: Bytes,

    /// Set if the program couldn't be started, exited unsuccessfully, or was
    /// cancelled.
    ///
    /// A zero exit status leaves this unset, no matter what the program
    /// reported on stdout.
    pub execution_error: Option<ExecutionError>,
}

impl ProcessOutcome {
    /// Creates an outcome for a program that exited successfully.
    pub fn success(stdout: impl Into<Bytes>, stderr: impl Into<Bytes>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            execution_error: None,
        }
    }

    /// Creates an outcome for a program that failed with `error`.
    pub fn failure(
        stdout: impl Into<Bytes>,
        stderr: impl Into<Bytes>,
        error: ExecutionError,
    ) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            execution_error: Some(error),
        }
    }

    /// Returns true if there is no execution error.
    pub fn is_success(&self) -> bool {
        self.execution_error.is_none()
    }

    /// Returns stdout as a lossy UTF-8 string.
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Returns stderr as a lossy UTF-8 string.
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

/// Runs test programs as local child processes.
#[derive(Clone, Debug)]
pub struct LocalRunner {
    grace_period: Duration,
}

impl LocalRunner {
    /// The default time a cancelled program gets to exit after SIGTERM.
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

    /// Creates a new `LocalRunner` with the default grace period.
    pub fn new() -> Self {
        Self {
            grace_period: Self::DEFAULT_GRACE_PERIOD,
        }
    }

    /// Sets how long a cancelled program gets to exit on its own before it is
    /// killed.
    ///
    /// Only used on Unix.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Returns the grace period.
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    async fn run_child(
        &self,
        spec: &TestProgramSpec,
        cancel: &CancellationToken,
        output: &mut ChildOutputMut,
    ) -> Result<ExitStatus, ExecutionError> {
        if cancel.is_cancelled() {
            debug!("cancelled before the test program was started");
            return Err(ExecutionError::Cancelled);
        }

        let mut cmd = make_command(spec);
        os::set_process_group(&mut cmd);
        let mut cmd = tokio::process::Command::from(cmd);
        // Only relevant if this future is dropped midway.
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|error| ExecutionError::Spawn {
            program: spec.executable().to_owned(),
            source: Arc::new(error),
        })?;
        // Recorded now, since the id is gone once the child has been reaped,
        // but its process group may outlive it.
        let child_pid = child.id();
        debug!(pid = child_pid, "started test program");

        let mut fds = ChildFds::new(child.stdout.take(), child.stderr.take());
        let mut exit_status = None;

        // Wait for both the exit and EOF on both streams. Output written just
        // before exit may still be in the pipes after wait returns.
        loop {
            if fds.is_done() {
                if let Some(status) = exit_status {
                    break Ok(status);
                }
            }

            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    debug!("cancellation requested, terminating test program");
                    os::terminate_child(&mut child, child_pid, &mut fds, output, self.grace_period)
                        .await;
                    break Err(ExecutionError::Cancelled);
                }
                res = child.wait(), if exit_status.is_none() => match res {
                    Ok(status) => {
                        debug!(%status, "test program exited");
                        exit_status = Some(status);
                    }
                    Err(error) => {
                        os::terminate_child(&mut child, child_pid, &mut fds, output, Duration::ZERO)
                            .await;
                        break Err(ExecutionError::Wait {
                            source: Arc::new(error),
                        });
                    }
                },
                res = fds.fill_buf(output), if !fds.is_done() => {
                    if let Err(error) = res {
                        os::terminate_child(&mut child, child_pid, &mut fds, output, Duration::ZERO)
                            .await;
                        break Err(error);
                    }
                }
            }
        }
    }
}

impl Default for LocalRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for LocalRunner {
    #[instrument(level = "debug", skip_all, fields(program = spec.executable()))]
    async fn run(&self, spec: &TestProgramSpec, cancel: &CancellationToken) -> ProcessOutcome {
        let mut output = ChildOutputMut::default();
        let execution_error = match self.run_child(spec, cancel, &mut output).await {
            Ok(status) if status.success() => None,
            Ok(status) => Some(ExecutionError::Exited { status }),
            Err(error) => Some(error),
        };
        if let Some(error) = &execution_error {
            debug!(%error, "test program did not complete successfully");
        }

        let (stdout, stderr) = output.freeze();
        ProcessOutcome {
            stdout,
            stderr,
            execution_error,
        }
    }
}
