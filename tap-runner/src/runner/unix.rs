// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::test_command::{ChildFds, ChildOutputMut};
use libc::{SIGKILL, SIGTERM};
use std::{os::unix::process::CommandExt, time::Duration};
use tokio::process::Child;

/// Puts the child in its own process group, so that terminating it also
/// reaches any processes it spawned.
pub(super) fn set_process_group(cmd: &mut std::process::Command) {
    cmd.process_group(0);
}

/// Terminates the child's process group and reaps the child.
///
/// `pid` is the child's pid as recorded at spawn time, which is also its
/// process group. The group is signalled even if the child itself has
/// already been reaped, since processes it spawned may still be running.
///
/// SIGTERM is sent first. If the child hasn't exited and closed its output
/// after `grace_period`, the group is sent SIGKILL. A zero grace period goes
/// straight to SIGKILL.
pub(super) async fn terminate_child(
    child: &mut Child,
    pid: Option<u32>,
    fds: &mut ChildFds,
    output: &mut ChildOutputMut,
    grace_period: Duration,
) {
    let Some(pid) = pid else {
        // Not expected after a successful spawn.
        let _ = child.start_kill();
        let _ = child.wait().await;
        return;
    };
    let pgid = -(pid as i32);

    if !grace_period.is_zero() {
        unsafe { libc::kill(pgid, SIGTERM) };

        let mut exited = false;
        let mut sleep = std::pin::pin!(tokio::time::sleep(grace_period));
        loop {
            // The output pipes close once every process holding them, including
            // the child's descendants, has exited.
            if exited && fds.is_done() {
                return;
            }
            tokio::select! {
                // Keep draining so nothing blocks on a full pipe while shutting
                // down. Read errors no longer matter here.
                _ = fds.fill_buf(output), if !fds.is_done() => {}
                _ = child.wait(), if !exited => exited = true,
                () = &mut sleep => break,
            }
        }
        tracing::debug!(pid, ?grace_period, "test program did not exit after SIGTERM");
    }

    unsafe { libc::kill(pgid, SIGKILL) };
    let _ = child.wait().await;
}
