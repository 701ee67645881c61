// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::test_command::{ChildFds, ChildOutputMut};
use std::time::Duration;
use tokio::process::Child;

pub(super) fn set_process_group(_cmd: &mut std::process::Command) {}

/// Kills the child and reaps it.
///
/// There is no graceful termination signal on Windows, so the grace period is
/// not used.
pub(super) async fn terminate_child(
    child: &mut Child,
    _pid: Option<u32>,
    _fds: &mut ChildFds,
    _output: &mut ChildOutputMut,
    _grace_period: Duration,
) {
    let _ = child.start_kill();
    let _ = child.wait().await;
}
