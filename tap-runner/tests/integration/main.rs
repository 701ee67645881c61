// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

// These tests run real `sh` scripts.
#![cfg(unix)]

mod fixtures;
mod scenarios;
