// Copyright (c) The tap-runner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building the test program's command and collecting its output.

use crate::{
    errors::{ExecutionError, OutputStream},
    program::TestProgramSpec,
};
use bytes::{Bytes, BytesMut};
use std::{io, process::Stdio, sync::Arc};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{ChildStderr, ChildStdout},
};

/// The size of each buffered reader's buffer, and the initial capacity of the
/// output buffers.
///
/// This is the (normal) page size on most systems.
const CHUNK_SIZE: usize = 4 * 1024;

/// Builds the command for a test program.
///
/// The command inherits the current environment with the program's overrides
/// applied on top. stdin is closed and both output streams are piped.
pub(crate) fn make_command(spec: &TestProgramSpec) -> std::process::Command {
    let mut cmd = std::process::Command::new(spec.executable());
    cmd.args(spec.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    spec.environment().apply_env(&mut cmd);
    cmd
}

/// A `BufReader` over an `AsyncRead` that tracks whether it has hit EOF.
pub(crate) struct FusedBufReader<R> {
    reader: BufReader<R>,
    done: bool,
}

impl<R: AsyncRead + Unpin> FusedBufReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(CHUNK_SIZE, reader),
            done: false,
        }
    }

    pub(crate) async fn fill_buf(&mut self, acc: &mut BytesMut) -> Result<(), io::Error> {
        if self.done {
            return Ok(());
        }

        match self.reader.fill_buf().await {
            Ok(buf) => {
                acc.extend_from_slice(buf);
                if buf.is_empty() {
                    self.done = true;
                }
                let len = buf.len();
                self.reader.consume(len);
                Ok(())
            }
            Err(error) => {
                self.done = true;
                Err(error)
            }
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }
}

async fn fill_buf_opt<R: AsyncRead + Unpin>(
    reader: Option<&mut FusedBufReader<R>>,
    acc: &mut BytesMut,
) -> Result<(), io::Error> {
    match reader {
        Some(reader) => reader.fill_buf(acc).await,
        None => Ok(()),
    }
}

fn is_done_opt<R: AsyncRead + Unpin>(reader: &Option<FusedBufReader<R>>) -> bool {
    reader.as_ref().is_none_or(|r| r.is_done())
}

/// The child's stdout and stderr pipes.
pub(crate) struct ChildFds {
    stdout: Option<FusedBufReader<ChildStdout>>,
    stderr: Option<FusedBufReader<ChildStderr>>,
}

impl ChildFds {
    pub(crate) fn new(stdout: Option<ChildStdout>, stderr: Option<ChildStderr>) -> Self {
        Self {
            stdout: stdout.map(FusedBufReader::new),
            stderr: stderr.map(FusedBufReader::new),
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        is_done_opt(&self.stdout) && is_done_opt(&self.stderr)
    }

    /// Reads whatever is available on either stream into `acc`.
    ///
    /// This is cancel-safe, since [`AsyncBufReadExt::fill_buf`] is.
    pub(crate) async fn fill_buf(&mut self, acc: &mut ChildOutputMut) -> Result<(), ExecutionError> {
        let ChildOutputMut { stdout, stderr } = acc;
        tokio::select! {
            res = fill_buf_opt(self.stdout.as_mut(), stdout), if !is_done_opt(&self.stdout) => {
                res.map_err(|error| read_error(OutputStream::Stdout, error))
            }
            res = fill_buf_opt(self.stderr.as_mut(), stderr), if !is_done_opt(&self.stderr) => {
                res.map_err(|error| read_error(OutputStream::Stderr, error))
            }
            else => Ok(()),
        }
    }
}

fn read_error(stream: OutputStream, error: io::Error) -> ExecutionError {
    ExecutionError::ReadOutput {
        stream,
        source: Arc::new(error),
    }
}

/// Output collected so far. The two streams are never interleaved.
#[derive(Debug)]
pub(crate) struct ChildOutputMut {
    stdout: BytesMut,
    stderr: BytesMut,
}

impl Default for ChildOutputMut {
    fn default() -> Self {
        Self {
            stdout: BytesMut::with_capacity(CHUNK_SIZE),
            stderr: BytesMut::with_capacity(CHUNK_SIZE),
        }
    }
}

impl ChildOutputMut {
    /// Marks collection as done, returning `(stdout, stderr)`.
    pub(crate) fn freeze(self) -> (Bytes, Bytes) {
        (self.stdout.freeze(), self.stderr.freeze())
    }
}
