// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Interactive shell channel management.
//!
//! russh delivers channel traffic as messages, while the executor wants
//! plain byte streams. [`RusshSession`] bridges the two with in-memory
//! pipes and a pump task that owns the channel:
//! - bytes written to the stdin pipe are sent as channel data, and EOF is
//!   sent once the stdin pipe is closed
//! - `Data` goes to the stdout pipe, extended data (stderr) to the stderr pipe
//! - `ExitStatus` is recorded and returned once the channel closes
//!
//! The pipes are bounded, so an undrained output stream stalls the pump the
//! same way it would stall the wire.

use async_trait::async_trait;
use russh::client::{Handle, Msg};
use russh::{Channel, ChannelMsg};
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use super::connection::ClientHandler;
use crate::ssh::transport::{RemoteSession, ShellStreams};

/// Buffer size for SSH command I/O operations
/// - 8KB matches typical SSH channel window sizes
const SSH_CMD_BUFFER_SIZE: usize = 8192;

/// Capacity of each in-memory pipe between the pump and the executor.
const PIPE_CAPACITY: usize = 64 * 1024;

/// SSH extended data type code for stderr.
const SSH_EXTENDED_DATA_STDERR: u32 = 1;

/// Channel ends held between `open_shell_streams` and `request_shell`.
struct PendingShell {
    channel: Channel<Msg>,
    stdin: DuplexStream,
    stdout: DuplexStream,
    stderr: DuplexStream,
}

/// An authenticated russh connection hosting one interactive shell.
pub struct RusshSession {
    handle: Handle<ClientHandler>,
    pending: Option<PendingShell>,
    pump: Option<JoinHandle<Result<Option<u32>, super::Error>>>,
    closed: bool,
}

impl RusshSession {
    pub(super) fn new(handle: Handle<ClientHandler>) -> Self {
        Self {
            handle,
            pending: None,
            pump: None,
            closed: false,
        }
    }
}

#[async_trait]
impl RemoteSession for RusshSession {
    async fn open_shell_streams(&mut self) -> Result<ShellStreams, super::Error> {
        let channel = self.handle.channel_open_session().await?;

        let (stdin_local, stdin_remote) = tokio::io::duplex(PIPE_CAPACITY);
        let (stdout_local, stdout_remote) = tokio::io::duplex(PIPE_CAPACITY);
        let (stderr_local, stderr_remote) = tokio::io::duplex(PIPE_CAPACITY);

        self.pending = Some(PendingShell {
            channel,
            stdin: stdin_remote,
            stdout: stdout_remote,
            stderr: stderr_remote,
        });

        Ok(ShellStreams {
            stdin: Box::new(stdin_local),
            stdout: Box::new(stdout_local),
            stderr: Box::new(stderr_local),
        })
    }

    async fn request_shell(&mut self) -> Result<(), super::Error> {
        let pending = self.pending.take().ok_or(super::Error::ChannelNotOpen)?;
        pending.channel.request_shell(false).await?;
        self.pump = Some(tokio::spawn(pump_channel(pending)));
        Ok(())
    }

    async fn wait(&mut self) -> Result<Option<u32>, super::Error> {
        let pump = self.pump.take().ok_or(super::Error::ChannelNotOpen)?;
        pump.await
            .map_err(|e| super::Error::PumpFailed(e.to_string()))?
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.pending = None;

        if let Err(e) = self
            .handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
        {
            tracing::debug!("Disconnect failed: {}", e);
        }
    }
}

/// Move bytes between the channel and the local pipes until the channel closes.
async fn pump_channel(shell: PendingShell) -> Result<Option<u32>, super::Error> {
    let PendingShell {
        mut channel,
        mut stdin,
        mut stdout,
        mut stderr,
    } = shell;

    let mut buf = vec![0u8; SSH_CMD_BUFFER_SIZE];
    let mut stdin_open = true;
    let mut stdout_open = true;
    let mut stderr_open = true;
    let mut exit_status: Option<u32> = None;

    loop {
        tokio::select! {
            read = stdin.read(&mut buf), if stdin_open => {
                match read? {
                    0 => {
                        stdin_open = false;
                        channel.eof().await?;
                    }
                    n => channel.data(&buf[..n]).await?,
                }
            }
            msg = channel.wait() => {
                match msg {
                    Some(ChannelMsg::Data { ref data }) => {
                        // A dropped reader only means nobody is draining anymore.
                        if stdout_open && stdout.write_all(data).await.is_err() {
                            stdout_open = false;
                        }
                    }
                    Some(ChannelMsg::ExtendedData { ref data, ext }) => {
                        if ext == SSH_EXTENDED_DATA_STDERR
                            && stderr_open
                            && stderr.write_all(data).await.is_err()
                        {
                            stderr_open = false;
                        }
                    }
                    // The exit status may arrive before the remaining data, so
                    // keep pumping until the channel closes.
                    Some(ChannelMsg::ExitStatus { exit_status: code }) => exit_status = Some(code),
                    Some(ChannelMsg::Close) | None => break,
                    Some(_) => {}
                }
            }
        }
    }

    // Dropping the remote ends signals EOF to the output drainers.
    drop(stdout);
    drop(stderr);

    Ok(exit_status)
}
