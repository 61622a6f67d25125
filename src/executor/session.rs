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

//! Drives one remote shell session from connect to exit.
//!
//! ```text
//! Idle -> Connecting -> Authenticated -> ShellReady -> Streaming -> Completed
//!                                                          |--> Cancelled
//!   (any state) --failure--> Failed
//! ```
//!
//! Cancellation is observed while connecting, while opening the shell,
//! before every command and while waiting for the shell to exit. Output is
//! drained and discarded.

use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::result_types::{CancelStage, Outcome, SessionError};
use crate::ssh::transport::{RemoteSession, ShellStreams, Transport};
use crate::target::Target;

/// Default bound on connect + authenticate.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Authenticated,
    ShellReady,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Authenticated => "authenticated",
            SessionState::ShellReady => "shell-ready",
            SessionState::Streaming => "streaming",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Runs a command sequence on one target.
pub struct SessionDriver<'a> {
    target: &'a Target,
    commands: &'a [String],
    transport: &'a dyn Transport,
    connect_timeout: Duration,
    cancel: CancellationToken,
    state: SessionState,
}

impl<'a> SessionDriver<'a> {
    pub fn new(
        target: &'a Target,
        commands: &'a [String],
        transport: &'a dyn Transport,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            commands,
            transport,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            cancel,
            state: SessionState::Idle,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug!("{}: {} -> {}", self.target.host, self.state, next);
        self.state = next;
    }

    /// Drive the session to a terminal state.
    ///
    /// The session, once established, is closed exactly once on every path.
    pub async fn run(&mut self) -> Outcome {
        let result = match self.connect().await {
            Ok(mut session) => {
                let result = self.drive(session.as_mut()).await;
                session.close().await;
                result
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(exit_status) => {
                self.transition(SessionState::Completed);
                debug!("{}: shell exited with {:?}", self.target.host, exit_status);
                Outcome::Success { exit_status }
            }
            Err(e) => {
                if e.is_cancelled() {
                    self.transition(SessionState::Cancelled);
                } else {
                    self.transition(SessionState::Failed);
                }
                warn!("{}: {}", self.target.host, e);
                Outcome::Failure(e)
            }
        }
    }

    async fn connect(&mut self) -> Result<Box<dyn RemoteSession>, SessionError> {
        self.transition(SessionState::Connecting);

        let (transport, target) = (self.transport, self.target);
        let dial = tokio::time::timeout(self.connect_timeout, transport.dial(target));
        let session = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(SessionError::Cancelled(CancelStage::Connecting));
            }
            dialed = dial => match dialed {
                Ok(Ok(session)) => session,
                Ok(Err(e)) => return Err(SessionError::Connect(e)),
                Err(_) => return Err(SessionError::ConnectTimeout(self.connect_timeout)),
            },
        };

        self.transition(SessionState::Authenticated);
        Ok(session)
    }

    async fn drive(&mut self, session: &mut dyn RemoteSession) -> Result<Option<u32>, SessionError> {
        let ShellStreams {
            mut stdin,
            stdout,
            stderr,
        } = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(SessionError::Cancelled(CancelStage::OpeningShell));
            }
            opened = session.open_shell_streams() => opened.map_err(SessionError::Shell)?,
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                return Err(SessionError::Cancelled(CancelStage::OpeningShell));
            }
            requested = session.request_shell() => requested.map_err(SessionError::Shell)?,
        }
        self.transition(SessionState::ShellReady);

        // Undrained output would stall command delivery.
        spawn_drain(stdout);
        spawn_drain(stderr);

        self.transition(SessionState::Streaming);
        for (index, command) in self.commands.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(SessionError::Cancelled(CancelStage::Streaming { sent: index }));
            }

            let line = format!("{command}\n");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(SessionError::Cancelled(CancelStage::Streaming { sent: index }));
                }
                written = stdin.write_all(line.as_bytes()) => {
                    written.map_err(|source| SessionError::Write { index, source })?;
                }
            }
        }

        stdin.shutdown().await.map_err(SessionError::CloseInput)?;
        drop(stdin);
        debug!(
            "{}: sent {} commands, waiting for shell exit",
            self.target.host,
            self.commands.len()
        );

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SessionError::Cancelled(CancelStage::WaitingForExit)),
            status = session.wait() => status.map_err(SessionError::Wait),
        }
    }
}

/// Read a stream to its end and throw the bytes away.
fn spawn_drain<R>(mut stream: R)
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        let _ = tokio::io::copy(&mut stream, &mut tokio::io::sink()).await;
    });
}
