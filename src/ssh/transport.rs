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

//! Boundary between the execution engine and the remote-shell transport.
//!
//! The executor only ever talks to these traits. The production
//! implementation lives in [`crate::ssh::tokio_client`]; tests plug in an
//! in-memory transport.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use super::tokio_client::Error as TransportError;
use crate::target::Target;

pub type ShellInput = Box<dyn AsyncWrite + Send + Unpin>;
pub type ShellOutput = Box<dyn AsyncRead + Send + Unpin>;

/// The three byte streams of an interactive remote shell.
pub struct ShellStreams {
    pub stdin: ShellInput,
    pub stdout: ShellOutput,
    pub stderr: ShellOutput,
}

/// Establishes authenticated sessions to targets.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect and authenticate to `target`.
    ///
    /// The caller bounds this with its own connection timeout.
    async fn dial(&self, target: &Target) -> Result<Box<dyn RemoteSession>, TransportError>;
}

/// One authenticated connection able to host a single interactive shell.
#[async_trait]
pub trait RemoteSession: Send {
    /// Open the shell channel and hand out its stdin/stdout/stderr streams.
    async fn open_shell_streams(&mut self) -> Result<ShellStreams, TransportError>;

    /// Start the remote shell on the channel opened by `open_shell_streams`.
    async fn request_shell(&mut self) -> Result<(), TransportError>;

    /// Wait for the remote shell to exit. Returns the exit status if the
    /// server reported one.
    async fn wait(&mut self) -> Result<Option<u32>, TransportError>;

    /// Tear the session down. Safe to call more than once.
    async fn close(&mut self);
}
