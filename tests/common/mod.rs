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

//! In-memory transport for exercising the executor without a network.
//!
//! Each session runs a fake remote shell that records every line it
//! receives, writes some output back, and exits when stdin reaches EOF.
//! The transport counts concurrently open sessions so tests can check
//! the concurrency bound.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;

use sshauto::ssh::tokio_client::Error as TransportError;
use sshauto::ssh::{RemoteSession, ShellStreams, Transport};
use sshauto::Target;

#[derive(Default)]
struct Counters {
    active: AtomicUsize,
    peak: AtomicUsize,
    dialed: AtomicUsize,
    closed: AtomicUsize,
}

#[derive(Default)]
pub struct MockTransport {
    counters: Arc<Counters>,
    received: Arc<Mutex<HashMap<String, Vec<String>>>>,
    fail_auth: HashSet<String>,
    fail_shell: HashSet<String>,
    hang_dial: HashSet<String>,
    hang_open: HashSet<String>,
    hang_shell: HashSet<String>,
    shell_delay: Duration,
    read_delay: Duration,
    output_per_line: usize,
    pipe_capacity: Option<usize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_auth_for(mut self, host: &str) -> Self {
        self.fail_auth.insert(host.to_string());
        self
    }

    pub fn fail_shell_for(mut self, host: &str) -> Self {
        self.fail_shell.insert(host.to_string());
        self
    }

    pub fn hang_dial_for(mut self, host: &str) -> Self {
        self.hang_dial.insert(host.to_string());
        self
    }

    /// The shell channel never opens.
    pub fn hang_open_for(mut self, host: &str) -> Self {
        self.hang_open.insert(host.to_string());
        self
    }

    /// The remote shell never exits on its own.
    pub fn hang_shell_for(mut self, host: &str) -> Self {
        self.hang_shell.insert(host.to_string());
        self
    }

    /// How long the remote shell stays alive after stdin closes.
    pub fn with_shell_delay(mut self, delay: Duration) -> Self {
        self.shell_delay = delay;
        self
    }

    /// How long the remote shell pauses after each line it reads.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    /// Bytes of stdout and stderr produced per received line.
    pub fn with_output_per_line(mut self, bytes: usize) -> Self {
        self.output_per_line = bytes;
        self
    }

    pub fn with_pipe_capacity(mut self, capacity: usize) -> Self {
        self.pipe_capacity = Some(capacity);
        self
    }

    pub fn peak_sessions(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn active_sessions(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn dialed(&self) -> usize {
        self.counters.dialed.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn received(&self, host: &str) -> Vec<String> {
        self.received
            .lock()
            .unwrap()
            .get(host)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn dial(&self, target: &Target) -> Result<Box<dyn RemoteSession>, TransportError> {
        self.counters.dialed.fetch_add(1, Ordering::SeqCst);

        if self.hang_dial.contains(&target.host) {
            std::future::pending::<()>().await;
        }
        // Simulated handshake latency.
        tokio::time::sleep(Duration::from_millis(5)).await;
        if self.fail_auth.contains(&target.host) {
            return Err(TransportError::PasswordWrong);
        }

        let now = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(now, Ordering::SeqCst);

        Ok(Box::new(MockSession {
            host: target.host.clone(),
            counters: Arc::clone(&self.counters),
            received: Arc::clone(&self.received),
            fail_shell: self.fail_shell.contains(&target.host),
            hang_open: self.hang_open.contains(&target.host),
            hang_shell: self.hang_shell.contains(&target.host),
            shell_delay: self.shell_delay,
            read_delay: self.read_delay,
            output_per_line: self.output_per_line,
            pipe_capacity: self.pipe_capacity.unwrap_or(4096),
            shell: None,
            closed: false,
        }))
    }
}

struct MockSession {
    host: String,
    counters: Arc<Counters>,
    received: Arc<Mutex<HashMap<String, Vec<String>>>>,
    fail_shell: bool,
    hang_open: bool,
    hang_shell: bool,
    shell_delay: Duration,
    read_delay: Duration,
    output_per_line: usize,
    pipe_capacity: usize,
    shell: Option<JoinHandle<u32>>,
    closed: bool,
}

#[async_trait]
impl RemoteSession for MockSession {
    async fn open_shell_streams(&mut self) -> Result<ShellStreams, TransportError> {
        if self.hang_open {
            std::future::pending::<()>().await;
        }
        if self.fail_shell {
            return Err(TransportError::ChannelNotOpen);
        }

        let (stdin_local, stdin_remote) = tokio::io::duplex(self.pipe_capacity);
        let (stdout_local, mut stdout_remote) = tokio::io::duplex(self.pipe_capacity);
        let (stderr_local, mut stderr_remote) = tokio::io::duplex(self.pipe_capacity);

        let host = self.host.clone();
        let received = Arc::clone(&self.received);
        let hang = self.hang_shell;
        let delay = self.shell_delay;
        let read_delay = self.read_delay;
        let output = vec![b'x'; self.output_per_line];

        self.shell = Some(tokio::spawn(async move {
            let mut lines = BufReader::new(stdin_remote).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                received
                    .lock()
                    .unwrap()
                    .entry(host.clone())
                    .or_default()
                    .push(line);
                if !output.is_empty() {
                    let _ = stdout_remote.write_all(&output).await;
                    let _ = stderr_remote.write_all(&output).await;
                }
                if !read_delay.is_zero() {
                    tokio::time::sleep(read_delay).await;
                }
            }
            if hang {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(delay).await;
            0
        }));

        Ok(ShellStreams {
            stdin: Box::new(stdin_local),
            stdout: Box::new(stdout_local),
            stderr: Box::new(stderr_local),
        })
    }

    async fn request_shell(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn wait(&mut self) -> Result<Option<u32>, TransportError> {
        let shell = self.shell.take().ok_or(TransportError::ChannelNotOpen)?;
        shell
            .await
            .map(Some)
            .map_err(|e| TransportError::PumpFailed(e.to_string()))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(shell) = self.shell.take() {
            shell.abort();
        }
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn targets(count: usize) -> Vec<Target> {
    (1..=count)
        .map(|i| {
            Target::new(format!("node{i}"), 22, "user".to_string())
                .with_password(Some("pw".to_string()))
        })
        .collect()
}

pub fn commands(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}
