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

//! Result types for parallel script execution.

use std::fmt;
use std::time::Duration;

use crate::ssh::tokio_client::Error as TransportError;

/// Where a session was when it observed cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStage {
    Connecting,
    OpeningShell,
    Streaming { sent: usize },
    WaitingForExit,
}

impl fmt::Display for CancelStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelStage::Connecting => write!(f, "connecting"),
            CancelStage::OpeningShell => write!(f, "opening the remote shell"),
            CancelStage::Streaming { sent } => {
                write!(f, "streaming commands ({sent} sent)")
            }
            CancelStage::WaitingForExit => write!(f, "waiting for the remote shell to exit"),
        }
    }
}

/// Why a single target's session failed.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("connection failed: {0}")]
    Connect(#[source] TransportError),
    #[error("connection timed out after {}s", .0.as_secs())]
    ConnectTimeout(Duration),
    #[error("failed to open shell: {0}")]
    Shell(#[source] TransportError),
    #[error("failed to send command #{index}: {source}")]
    Write {
        index: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to close shell input: {0}")]
    CloseInput(#[source] std::io::Error),
    #[error("waiting for shell exit failed: {0}")]
    Wait(#[source] TransportError),
    #[error("session task aborted: {0}")]
    Aborted(String),
    #[error("run cancelled while {0}")]
    Cancelled(CancelStage),
}

impl SessionError {
    /// Distinguishes an aborted run from a broken host.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::Cancelled(_))
    }
}

/// Terminal result of driving one target's session.
#[derive(Debug)]
pub enum Outcome {
    Success { exit_status: Option<u32> },
    Failure(SessionError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// An outcome tagged with the host it came from.
#[derive(Debug)]
pub struct TargetOutcome {
    pub host: String,
    pub outcome: Outcome,
}

/// One failed target in a [`RunResult`].
#[derive(Debug)]
pub struct HostFailure {
    pub host: String,
    pub reason: SessionError,
}

impl fmt::Display for HostFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.host, self.reason)
    }
}

/// Aggregate of all outcomes for one run.
///
/// `failures` is in arrival order, not submission order. Targets in
/// `not_started` were never admitted because the run was cancelled; they
/// produce no outcome and are not counted in `succeeded` or `failed()`.
#[derive(Debug, Default)]
pub struct RunResult {
    pub succeeded: usize,
    pub failures: Vec<HostFailure>,
    pub not_started: Vec<String>,
    pub cancelled: bool,
}

impl RunResult {
    pub(crate) fn record(&mut self, outcome: TargetOutcome) {
        match outcome.outcome {
            Outcome::Success { .. } => self.succeeded += 1,
            Outcome::Failure(reason) => self.failures.push(HostFailure {
                host: outcome.host,
                reason,
            }),
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Number of targets that produced an outcome.
    pub fn completed(&self) -> usize {
        self.succeeded + self.failed()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.not_started.is_empty() && !self.cancelled
    }

    /// Turn the run into an error if any target failed or the run was cut short.
    pub fn into_result(self) -> Result<RunResult, ExecutionError> {
        if self.failures.is_empty() && !self.cancelled {
            return Ok(self);
        }
        if self.failures.is_empty() {
            return Err(ExecutionError::Cancelled {
                not_started: self.not_started.len(),
            });
        }
        Err(ExecutionError::TargetsFailed {
            failed: self.failed(),
            total: self.completed() + self.not_started.len(),
            details: self
                .failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n  "),
        })
    }
}

/// Aggregate failure of a run.
#[derive(thiserror::Error, Debug)]
pub enum ExecutionError {
    #[error("encountered {failed} errors during execution ({total} targets):\n  {details}")]
    TargetsFailed {
        failed: usize,
        total: usize,
        details: String,
    },
    #[error("run was cancelled ({not_started} targets not started)")]
    Cancelled { not_started: usize },
}
