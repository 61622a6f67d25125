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

//! Core parallel executor implementation.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ssh::transport::Transport;
use crate::target::Target;

use super::pool::{BoundedPool, Submission};
use super::result_types::{Outcome, RunResult, SessionError, TargetOutcome};
use super::session::{SessionDriver, DEFAULT_CONNECT_TIMEOUT};

/// Parallel executor for running a command sequence across multiple targets.
pub struct ParallelExecutor {
    pub(crate) targets: Vec<Target>,
    pub(crate) max_parallel: usize,
    pub(crate) connect_timeout: Duration,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) cancel: CancellationToken,
}

impl ParallelExecutor {
    /// Create a new parallel executor.
    pub fn new(targets: Vec<Target>, max_parallel: usize, transport: Arc<dyn Transport>) -> Self {
        Self {
            targets,
            max_parallel,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            transport,
            cancel: CancellationToken::new(),
        }
    }

    /// Set SSH connection timeout.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Share a cancellation token with the caller (usually the signal handler).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run `commands` on every target and aggregate the outcomes.
    ///
    /// Per-target failures never stop the run. Targets still waiting for a
    /// slot when the run is cancelled are reported in `not_started`.
    pub async fn execute(&self, commands: &[String]) -> RunResult {
        let commands: Arc<[String]> = Arc::from(commands);
        let pool = BoundedPool::new(self.max_parallel, self.cancel.clone());
        let (tx, mut rx) = mpsc::channel::<TargetOutcome>(self.targets.len().max(1));

        tracing::info!(
            "Running {} commands on {} targets (max {} concurrent)",
            commands.len(),
            self.targets.len(),
            pool.capacity()
        );

        let mut admitted = Vec::with_capacity(self.targets.len());
        let mut not_started = Vec::new();

        for target in &self.targets {
            let target = target.clone();
            let commands = Arc::clone(&commands);
            let transport = Arc::clone(&self.transport);
            let cancel = self.cancel.clone();
            let connect_timeout = self.connect_timeout;
            // Each task owns one sender; the channel closes once every task
            // has either finished or been dropped unrun.
            let tx = tx.clone();
            let host = target.host.clone();

            let task = async move {
                let outcome = SessionDriver::new(&target, &commands, transport.as_ref(), cancel)
                    .with_connect_timeout(connect_timeout)
                    .run()
                    .await;
                // Capacity equals the target count, so this never waits.
                let _ = tx
                    .send(TargetOutcome {
                        host: target.host.clone(),
                        outcome,
                    })
                    .await;
            };

            match pool.submit(task).await {
                Submission::Admitted(handle) => admitted.push((host, handle)),
                Submission::Abandoned => {
                    tracing::debug!("{}: not started, run cancelled", host);
                    not_started.push(host);
                }
            }
        }
        drop(tx);

        let mut run = RunResult::default();
        while let Some(outcome) = rx.recv().await {
            run.record(outcome);
        }

        // A task that panicked dropped its sender without reporting.
        let (hosts, handles): (Vec<_>, Vec<_>) = admitted.into_iter().unzip();
        for (host, joined) in hosts.into_iter().zip(join_all(handles).await) {
            if let Err(e) = joined {
                run.record(TargetOutcome {
                    host,
                    outcome: Outcome::Failure(SessionError::Aborted(e.to_string())),
                });
            }
        }

        run.not_started = not_started;
        run.cancelled = !run.not_started.is_empty()
            || run.failures.iter().any(|f| f.reason.is_cancelled());

        tracing::info!(
            "Run finished: {} succeeded, {} failed, {} not started",
            run.succeeded,
            run.failed(),
            run.not_started.len()
        );
        run
    }
}
