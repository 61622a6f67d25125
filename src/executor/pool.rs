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

//! Bounded worker pool gating how many sessions run at once.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What happened to a task handed to [`BoundedPool::submit`].
#[derive(Debug)]
pub enum Submission {
    /// The task holds a slot and is running on its own tokio task.
    Admitted(JoinHandle<()>),
    /// The run was cancelled before a slot was acquired. The task was
    /// dropped without being polled.
    Abandoned,
}

impl Submission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Submission::Admitted(_))
    }
}

/// Admits at most `capacity` concurrently running tasks.
///
/// Each admitted task owns one semaphore permit for its whole lifetime, so
/// the slot is released when the task finishes, fails or panics.
#[derive(Debug, Clone)]
pub struct BoundedPool {
    slots: Arc<Semaphore>,
    capacity: usize,
    cancel: CancellationToken,
}

impl BoundedPool {
    /// Create a pool with `max_concurrent` slots. Zero is raised to one.
    pub fn new(max_concurrent: usize, cancel: CancellationToken) -> Self {
        let capacity = max_concurrent.max(1);
        if max_concurrent == 0 {
            tracing::warn!("Concurrency limit of 0 requested, using 1");
        }
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
            cancel,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots not currently held by a running task.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait for a free slot and start `task` on it.
    ///
    /// The wait is raced against cancellation. Once the token has fired no
    /// further task is admitted, even if a slot happens to be free.
    pub async fn submit<F>(&self, task: F) -> Submission
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Submission::Abandoned,
            permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                // Closed semaphore; never happens as the pool never closes it.
                Err(_) => return Submission::Abandoned,
            },
        };

        Submission::Admitted(tokio::spawn(async move {
            let _permit = permit;
            task.await;
        }))
    }
}
