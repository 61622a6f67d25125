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

//! Process signal handling.
//!
//! Interrupts are mapped onto the run's [`CancellationToken`]; every
//! in-flight session and the pool observe it directly.

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Fire `cancel` on the first Ctrl+C (or SIGTERM on Unix).
pub fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_interrupt() => {
                info!("Interrupt received, cancelling run");
                cancel.cancel();
            }
            _ = cancel.cancelled() => {}
        }
    });
}

async fn wait_for_interrupt() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                tracing::debug!("Could not set SIGTERM handler: {}", e);
                ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = ctrl_c() => {}
            _ = sigterm.recv() => info!("Received SIGTERM signal"),
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::debug!("Could not set Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
}
