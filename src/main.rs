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

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use sshauto::{
    cli::Cli,
    config::{load_script, load_server_list},
    executor::ParallelExecutor,
    signal::spawn_interrupt_handler,
    ssh::{RusshTransport, ServerCheckMethod},
    ui::OutputFormatter,
    utils::init_logging,
    Target,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    // Input errors are fatal before any session starts.
    let commands = load_script(&cli.script)
        .await
        .context("Error reading script file")?;
    let targets = resolve_targets(&cli)
        .await
        .context("Error getting server details")?;

    let server_check = cli.server_check();
    if server_check == ServerCheckMethod::NoCheck {
        tracing::warn!("Host key checking is disabled; pass --strict-host-key-checking to verify host keys");
    }

    let executor = ParallelExecutor::new(
        targets,
        cli.concurrent,
        Arc::new(RusshTransport::new(server_check)),
    )
    .with_connect_timeout(Duration::from_secs(cli.connect_timeout))
    .with_cancellation(cancel);

    let started = Instant::now();
    let run = executor.execute(&commands).await;
    OutputFormatter::print_summary(&run, started.elapsed());

    if let Err(e) = run.into_result() {
        eprintln!("Error executing commands: {e}");
        std::process::exit(1);
    }

    Ok(())
}

async fn resolve_targets(cli: &Cli) -> Result<Vec<Target>> {
    match &cli.servers {
        Some(path) => load_server_list(path).await,
        None => cli.single_target().map(|target| vec![target]),
    }
}
