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

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crate::ssh::ServerCheckMethod;
use crate::target::Target;

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Parser, Debug)]
#[command(
    name = "sshauto",
    version,
    about = "Run a shell script on many SSH hosts in parallel",
    long_about = "sshauto streams the lines of a script file into an interactive shell on every\ntarget host, running up to --concurrent sessions at once. Remote output is\ndiscarded; the run reports which hosts succeeded and why the others failed.\nPress Ctrl+C to cancel: sessions stop sending commands and hosts that have not\nstarted yet are skipped.",
    after_help = "EXAMPLES:\n  Single host:        sshauto --host web1 --username deploy --keyfile ~/.ssh/id_ed25519 --script setup.sh\n  Many hosts:         sshauto --servers servers.yaml --script setup.sh --concurrent 8\n\nExit codes: 0 (all hosts succeeded), 1 (any host failed or the run was cancelled)"
)]
pub struct Cli {
    #[arg(long, help = "SSH host (ignored when --servers is given)")]
    pub host: Option<String>,

    #[arg(long, default_value = "22", help = "SSH port")]
    pub port: u16,

    #[arg(long, help = "SSH username")]
    pub username: Option<String>,

    #[arg(long, env = "SSHAUTO_PASSWORD", hide_env_values = true, help = "SSH password")]
    pub password: Option<String>,

    #[arg(long = "keyfile", help = "Path to private key file")]
    pub key_file: Option<PathBuf>,

    #[arg(long = "script", help = "Path of the script to run (one command per line)")]
    pub script: PathBuf,

    #[arg(
        long = "servers",
        help = "YAML file with server details\nEntries are either '[user@]host[:port]' strings or mappings with\nhost, port, user, password, key_file and key_passphrase"
    )]
    pub servers: Option<PathBuf>,

    #[arg(
        long = "concurrent",
        default_value_t = default_concurrency(),
        help = "Maximum concurrent connections [default: number of CPUs]\n0 is treated as 1"
    )]
    pub concurrent: usize,

    #[arg(
        long,
        default_value = "10",
        value_parser = clap::value_parser!(u64).range(1..=3600),
        help = "SSH connection timeout in seconds (connect + authenticate)"
    )]
    pub connect_timeout: u64,

    #[arg(
        long,
        help = "Verify host keys against known_hosts instead of accepting any key"
    )]
    pub strict_host_key_checking: bool,

    #[arg(
        long,
        requires = "strict_host_key_checking",
        help = "known_hosts file to verify against [default: ~/.ssh/known_hosts]"
    )]
    pub known_hosts: Option<PathBuf>,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

impl Cli {
    /// Build the single target described by --host and friends.
    pub fn single_target(&self) -> Result<Target> {
        let host = self.host.as_deref().filter(|h| !h.is_empty());
        let username = self.username.as_deref().filter(|u| !u.is_empty());

        let (Some(host), Some(username)) = (host, username) else {
            anyhow::bail!(
                "--host and --username are required when not using --servers"
            );
        };

        Ok(Target::new(host.to_string(), self.port, username.to_string())
            .with_password(self.password.clone())
            .with_key_file(
                self.key_file
                    .as_deref()
                    .map(crate::config::expand_tilde),
            ))
    }

    pub fn server_check(&self) -> ServerCheckMethod {
        if !self.strict_host_key_checking {
            return ServerCheckMethod::NoCheck;
        }
        match &self.known_hosts {
            Some(path) => ServerCheckMethod::with_known_hosts_file(
                &crate::config::expand_tilde(path).to_string_lossy(),
            ),
            None => ServerCheckMethod::DefaultKnownHostsFile,
        }
    }
}
