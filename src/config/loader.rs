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

//! Loading of the script file and the server list.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::types::{ServerDetails, ServerEntry, ServerList};
use super::utils::expand_tilde;
use crate::target::Target;

const DEFAULT_SSH_PORT: u16 = 22;

/// Read a script file into its command lines.
///
/// Order and blank lines are kept as they are in the file.
pub async fn load_script(path: &Path) -> Result<Vec<String>> {
    let expanded_path = expand_tilde(path);
    let content = fs::read_to_string(&expanded_path)
        .await
        .with_context(|| format!("Failed to read script file at {}", expanded_path.display()))?;

    let commands = parse_script(&content);
    if commands.is_empty() {
        tracing::warn!(
            "Script file {} is empty; sessions will only open and close a shell",
            expanded_path.display()
        );
    }
    Ok(commands)
}

/// Split script content into lines, dropping only the line terminators.
pub fn parse_script(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

/// Read a YAML server list into targets.
pub async fn load_server_list(path: &Path) -> Result<Vec<Target>> {
    let expanded_path = expand_tilde(path);
    let content = fs::read_to_string(&expanded_path).await.with_context(|| {
        format!(
            "Failed to read server list at {}",
            expanded_path.display()
        )
    })?;

    let list = ServerList::from_yaml(&content).with_context(|| {
        format!(
            "Failed to parse server list at {}. Expected a YAML document with a 'servers' list.",
            expanded_path.display()
        )
    })?;

    list.into_targets()
        .with_context(|| format!("Invalid server list at {}", expanded_path.display()))
}

impl ServerList {
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Resolve every entry against the defaults.
    pub fn into_targets(self) -> Result<Vec<Target>> {
        if self.servers.is_empty() {
            anyhow::bail!("Server list contains no servers");
        }

        let defaults = self.defaults;
        let default_port = defaults.port.unwrap_or(DEFAULT_SSH_PORT);

        self.servers
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let (target, password, key_file, key_passphrase) = match entry {
                    ServerEntry::Simple(compact) => {
                        let target = Target::parse(compact.trim(), defaults.user.as_deref(), default_port)
                            .with_context(|| format!("Invalid server entry #{}", index + 1))?;
                        (target, None, None, None)
                    }
                    ServerEntry::Detailed(ServerDetails {
                        host,
                        port,
                        user,
                        password,
                        key_file,
                        key_passphrase,
                    }) => {
                        if host.trim().is_empty() {
                            anyhow::bail!("Server entry #{} has an empty host", index + 1);
                        }
                        let username = user
                            .or_else(|| defaults.user.clone())
                            .unwrap_or_else(super::current_username);
                        let target = Target::new(
                            host.trim().to_string(),
                            port.unwrap_or(default_port),
                            username,
                        );
                        (target, password, key_file, key_passphrase)
                    }
                };

                Ok(target
                    .with_password(password.or_else(|| defaults.password.clone()))
                    .with_key_file(
                        key_file
                            .or_else(|| defaults.key_file.clone())
                            .map(|k| expand_tilde(&PathBuf::from(k))),
                    )
                    .with_key_passphrase(key_passphrase.or_else(|| defaults.key_passphrase.clone())))
            })
            .collect()
    }
}
