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
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroizing;

/// One remote host and the credentials used to reach it.
///
/// Targets are immutable once built and are shared read-only across the run.
#[derive(Clone)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<Zeroizing<String>>,
    pub key_file: Option<PathBuf>,
    pub key_passphrase: Option<Zeroizing<String>>,
}

impl Target {
    pub fn new(host: String, port: u16, username: String) -> Self {
        Self {
            host,
            port,
            username,
            password: None,
            key_file: None,
            key_passphrase: None,
        }
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password.filter(|p| !p.is_empty()).map(Zeroizing::new);
        self
    }

    pub fn with_key_file(mut self, key_file: Option<PathBuf>) -> Self {
        self.key_file = key_file.filter(|p| !p.as_os_str().is_empty());
        self
    }

    pub fn with_key_passphrase(mut self, passphrase: Option<String>) -> Self {
        self.key_passphrase = passphrase.map(Zeroizing::new);
        self
    }

    pub fn parse(target_str: &str, default_user: Option<&str>, default_port: u16) -> Result<Self> {
        // Parse formats:
        // - host
        // - host:port
        // - user@host
        // - user@host:port

        let (user_part, host_part) = match target_str.rsplit_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, target_str),
        };

        let (host, port) = match host_part.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str
                    .parse::<u16>()
                    .with_context(|| format!("Invalid port number in '{target_str}'"))?;
                (host, port)
            }
            None => (host_part, default_port),
        };

        if host.is_empty() {
            anyhow::bail!("Missing host in '{target_str}'");
        }

        let username = user_part
            .filter(|u| !u.is_empty())
            .or(default_user)
            .map(|s| s.to_string())
            .unwrap_or_else(crate::config::current_username);

        Ok(Target::new(host.to_string(), port, username))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("key_file", &self.key_file)
            .finish()
    }
}
