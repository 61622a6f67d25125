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

//! Input file type definitions.

use serde::Deserialize;

/// Server list file.
///
/// ```yaml
/// defaults:
///   user: deploy
///   key_file: ~/.ssh/id_ed25519
/// servers:
///   - web1.example.com
///   - admin@db1.example.com:2222
///   - host: 10.0.0.7
///     port: 2200
///     user: ops
///     password: secret
/// ```
#[derive(Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerList {
    #[serde(default)]
    pub defaults: ServerDefaults,

    #[serde(default)]
    pub servers: Vec<ServerEntry>,
}

/// Values applied to every entry that does not set them itself.
#[derive(Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerDefaults {
    #[serde(default, alias = "username")]
    pub user: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "keyfile")]
    pub key_file: Option<String>,
    #[serde(default)]
    pub key_passphrase: Option<String>,
}

/// A server entry.
///
/// Uses `#[serde(untagged)]` so both the compact string form and the
/// detailed mapping form are accepted.
#[derive(Deserialize, Clone)]
#[serde(untagged)]
pub enum ServerEntry {
    /// Detailed format with per-server credentials
    Detailed(ServerDetails),
    /// Compact "[user@]hostname[:port]" format
    Simple(String),
}

/// Per-server settings of a detailed entry.
#[derive(Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerDetails {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default, alias = "username")]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default, alias = "keyfile")]
    pub key_file: Option<String>,
    #[serde(default)]
    pub key_passphrase: Option<String>,
}
