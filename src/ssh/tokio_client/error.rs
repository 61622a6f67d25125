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

//! Error type for the russh-backed transport.

use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Failed to resolve address: {0}")]
    AddressInvalid(io::Error),
    #[error("Host key verification failed")]
    ServerCheckFailed,
    #[error("Password authentication failed (wrong password?)")]
    PasswordWrong,
    #[error("Public key authentication failed")]
    KeyAuthFailed,
    #[error("Failed to load private key: {0}")]
    KeyInvalid(#[source] russh::keys::Error),
    #[error("SSH agent authentication failed: could not connect to agent")]
    AgentConnectionFailed,
    #[error("SSH agent authentication failed: agent has no identities")]
    AgentNoIdentities,
    #[error("SSH agent authentication failed: no identity was accepted")]
    AgentAuthenticationFailed,
    #[error("No authentication method available: provide a password, a key file, or run an SSH agent")]
    NoAuthMethod,
    #[error("Shell channel was not opened before use")]
    ChannelNotOpen,
    #[error("Channel pump task failed: {0}")]
    PumpFailed(String),
    #[error("SSH error: {0}")]
    SshError(#[from] russh::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl Error {
    /// Whether the failure happened while authenticating.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Error::PasswordWrong
                | Error::KeyAuthFailed
                | Error::KeyInvalid(_)
                | Error::AgentConnectionFailed
                | Error::AgentNoIdentities
                | Error::AgentAuthenticationFailed
                | Error::NoAuthMethod
        )
    }
}
