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

//! SSH connection establishment.
//!
//! [`RusshTransport`] resolves the target address, performs the handshake,
//! checks the host key and authenticates. The resulting [`RusshSession`]
//! owns the connection handle until it is closed.

use async_trait::async_trait;
use russh::client::{Config, Handle, Handler};
use std::net::SocketAddr;
use std::sync::Arc;
use std::{fmt::Debug, io};

use super::authentication::{AuthMethod, ServerCheckMethod};
use super::channel_manager::RusshSession;
use crate::ssh::transport::{RemoteSession, Transport};
use crate::target::Target;

/// [`Transport`] implementation backed by russh.
#[derive(Clone)]
pub struct RusshTransport {
    config: Arc<Config>,
    server_check: ServerCheckMethod,
}

impl RusshTransport {
    pub fn new(server_check: ServerCheckMethod) -> Self {
        Self::with_config(server_check, Config::default())
    }

    /// Same as `new`, but with the option to specify a non default
    /// [`russh::client::Config`].
    pub fn with_config(server_check: ServerCheckMethod, config: Config) -> Self {
        Self {
            config: Arc::new(config),
            server_check,
        }
    }

    async fn connect(&self, target: &Target) -> Result<Handle<ClientHandler>, super::Error> {
        let auth = AuthMethod::for_target(target)?;

        // Connection code inspired from std::net::TcpStream::connect and std::net::each_addr
        let socket_addrs = tokio::net::lookup_host((target.host.as_str(), target.port))
            .await
            .map_err(super::Error::AddressInvalid)?;
        let mut connect_res = Err(super::Error::AddressInvalid(io::Error::new(
            io::ErrorKind::InvalidInput,
            "could not resolve to any addresses",
        )));
        for socket_addr in socket_addrs {
            let handler = ClientHandler::new(
                target.host.clone(),
                socket_addr,
                self.server_check.clone(),
            );
            match russh::client::connect(self.config.clone(), socket_addr, handler).await {
                Ok(h) => {
                    tracing::debug!("Connected to {} via {}", target.host, socket_addr);
                    connect_res = Ok(h);
                    break;
                }
                Err(e) => {
                    tracing::debug!("Connection to {} via {} failed: {}", target.host, socket_addr, e);
                    connect_res = Err(e);
                }
            }
        }
        let mut handle = connect_res?;

        super::authentication::authenticate(&mut handle, &target.username, auth).await?;
        Ok(handle)
    }
}

impl Debug for RusshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshTransport")
            .field("server_check", &self.server_check)
            .finish()
    }
}

#[async_trait]
impl Transport for RusshTransport {
    async fn dial(&self, target: &Target) -> Result<Box<dyn RemoteSession>, super::Error> {
        let handle = self.connect(target).await?;
        Ok(Box::new(RusshSession::new(handle)))
    }
}

/// SSH client handler for managing server key verification.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    host: SocketAddr,
    server_check: ServerCheckMethod,
}

impl ClientHandler {
    /// Create a new client handler.
    pub fn new(hostname: String, host: SocketAddr, server_check: ServerCheckMethod) -> Self {
        Self {
            hostname,
            host,
            server_check,
        }
    }
}

impl Handler for ClientHandler {
    type Error = super::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.server_check {
            ServerCheckMethod::NoCheck => Ok(true),
            ServerCheckMethod::KnownHostsFile(known_hosts_path) => {
                let result = russh::keys::check_known_hosts_path(
                    &self.hostname,
                    self.host.port(),
                    server_public_key,
                    known_hosts_path,
                )
                .map_err(|_| super::Error::ServerCheckFailed)?;

                Ok(result)
            }
            ServerCheckMethod::DefaultKnownHostsFile => {
                let result = russh::keys::check_known_hosts(
                    &self.hostname,
                    self.host.port(),
                    server_public_key,
                )
                .map_err(|_| super::Error::ServerCheckFailed)?;

                Ok(result)
            }
        }
    }
}
