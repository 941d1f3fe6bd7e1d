/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use coap_endpoint_registry::EndpointConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

fn default_threads() -> usize {
    2
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub(crate) endpoints: Vec<EndpointConfig>,
    #[serde(default)]
    pub(crate) servers: Vec<ServerConfig>,
    #[serde(default)]
    pub(crate) clients: Vec<ClientConfig>,
    #[serde(default)]
    pub(crate) executors: ExecutorsConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub(crate) name: String,
    pub(crate) endpoint: String,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub(crate) name: String,
    pub(crate) endpoint: String,
    #[serde(default)]
    pub(crate) ping: Option<PingConfig>,
}

/// Periodic CoAP ping (empty confirmable message) sent by a client.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PingConfig {
    pub(crate) peer: SocketAddr,
    pub(crate) interval_ms: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutorsConfig {
    #[serde(default = "default_threads")]
    pub(crate) io_threads: usize,
    #[serde(default = "default_threads")]
    pub(crate) cpu_threads: usize,
}

impl Default for ExecutorsConfig {
    fn default() -> Self {
        Self {
            io_threads: default_threads(),
            cpu_threads: default_threads(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(json5::Error),
    DuplicateEndpoint(String),
    UnknownEndpoint {
        component: String,
        endpoint: String,
    },
    InvalidValue(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "unable to read config file {}: {source}", path.display())
            }
            ConfigError::Parse(err) => write!(f, "unable to parse config file: {err}"),
            ConfigError::DuplicateEndpoint(name) => {
                write!(f, "duplicate endpoint config name found: {name}")
            }
            ConfigError::UnknownEndpoint {
                component,
                endpoint,
            } => write!(f, "{component} refers to unknown endpoint {endpoint}"),
            ConfigError::InvalidValue(reason) => write!(f, "invalid config value: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json5(&contents)
    }

    pub fn from_json5(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = json5::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for endpoint in &self.endpoints {
            if !names.insert(endpoint.config_name()) {
                return Err(ConfigError::DuplicateEndpoint(
                    endpoint.config_name().to_string(),
                ));
            }
        }

        self.check_bind_clashes()?;

        let references = self
            .servers
            .iter()
            .map(|server| (format!("server {}", server.name), &server.endpoint))
            .chain(
                self.clients
                    .iter()
                    .map(|client| (format!("client {}", client.name), &client.endpoint)),
            );
        for (component, endpoint) in references {
            if !names.contains(endpoint.as_str()) {
                return Err(ConfigError::UnknownEndpoint {
                    component,
                    endpoint: endpoint.clone(),
                });
            }
        }

        for client in &self.clients {
            if matches!(&client.ping, Some(ping) if ping.interval_ms == 0) {
                return Err(ConfigError::InvalidValue(format!(
                    "client {} ping interval must be positive",
                    client.name
                )));
            }
        }

        if self.executors.io_threads == 0 || self.executors.cpu_threads == 0 {
            return Err(ConfigError::InvalidValue(
                "executor thread counts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Rejects datagram endpoints that would bind the same fixed port on overlapping
    /// addresses. Port 0 asks the OS for a free port and never clashes.
    fn check_bind_clashes(&self) -> Result<(), ConfigError> {
        let binds: Vec<(&str, IpAddr, u16)> = self
            .endpoints
            .iter()
            .filter_map(|endpoint| {
                endpoint
                    .datagram_bind()
                    .map(|(address, port)| (endpoint.config_name(), address, port))
            })
            .filter(|(_, _, port)| *port != 0)
            .collect();

        for (index, (name, address, port)) in binds.iter().enumerate() {
            for (other_name, other_address, other_port) in &binds[index + 1..] {
                let overlapping = address == other_address
                    || address.is_unspecified()
                    || other_address.is_unspecified();
                if port == other_port && overlapping {
                    return Err(ConfigError::InvalidValue(format!(
                        "endpoints {name} ({address}:{port}) and {other_name} \
                         ({other_address}:{other_port}) bind the same port"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn endpoint(&self, config_name: &str) -> Option<&EndpointConfig> {
        self.endpoints
            .iter()
            .find(|endpoint| endpoint.config_name() == config_name)
    }
}
