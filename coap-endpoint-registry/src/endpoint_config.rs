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

//! Endpoint configuration model.
//!
//! An [`EndpointConfig`] names one logical network endpoint. Two configurations
//! carrying the same `config_name` denote the same endpoint and are shared by
//! the [`EndpointRegistry`][crate::EndpointRegistry].

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::net::IpAddr;
use std::path::PathBuf;

pub const DEFAULT_COAP_PORT: u16 = 5683;
pub const DEFAULT_COAPS_PORT: u16 = 5684;

fn default_bind_address() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_coap_port() -> u16 {
    DEFAULT_COAP_PORT
}

fn default_coaps_port() -> u16 {
    DEFAULT_COAPS_PORT
}

/// Kind of network endpoint a configuration describes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EndpointKind {
    Udp,
    MulticastUdp,
    Dtls,
    TcpServer,
    TcpClient,
    TlsServer,
    TlsClient,
}

impl Display for EndpointKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EndpointKind::Udp => "udp",
            EndpointKind::MulticastUdp => "multicast_udp",
            EndpointKind::Dtls => "dtls",
            EndpointKind::TcpServer => "tcp_server",
            EndpointKind::TcpClient => "tcp_client",
            EndpointKind::TlsServer => "tls_server",
            EndpointKind::TlsClient => "tls_client",
        };
        write!(f, "{label}")
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct UdpEndpointConfig {
    pub config_name: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_coap_port")]
    pub port: u16,
    #[serde(default)]
    pub log_traffic: bool,
}

impl UdpEndpointConfig {
    pub fn new(config_name: &str, bind_address: IpAddr, port: u16) -> Self {
        Self {
            config_name: config_name.to_string(),
            bind_address,
            port,
            log_traffic: false,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MulticastUdpEndpointConfig {
    pub config_name: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_coap_port")]
    pub port: u16,
    pub group_address: IpAddr,
    #[serde(default = "default_bind_address")]
    pub interface_address: IpAddr,
    #[serde(default)]
    pub log_traffic: bool,
}

/// Credentials used by a DTLS endpoint.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case", deny_unknown_fields)]
pub enum DtlsSecurity {
    PreSharedKey {
        identity: String,
        key_hex: String,
    },
    Certificate {
        certificate_file: PathBuf,
        private_key_file: PathBuf,
        #[serde(default)]
        trust_store_file: Option<PathBuf>,
    },
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DtlsEndpointConfig {
    pub config_name: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_coaps_port")]
    pub port: u16,
    pub security: DtlsSecurity,
    #[serde(default)]
    pub log_traffic: bool,
}

/// Parameters shared by the stream-oriented (TCP/TLS) endpoint kinds.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StreamEndpointConfig {
    pub config_name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub log_traffic: bool,
}

/// Tagged endpoint configuration, keyed in the registry by `config_name`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndpointConfig {
    Udp(UdpEndpointConfig),
    MulticastUdp(MulticastUdpEndpointConfig),
    Dtls(DtlsEndpointConfig),
    TcpServer(StreamEndpointConfig),
    TcpClient(StreamEndpointConfig),
    TlsServer(StreamEndpointConfig),
    TlsClient(StreamEndpointConfig),
}

impl EndpointConfig {
    pub fn config_name(&self) -> &str {
        match self {
            EndpointConfig::Udp(config) => &config.config_name,
            EndpointConfig::MulticastUdp(config) => &config.config_name,
            EndpointConfig::Dtls(config) => &config.config_name,
            EndpointConfig::TcpServer(config)
            | EndpointConfig::TcpClient(config)
            | EndpointConfig::TlsServer(config)
            | EndpointConfig::TlsClient(config) => &config.config_name,
        }
    }

    pub fn kind(&self) -> EndpointKind {
        match self {
            EndpointConfig::Udp(_) => EndpointKind::Udp,
            EndpointConfig::MulticastUdp(_) => EndpointKind::MulticastUdp,
            EndpointConfig::Dtls(_) => EndpointKind::Dtls,
            EndpointConfig::TcpServer(_) => EndpointKind::TcpServer,
            EndpointConfig::TcpClient(_) => EndpointKind::TcpClient,
            EndpointConfig::TlsServer(_) => EndpointKind::TlsServer,
            EndpointConfig::TlsClient(_) => EndpointKind::TlsClient,
        }
    }

    pub fn log_traffic(&self) -> bool {
        match self {
            EndpointConfig::Udp(config) => config.log_traffic,
            EndpointConfig::MulticastUdp(config) => config.log_traffic,
            EndpointConfig::Dtls(config) => config.log_traffic,
            EndpointConfig::TcpServer(config)
            | EndpointConfig::TcpClient(config)
            | EndpointConfig::TlsServer(config)
            | EndpointConfig::TlsClient(config) => config.log_traffic,
        }
    }

    /// Local address a datagram endpoint binds, or `None` for stream kinds.
    pub fn datagram_bind(&self) -> Option<(IpAddr, u16)> {
        match self {
            EndpointConfig::Udp(config) => Some((config.bind_address, config.port)),
            EndpointConfig::MulticastUdp(config) => Some((config.bind_address, config.port)),
            EndpointConfig::Dtls(config) => Some((config.bind_address, config.port)),
            EndpointConfig::TcpServer(_)
            | EndpointConfig::TcpClient(_)
            | EndpointConfig::TlsServer(_)
            | EndpointConfig::TlsClient(_) => None,
        }
    }

    /// Convenience constructor for a plain UDP endpoint.
    pub fn udp(config_name: &str, bind_address: IpAddr, port: u16) -> Self {
        EndpointConfig::Udp(UdpEndpointConfig::new(config_name, bind_address, port))
    }

    /// Returns the same configuration with traffic logging switched on or off.
    pub fn with_log_traffic(mut self, log_traffic: bool) -> Self {
        match &mut self {
            EndpointConfig::Udp(config) => config.log_traffic = log_traffic,
            EndpointConfig::MulticastUdp(config) => config.log_traffic = log_traffic,
            EndpointConfig::Dtls(config) => config.log_traffic = log_traffic,
            EndpointConfig::TcpServer(config)
            | EndpointConfig::TcpClient(config)
            | EndpointConfig::TlsServer(config)
            | EndpointConfig::TlsClient(config) => config.log_traffic = log_traffic,
        }
        self
    }
}
