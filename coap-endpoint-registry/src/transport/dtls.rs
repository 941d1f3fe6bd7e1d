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

//! DTLS endpoint builder.
//!
//! Validates the configured credentials and binds the datagram socket the DTLS
//! session layer runs on. The resulting endpoint is named with the `coaps`
//! scheme and carries its [`DtlsCredentials`].

use crate::endpoint_config::{DtlsEndpointConfig, DtlsSecurity};
use crate::error::EndpointBuildError;
use crate::transport::DatagramTransport;
use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::UdpSocket;

pub const COAPS_SCHEME: &str = "coaps";

/// Validated DTLS credentials.
#[derive(Clone, PartialEq)]
pub enum DtlsCredentials {
    PreSharedKey {
        identity: String,
        key: Vec<u8>,
    },
    Certificate {
        certificate_file: PathBuf,
        private_key_file: PathBuf,
        trust_store_file: Option<PathBuf>,
    },
}

impl Debug for DtlsCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DtlsCredentials::PreSharedKey { identity, key } => f
                .debug_struct("PreSharedKey")
                .field("identity", identity)
                .field("key_len", &key.len())
                .finish_non_exhaustive(),
            DtlsCredentials::Certificate {
                certificate_file,
                private_key_file,
                trust_store_file,
            } => f
                .debug_struct("Certificate")
                .field("certificate_file", certificate_file)
                .field("private_key_file", private_key_file)
                .field("trust_store_file", trust_store_file)
                .finish(),
        }
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, EndpointBuildError> {
    let value = value.trim();
    if value.is_empty() || value.len() % 2 != 0 {
        return Err(EndpointBuildError::InvalidParameter(
            "pre-shared key must be a non-empty, even-length hex string".to_string(),
        ));
    }

    (0..value.len())
        .step_by(2)
        .map(|index| {
            value
                .get(index..index + 2)
                .filter(|pair| pair.bytes().all(|byte| byte.is_ascii_hexdigit()))
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| {
                    EndpointBuildError::InvalidParameter(format!(
                        "pre-shared key has a non-hex digit near offset {index}"
                    ))
                })
        })
        .collect()
}

fn require_file(role: &str, path: &Path) -> Result<(), EndpointBuildError> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => Ok(()),
        Ok(_) => Err(EndpointBuildError::InvalidParameter(format!(
            "{role} {} is not a file",
            path.display()
        ))),
        Err(err) => Err(EndpointBuildError::InvalidParameter(format!(
            "{role} {} is not readable: {err}",
            path.display()
        ))),
    }
}

impl DtlsCredentials {
    pub fn from_security(security: &DtlsSecurity) -> Result<Self, EndpointBuildError> {
        match security {
            DtlsSecurity::PreSharedKey { identity, key_hex } => {
                if identity.trim().is_empty() {
                    return Err(EndpointBuildError::InvalidParameter(
                        "pre-shared key identity must not be empty".to_string(),
                    ));
                }
                Ok(DtlsCredentials::PreSharedKey {
                    identity: identity.clone(),
                    key: decode_hex(key_hex)?,
                })
            }
            DtlsSecurity::Certificate {
                certificate_file,
                private_key_file,
                trust_store_file,
            } => {
                require_file("certificate", certificate_file)?;
                require_file("private key", private_key_file)?;
                if let Some(trust_store_file) = trust_store_file {
                    require_file("trust store", trust_store_file)?;
                }
                Ok(DtlsCredentials::Certificate {
                    certificate_file: certificate_file.clone(),
                    private_key_file: private_key_file.clone(),
                    trust_store_file: trust_store_file.clone(),
                })
            }
        }
    }
}

/// Builds DTLS endpoints from [`DtlsEndpointConfig`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DtlsEndpointBuilder;

impl DtlsEndpointBuilder {
    pub async fn build(
        &self,
        config: &DtlsEndpointConfig,
    ) -> Result<(String, DatagramTransport), EndpointBuildError> {
        let credentials = DtlsCredentials::from_security(&config.security)?;

        let socket = UdpSocket::bind(SocketAddr::new(config.bind_address, config.port))
            .await
            .map_err(EndpointBuildError::Bind)?;
        let local_addr = socket.local_addr().map_err(EndpointBuildError::Bind)?;
        let endpoint_name = format!("{COAPS_SCHEME}://{local_addr}");

        let transport = DatagramTransport::new(endpoint_name.clone(), socket, Some(credentials))
            .map_err(EndpointBuildError::Bind)?;
        Ok((endpoint_name, transport))
    }
}
