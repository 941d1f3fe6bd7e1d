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

//! Error types for endpoint construction, transports and the registry.

use crate::endpoint_config::EndpointKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

/// Failures raised while building a network endpoint from its configuration.
#[derive(Debug)]
pub enum EndpointBuildError {
    UnsupportedVariant(EndpointKind),
    InvalidParameter(String),
    Bind(io::Error),
    Multicast(io::Error),
}

impl Display for EndpointBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointBuildError::UnsupportedVariant(kind) => {
                write!(f, "{kind} endpoints are not supported yet")
            }
            EndpointBuildError::InvalidParameter(reason) => {
                write!(f, "invalid endpoint parameter: {reason}")
            }
            EndpointBuildError::Bind(err) => write!(f, "unable to bind socket: {err}"),
            EndpointBuildError::Multicast(err) => {
                write!(f, "unable to join multicast group: {err}")
            }
        }
    }
}

impl Error for EndpointBuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EndpointBuildError::Bind(err) | EndpointBuildError::Multicast(err) => Some(err),
            _ => None,
        }
    }
}

/// Failures raised by a constructed transport.
#[derive(Debug)]
pub enum TransportError {
    Closed,
    Io(io::Error),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Closed => write!(f, "transport is closed"),
            TransportError::Io(err) => write!(f, "transport io error: {err}"),
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TransportError::Io(err) => Some(err),
            TransportError::Closed => None,
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::Io(err)
    }
}

/// Failures surfaced by [`EndpointRegistry`][crate::EndpointRegistry] operations.
///
/// Every variant carries the configuration name so callers can report which
/// endpoint could not be started.
#[derive(Debug)]
pub enum EndpointRegistryError {
    UnsupportedVariant {
        config_name: String,
        kind: EndpointKind,
    },
    ServerConflict {
        config_name: String,
        current_server: String,
        requested_server: String,
    },
    MissingClient {
        config_name: String,
    },
    InvalidConfiguration {
        config_name: String,
        reason: String,
    },
    Construction {
        config_name: String,
        kind: EndpointKind,
        source: EndpointBuildError,
    },
    NotOwner {
        config_name: String,
    },
}

impl EndpointRegistryError {
    pub fn config_name(&self) -> &str {
        match self {
            EndpointRegistryError::UnsupportedVariant { config_name, .. }
            | EndpointRegistryError::ServerConflict { config_name, .. }
            | EndpointRegistryError::MissingClient { config_name }
            | EndpointRegistryError::InvalidConfiguration { config_name, .. }
            | EndpointRegistryError::Construction { config_name, .. }
            | EndpointRegistryError::NotOwner { config_name } => config_name,
        }
    }

    pub(crate) fn from_build_error(
        config_name: &str,
        kind: EndpointKind,
        err: EndpointBuildError,
    ) -> Self {
        match err {
            EndpointBuildError::UnsupportedVariant(kind) => {
                EndpointRegistryError::UnsupportedVariant {
                    config_name: config_name.to_string(),
                    kind,
                }
            }
            source => EndpointRegistryError::Construction {
                config_name: config_name.to_string(),
                kind,
                source,
            },
        }
    }
}

impl Display for EndpointRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EndpointRegistryError::UnsupportedVariant { config_name, kind } => write!(
                f,
                "cannot create endpoint {config_name}: {kind} endpoints are not supported yet"
            ),
            EndpointRegistryError::ServerConflict {
                config_name,
                current_server,
                requested_server,
            } => write!(
                f,
                "cannot create endpoint {config_name} for server {requested_server}: \
                 endpoint already in use by server {current_server}"
            ),
            EndpointRegistryError::MissingClient { config_name } => {
                write!(f, "cannot create endpoint {config_name}: no client given")
            }
            EndpointRegistryError::InvalidConfiguration {
                config_name,
                reason,
            } => write!(f, "invalid endpoint configuration {config_name:?}: {reason}"),
            EndpointRegistryError::Construction {
                config_name,
                kind,
                source,
            } => write!(
                f,
                "cannot create {kind} endpoint {config_name}: {source}"
            ),
            EndpointRegistryError::NotOwner { config_name } => write!(
                f,
                "endpoint {config_name} is not held by the requesting server"
            ),
        }
    }
}

impl Error for EndpointRegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EndpointRegistryError::Construction { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EndpointBuildError, EndpointRegistryError};
    use crate::endpoint_config::EndpointKind;
    use std::error::Error;
    use std::io;

    #[test]
    fn unsupported_build_error_maps_to_unsupported_variant() {
        let error = EndpointRegistryError::from_build_error(
            "tcp-endpoint",
            EndpointKind::TcpServer,
            EndpointBuildError::UnsupportedVariant(EndpointKind::TcpServer),
        );

        assert!(matches!(
            error,
            EndpointRegistryError::UnsupportedVariant {
                kind: EndpointKind::TcpServer,
                ..
            }
        ));
        assert_eq!(error.config_name(), "tcp-endpoint");
        assert!(error.to_string().contains("not supported yet"));
        assert!(error.source().is_none());
    }

    #[test]
    fn construction_error_exposes_context_and_source() {
        let error = EndpointRegistryError::from_build_error(
            "udp-endpoint",
            EndpointKind::Udp,
            EndpointBuildError::Bind(io::Error::new(io::ErrorKind::AddrInUse, "in use")),
        );

        let message = error.to_string();
        assert!(message.contains("udp-endpoint"));
        assert!(message.contains("udp"));
        assert!(error.source().is_some());
    }

    #[test]
    fn server_conflict_names_both_servers() {
        let error = EndpointRegistryError::ServerConflict {
            config_name: "shared".to_string(),
            current_server: "first".to_string(),
            requested_server: "second".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "cannot create endpoint shared for server second: endpoint already in use by server first"
        );
    }
}
