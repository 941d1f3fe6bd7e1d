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

use crate::endpoint_config::EndpointConfig;
use crate::error::EndpointBuildError;
use crate::transport::{
    CoapTransport, DatagramTransport, DtlsEndpointBuilder, MulticastUdpEndpointBuilder,
    UdpEndpointBuilder,
};
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Result of building a network endpoint: its derived name and the bound transport.
pub struct BuiltEndpoint {
    pub endpoint_name: String,
    pub transport: Arc<dyn CoapTransport>,
}

impl BuiltEndpoint {
    pub fn new(endpoint_name: impl Into<String>, transport: Arc<dyn CoapTransport>) -> Self {
        Self {
            endpoint_name: endpoint_name.into(),
            transport,
        }
    }
}

impl Debug for BuiltEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltEndpoint")
            .field("endpoint_name", &self.endpoint_name)
            .field("local_addr", &self.transport.local_addr())
            .finish_non_exhaustive()
    }
}

impl From<(String, DatagramTransport)> for BuiltEndpoint {
    fn from((endpoint_name, transport): (String, DatagramTransport)) -> Self {
        Self::new(endpoint_name, Arc::new(transport))
    }
}

/// [`EndpointFactory`] turns an endpoint configuration into a bound transport.
///
/// The [`EndpointRegistry`][crate::EndpointRegistry] calls it at most once per
/// live configuration name, with the registry lock held.
///
/// # Examples
///
/// ## `impl`ing the [`EndpointFactory`] trait
///
/// ```
/// use async_trait::async_trait;
/// use coap_endpoint_registry::{
///     BuiltEndpoint, EndpointBuildError, EndpointConfig, EndpointFactory, SocketEndpointFactory,
/// };
///
/// /// Only allows endpoints whose name starts with `lab-`.
/// struct LabOnlyFactory {
///     inner: SocketEndpointFactory,
/// }
///
/// #[async_trait]
/// impl EndpointFactory for LabOnlyFactory {
///     async fn build(&self, config: &EndpointConfig) -> Result<BuiltEndpoint, EndpointBuildError> {
///         if !config.config_name().starts_with("lab-") {
///             return Err(EndpointBuildError::InvalidParameter(
///                 "only lab endpoints are allowed".to_string(),
///             ));
///         }
///         self.inner.build(config).await
///     }
/// }
/// ```
#[async_trait]
pub trait EndpointFactory: Send + Sync {
    async fn build(&self, config: &EndpointConfig) -> Result<BuiltEndpoint, EndpointBuildError>;
}

/// Socket-backed factory for the UDP, multicast UDP and DTLS variants.
///
/// TCP and TLS variants are rejected with
/// [`EndpointBuildError::UnsupportedVariant`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SocketEndpointFactory {
    udp: UdpEndpointBuilder,
    multicast: MulticastUdpEndpointBuilder,
    dtls: DtlsEndpointBuilder,
}

impl SocketEndpointFactory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EndpointFactory for SocketEndpointFactory {
    async fn build(&self, config: &EndpointConfig) -> Result<BuiltEndpoint, EndpointBuildError> {
        match config {
            EndpointConfig::Udp(udp) => self.udp.build(udp).await.map(BuiltEndpoint::from),
            EndpointConfig::MulticastUdp(multicast) => self
                .multicast
                .build(multicast)
                .await
                .map(BuiltEndpoint::from),
            EndpointConfig::Dtls(dtls) => self.dtls.build(dtls).await.map(BuiltEndpoint::from),
            EndpointConfig::TcpServer(_)
            | EndpointConfig::TcpClient(_)
            | EndpointConfig::TlsServer(_)
            | EndpointConfig::TlsClient(_) => {
                Err(EndpointBuildError::UnsupportedVariant(config.kind()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EndpointFactory, SocketEndpointFactory};
    use crate::endpoint_config::{EndpointConfig, EndpointKind, StreamEndpointConfig};
    use crate::error::EndpointBuildError;
    use std::net::IpAddr;

    fn stream_config() -> StreamEndpointConfig {
        StreamEndpointConfig {
            config_name: "stream".to_string(),
            host: "localhost".to_string(),
            port: 5683,
            log_traffic: false,
        }
    }

    #[tokio::test]
    async fn stream_variants_are_unsupported() {
        let factory = SocketEndpointFactory::new();
        let configs = [
            (EndpointConfig::TcpServer(stream_config()), EndpointKind::TcpServer),
            (EndpointConfig::TcpClient(stream_config()), EndpointKind::TcpClient),
            (EndpointConfig::TlsServer(stream_config()), EndpointKind::TlsServer),
            (EndpointConfig::TlsClient(stream_config()), EndpointKind::TlsClient),
        ];

        for (config, expected_kind) in configs {
            let result = factory.build(&config).await;
            assert!(matches!(
                result,
                Err(EndpointBuildError::UnsupportedVariant(kind)) if kind == expected_kind
            ));
        }
    }

    #[tokio::test]
    async fn udp_variant_builds_a_transport() {
        let factory = SocketEndpointFactory::new();
        let config = EndpointConfig::udp("local", IpAddr::from([127, 0, 0, 1]), 0);

        let built = factory.build(&config).await.expect("udp should build");

        assert!(built.endpoint_name.starts_with("coap://127.0.0.1:"));
        assert!(!built.transport.is_closed());
    }
}
