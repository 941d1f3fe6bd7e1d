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

//! Plain and multicast UDP endpoint builders.

use crate::endpoint_config::{MulticastUdpEndpointConfig, UdpEndpointConfig};
use crate::error::EndpointBuildError;
use crate::observability::events;
use crate::transport::DatagramTransport;
use std::net::{IpAddr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

pub const COAP_SCHEME: &str = "coap";
const COMPONENT: &str = "udp_builder";

/// Builds unicast UDP endpoints from [`UdpEndpointConfig`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpEndpointBuilder;

impl UdpEndpointBuilder {
    pub async fn build(
        &self,
        config: &UdpEndpointConfig,
    ) -> Result<(String, DatagramTransport), EndpointBuildError> {
        let socket = UdpSocket::bind(SocketAddr::new(config.bind_address, config.port))
            .await
            .map_err(EndpointBuildError::Bind)?;
        let local_addr = socket.local_addr().map_err(EndpointBuildError::Bind)?;
        let endpoint_name = format!("{COAP_SCHEME}://{local_addr}");

        let transport = DatagramTransport::new(endpoint_name.clone(), socket, None)
            .map_err(EndpointBuildError::Bind)?;
        Ok((endpoint_name, transport))
    }
}

/// Builds endpoints that receive datagrams addressed to a multicast group.
#[derive(Clone, Copy, Debug, Default)]
pub struct MulticastUdpEndpointBuilder;

impl MulticastUdpEndpointBuilder {
    fn validate(config: &MulticastUdpEndpointConfig) -> Result<(), EndpointBuildError> {
        if !config.group_address.is_multicast() {
            return Err(EndpointBuildError::InvalidParameter(format!(
                "{} is not a multicast group address",
                config.group_address
            )));
        }
        if config.group_address.is_ipv4() != config.bind_address.is_ipv4() {
            return Err(EndpointBuildError::InvalidParameter(format!(
                "group {} and bind address {} belong to different address families",
                config.group_address, config.bind_address
            )));
        }
        Ok(())
    }

    pub async fn build(
        &self,
        config: &MulticastUdpEndpointConfig,
    ) -> Result<(String, DatagramTransport), EndpointBuildError> {
        Self::validate(config)?;

        let socket = UdpSocket::bind(SocketAddr::new(config.bind_address, config.port))
            .await
            .map_err(EndpointBuildError::Bind)?;

        match (config.group_address, config.interface_address) {
            (IpAddr::V4(group), IpAddr::V4(interface)) => {
                socket
                    .join_multicast_v4(group, interface)
                    .map_err(EndpointBuildError::Multicast)?;
                socket
                    .set_multicast_loop_v4(true)
                    .map_err(EndpointBuildError::Multicast)?;
            }
            (IpAddr::V6(group), _) => {
                socket
                    .join_multicast_v6(&group, 0)
                    .map_err(EndpointBuildError::Multicast)?;
                socket
                    .set_multicast_loop_v6(true)
                    .map_err(EndpointBuildError::Multicast)?;
            }
            (IpAddr::V4(_), IpAddr::V6(_)) => {
                return Err(EndpointBuildError::InvalidParameter(
                    "IPv4 group needs an IPv4 interface address".to_string(),
                ))
            }
        }

        let local_addr = socket.local_addr().map_err(EndpointBuildError::Bind)?;
        let endpoint_name = format!(
            "{COAP_SCHEME}://{}",
            SocketAddr::new(config.group_address, local_addr.port())
        );

        debug!(
            event = events::TRANSPORT_MULTICAST_JOIN,
            component = COMPONENT,
            endpoint_name = %endpoint_name,
            group = %config.group_address,
            interface = %config.interface_address,
            "joined multicast group"
        );

        let transport = DatagramTransport::new(endpoint_name.clone(), socket, None)
            .map_err(EndpointBuildError::Bind)?;
        Ok((endpoint_name, transport))
    }
}

#[cfg(test)]
mod tests {
    use super::{MulticastUdpEndpointBuilder, UdpEndpointBuilder};
    use crate::endpoint_config::{MulticastUdpEndpointConfig, UdpEndpointConfig};
    use crate::error::EndpointBuildError;
    use crate::transport::CoapTransport;
    use std::net::IpAddr;

    fn multicast_config(group: IpAddr) -> MulticastUdpEndpointConfig {
        MulticastUdpEndpointConfig {
            config_name: "group".to_string(),
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: 0,
            group_address: group,
            interface_address: IpAddr::from([0, 0, 0, 0]),
            log_traffic: false,
        }
    }

    #[tokio::test]
    async fn udp_endpoint_name_reflects_bound_port() {
        let config = UdpEndpointConfig::new("local", IpAddr::from([127, 0, 0, 1]), 0);

        let (endpoint_name, transport) = UdpEndpointBuilder
            .build(&config)
            .await
            .expect("udp endpoint should bind");

        let local_addr = transport.local_addr().expect("bound address");
        assert_ne!(local_addr.port(), 0);
        assert_eq!(endpoint_name, format!("coap://{local_addr}"));
    }

    #[tokio::test]
    async fn udp_bind_conflict_is_a_bind_error() {
        let first = UdpEndpointBuilder
            .build(&UdpEndpointConfig::new(
                "first",
                IpAddr::from([127, 0, 0, 1]),
                0,
            ))
            .await
            .expect("first endpoint should bind");
        let taken_port = first.1.local_addr().expect("bound address").port();

        let err = UdpEndpointBuilder
            .build(&UdpEndpointConfig::new(
                "second",
                IpAddr::from([127, 0, 0, 1]),
                taken_port,
            ))
            .await
            .expect_err("port is already taken");

        assert!(matches!(err, EndpointBuildError::Bind(_)));
    }

    #[tokio::test]
    async fn multicast_rejects_unicast_group() {
        let err = MulticastUdpEndpointBuilder
            .build(&multicast_config(IpAddr::from([10, 0, 0, 1])))
            .await
            .expect_err("unicast group must be rejected");

        assert!(matches!(err, EndpointBuildError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn multicast_rejects_mixed_address_families() {
        let mut config = multicast_config("ff02::fd".parse().expect("valid group"));
        config.bind_address = IpAddr::from([0, 0, 0, 0]);

        let err = MulticastUdpEndpointBuilder
            .build(&config)
            .await
            .expect_err("mixed families must be rejected");

        assert!(matches!(err, EndpointBuildError::InvalidParameter(_)));
    }
}
