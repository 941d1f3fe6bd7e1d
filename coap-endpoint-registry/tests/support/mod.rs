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

use coap_endpoint_registry::{EndpointConfig, OperationalEndpoint};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;

pub(crate) const RECEIVE_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) fn loopback_udp(config_name: &str) -> EndpointConfig {
    EndpointConfig::udp(config_name, IpAddr::from([127, 0, 0, 1]), 0)
}

pub(crate) async fn bind_peer() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("peer socket should bind")
}

pub(crate) fn endpoint_addr(endpoint: &OperationalEndpoint) -> SocketAddr {
    endpoint
        .local_addr()
        .expect("socket-backed endpoints report their address")
}

#[allow(dead_code)]
pub(crate) async fn peer_receive(peer: &UdpSocket) -> (Vec<u8>, SocketAddr) {
    let mut buffer = [0u8; 1500];
    let (len, from) = tokio::time::timeout(RECEIVE_TIMEOUT, peer.recv_from(&mut buffer))
        .await
        .expect("peer should receive before timeout")
        .expect("peer receive should succeed");
    (buffer[..len].to_vec(), from)
}

/// Loopback endpoint on a port that was free a moment ago.
#[allow(dead_code)]
pub(crate) fn fixed_port_udp(config_name: &str) -> EndpointConfig {
    let ephemeral =
        std::net::UdpSocket::bind("127.0.0.1:0").expect("ephemeral socket should bind");
    let port = ephemeral
        .local_addr()
        .expect("ephemeral socket has an address")
        .port();
    drop(ephemeral);
    EndpointConfig::udp(config_name, IpAddr::from([127, 0, 0, 1]), port)
}
