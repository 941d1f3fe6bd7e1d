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

//! Network transports backing operational endpoints.
//!
//! A transport is a bound datagram carrier. Message layer concerns (CoAP
//! retransmission, blockwise transfer, observe, the DTLS record layer) sit on
//! top of it and are not handled here.

use crate::error::TransportError;
use crate::executors::EndpointExecutors;
use crate::interceptor::MessageInterceptor;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;

mod datagram;
mod dtls;
mod udp;

pub use datagram::DatagramTransport;
pub use dtls::{DtlsCredentials, DtlsEndpointBuilder};
pub use udp::{MulticastUdpEndpointBuilder, UdpEndpointBuilder};

/// A datagram received on a transport.
#[derive(Clone, Debug)]
pub struct InboundDatagram {
    pub peer: SocketAddr,
    pub payload: Arc<[u8]>,
}

/// Transport handle owned by an operational endpoint.
///
/// Only the registry destroys transports; servers and clients use the send and
/// subscribe paths.
#[async_trait]
pub trait CoapTransport: Send + Sync {
    fn local_addr(&self) -> Option<SocketAddr>;

    async fn send_to(&self, datagram: &[u8], peer: SocketAddr) -> Result<(), TransportError>;

    fn subscribe(&self) -> broadcast::Receiver<InboundDatagram>;

    fn add_interceptor(&self, interceptor: Arc<dyn MessageInterceptor>);

    /// Starts the transport on the given executors. Returns `false` when the
    /// transport already runs or is closed.
    fn set_executors(&self, executors: &EndpointExecutors) -> bool;

    /// Moves a running transport onto other executors, starting it if it was idle.
    /// Returns `false` when the transport is closed.
    async fn rebind_executors(&self, executors: &EndpointExecutors) -> bool;

    fn is_closed(&self) -> bool;

    /// Closes the transport and releases its socket before returning.
    /// Further calls are no-ops.
    async fn destroy(&self);
}
