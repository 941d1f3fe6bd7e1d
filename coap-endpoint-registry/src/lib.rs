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

//! # coap-endpoint-registry
//!
//! `coap-endpoint-registry` lets several CoAP servers and clients share one network
//! endpoint per configuration name.
//!
//! Typical usage is centered on [`EndpointRegistry`], with [`CoapServer`] and
//! [`CoapClient`] as thin facades that acquire, start and release endpoints.
//!
//! ## Ownership rules
//!
//! - An endpoint is created on first use of its `config_name` and destroyed once neither
//!   a server nor any client holds it.
//! - At most one server holds an endpoint. A second server is refused with
//!   [`EndpointRegistryError::ServerConflict`].
//! - Clients share endpoints freely, with or without a server.
//! - A server runs its endpoint on its own executors, taking it over from a client that
//!   started it earlier. A client-only endpoint runs on the executors of the first
//!   client that asks.
//!
//! ```
//! use std::net::IpAddr;
//! use std::sync::Arc;
//! use coap_endpoint_registry::{
//!     CoapClient, CoapServer, EndpointConfig, EndpointExecutors, EndpointRegistry,
//!     EndpointRegistryError,
//! };
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let registry = Arc::new(EndpointRegistry::with_default_factory());
//! let executors = EndpointExecutors::try_current().unwrap();
//! let config = EndpointConfig::udp("gateway", IpAddr::from([127, 0, 0, 1]), 0);
//!
//! let server = CoapServer::start(registry.clone(), "north", &config, &executors)
//!     .await
//!     .unwrap();
//! let client = CoapClient::start(registry.clone(), "poller", &config, &executors)
//!     .await
//!     .unwrap();
//! assert!(Arc::ptr_eq(server.endpoint(), client.endpoint()));
//!
//! let refused = CoapServer::start(registry.clone(), "south", &config, &executors).await;
//! assert!(matches!(refused, Err(EndpointRegistryError::ServerConflict { .. })));
//!
//! server.stop().await;
//! assert!(registry.contains("gateway").await);
//! client.stop().await;
//! assert!(registry.is_empty().await);
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Configuration: serde model of every endpoint variant
//! - Factory: variant dispatch from configuration to a bound transport
//! - Transport: datagram sockets, receive loops and traffic interceptors
//! - Registry: ownership bookkeeping and endpoint lifecycle
//! - Facades: `CoapServer` / `CoapClient`
//!
//! ## Observability model
//!
//! The crate uses `tracing` for logs/events, keyed by the constants in
//! `observability::events` and `observability::fields`.
//! Library code never installs a global subscriber. Binaries and tests are responsible
//! for one-time `tracing_subscriber` initialization.

mod client;
pub use client::CoapClient;

mod endpoint;
pub use endpoint::OperationalEndpoint;

mod endpoint_config;
pub use endpoint_config::{
    DtlsEndpointConfig, DtlsSecurity, EndpointConfig, EndpointKind, MulticastUdpEndpointConfig,
    StreamEndpointConfig, UdpEndpointConfig, DEFAULT_COAPS_PORT, DEFAULT_COAP_PORT,
};

mod error;
pub use error::{EndpointBuildError, EndpointRegistryError, TransportError};

mod executors;
pub use executors::{EndpointExecutors, ExecutorPool};

mod factory;
pub use factory::{BuiltEndpoint, EndpointFactory, SocketEndpointFactory};

mod handles;
pub use handles::{ClientHandle, ServerHandle};

mod interceptor;
pub use interceptor::{
    CoapHeaderSummary, CoapMessageType, MessageInterceptor, MessageTracer, TrafficDirection,
    TrafficRecord,
};

#[doc(hidden)]
pub mod observability;

mod registry;
pub use registry::{EndpointRegistry, EndpointUsage};

mod server;
pub use server::CoapServer;

mod transport;
pub use transport::{
    CoapTransport, DatagramTransport, DtlsCredentials, DtlsEndpointBuilder, InboundDatagram,
    MulticastUdpEndpointBuilder, UdpEndpointBuilder,
};
