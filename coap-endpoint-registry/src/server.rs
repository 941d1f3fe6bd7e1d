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

use crate::endpoint::OperationalEndpoint;
use crate::endpoint_config::EndpointConfig;
use crate::error::{EndpointRegistryError, TransportError};
use crate::executors::EndpointExecutors;
use crate::handles::ServerHandle;
use crate::observability::events;
use crate::registry::EndpointRegistry;
use crate::transport::InboundDatagram;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

const COMPONENT: &str = "coap_server";

///
/// [`CoapServer`] owns one endpoint of the registry for as long as it runs.
///
/// Starting a server claims the endpoint for its configuration name and runs it on the
/// server's executors. Another server asking for the same name is refused until this
/// one is stopped. Clients may keep using the endpoint after the server stops.
pub struct CoapServer {
    handle: ServerHandle,
    registry: Arc<EndpointRegistry>,
    endpoint: Arc<OperationalEndpoint>,
}

impl CoapServer {
    pub async fn start(
        registry: Arc<EndpointRegistry>,
        name: &str,
        config: &EndpointConfig,
        executors: &EndpointExecutors,
    ) -> Result<Self, EndpointRegistryError> {
        let handle = ServerHandle::new(name);
        let endpoint = registry.get_or_create_for_server(&handle, config).await?;

        if let Err(err) = registry
            .set_server_executors(&handle, &endpoint, executors)
            .await
        {
            registry.dispose_server(&handle).await;
            return Err(err);
        }

        info!(
            event = events::SERVER_START,
            component = COMPONENT,
            server = %handle,
            config_name = endpoint.config_name(),
            endpoint_name = endpoint.endpoint_name(),
            "server started"
        );

        Ok(Self {
            handle,
            registry,
            endpoint,
        })
    }

    pub fn handle(&self) -> &ServerHandle {
        &self.handle
    }

    pub fn endpoint(&self) -> &Arc<OperationalEndpoint> {
        &self.endpoint
    }

    /// Datagrams arriving on the server's endpoint.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundDatagram> {
        self.endpoint.transport().subscribe()
    }

    /// Sends a response datagram to `peer`.
    pub async fn respond(&self, datagram: &[u8], peer: SocketAddr) -> Result<(), TransportError> {
        self.endpoint.transport().send_to(datagram, peer).await
    }

    /// Releases the endpoint. It is destroyed if no client still uses it.
    pub async fn stop(self) {
        self.registry.dispose_server(&self.handle).await;
        info!(
            event = events::SERVER_STOP,
            component = COMPONENT,
            server = %self.handle,
            config_name = self.endpoint.config_name(),
            "server stopped"
        );
    }
}
