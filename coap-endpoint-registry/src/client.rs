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
use crate::handles::ClientHandle;
use crate::observability::events;
use crate::registry::EndpointRegistry;
use crate::transport::InboundDatagram;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

const COMPONENT: &str = "coap_client";

///
/// [`CoapClient`] uses a shared endpoint of the registry to reach remote peers.
///
/// Clients never take ownership of an endpoint. When a server already holds it, the
/// client rides on the server's executors; otherwise the first client to start it
/// injects its own.
///
/// # Examples
///
/// ```
/// use std::net::IpAddr;
/// use std::sync::Arc;
/// use coap_endpoint_registry::{CoapClient, EndpointConfig, EndpointExecutors, EndpointRegistry};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let registry = Arc::new(EndpointRegistry::with_default_factory());
/// let executors = EndpointExecutors::try_current().unwrap();
/// let config = EndpointConfig::udp("uplink", IpAddr::from([127, 0, 0, 1]), 0);
///
/// let client = CoapClient::start(registry.clone(), "poller", &config, &executors)
///     .await
///     .unwrap();
/// assert_eq!(registry.find_by_client(client.handle()).await, vec!["uplink"]);
///
/// client.stop().await;
/// assert!(registry.is_empty().await);
/// # });
/// ```
pub struct CoapClient {
    handle: ClientHandle,
    registry: Arc<EndpointRegistry>,
    endpoint: Arc<OperationalEndpoint>,
}

impl CoapClient {
    pub async fn start(
        registry: Arc<EndpointRegistry>,
        name: &str,
        config: &EndpointConfig,
        executors: &EndpointExecutors,
    ) -> Result<Self, EndpointRegistryError> {
        let handle = ClientHandle::new(name);
        let endpoint = registry
            .get_or_create_for_client(Some(&handle), config)
            .await?;

        let injected = registry.set_executors_if_needed(&endpoint, executors).await;

        info!(
            event = events::CLIENT_START,
            component = COMPONENT,
            client = %handle,
            config_name = endpoint.config_name(),
            endpoint_name = endpoint.endpoint_name(),
            executors_injected = injected,
            "client started"
        );

        Ok(Self {
            handle,
            registry,
            endpoint,
        })
    }

    pub fn handle(&self) -> &ClientHandle {
        &self.handle
    }

    pub fn endpoint(&self) -> &Arc<OperationalEndpoint> {
        &self.endpoint
    }

    pub async fn send(&self, datagram: &[u8], peer: SocketAddr) -> Result<(), TransportError> {
        debug!(
            event = events::CLIENT_SEND,
            component = COMPONENT,
            client = %self.handle,
            peer = %peer,
            len = datagram.len(),
            "sending datagram"
        );
        self.endpoint.transport().send_to(datagram, peer).await
    }

    /// Datagrams arriving on the shared endpoint, including those meant for other users.
    pub fn subscribe(&self) -> broadcast::Receiver<InboundDatagram> {
        self.endpoint.transport().subscribe()
    }

    pub async fn stop(self) {
        self.registry.dispose_client(&self.handle).await;
        info!(
            event = events::CLIENT_STOP,
            component = COMPONENT,
            client = %self.handle,
            config_name = self.endpoint.config_name(),
            "client stopped"
        );
    }
}
