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

use crate::endpoint_config::EndpointKind;
use crate::transport::CoapTransport;
use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;
use std::sync::Arc;

///
/// [`OperationalEndpoint`] is one live network endpoint, shared by every server and
/// client whose configuration carries the same `config_name`.
///
/// Instances are handed out by the [`EndpointRegistry`][crate::EndpointRegistry], which
/// alone decides when the underlying transport is destroyed.
///
/// # Examples
///
/// ```
/// use std::net::IpAddr;
/// use coap_endpoint_registry::{ClientHandle, CoapTransport, EndpointConfig, EndpointRegistry};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let registry = EndpointRegistry::with_default_factory();
/// let client = ClientHandle::new("sensor-poller");
/// let config = EndpointConfig::udp("sensors", IpAddr::from([127, 0, 0, 1]), 0);
///
/// let endpoint = registry
///     .get_or_create_for_client(Some(&client), &config)
///     .await
///     .unwrap();
/// assert_eq!(endpoint.config_name(), "sensors");
/// assert!(endpoint.endpoint_name().starts_with("coap://127.0.0.1:"));
///
/// registry.dispose_client(&client).await;
/// assert!(endpoint.transport().is_closed());
/// # });
/// ```
pub struct OperationalEndpoint {
    config_name: String,
    endpoint_name: String,
    kind: EndpointKind,
    transport: Arc<dyn CoapTransport>,
}

impl OperationalEndpoint {
    pub(crate) fn new(
        config_name: &str,
        endpoint_name: String,
        kind: EndpointKind,
        transport: Arc<dyn CoapTransport>,
    ) -> Self {
        Self {
            config_name: config_name.to_string(),
            endpoint_name,
            kind,
            transport,
        }
    }

    pub fn config_name(&self) -> &str {
        &self.config_name
    }

    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn transport(&self) -> &Arc<dyn CoapTransport> {
        &self.transport
    }
}

impl Debug for OperationalEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationalEndpoint")
            .field("config_name", &self.config_name)
            .field("endpoint_name", &self.endpoint_name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
