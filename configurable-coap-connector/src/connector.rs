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

use crate::config::Config;
use crate::responders;
use coap_endpoint_registry::{CoapClient, CoapServer, EndpointExecutors, EndpointRegistry};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const COMPONENT: &str = "connector";

/// Servers, clients and their background tasks started from one [`Config`].
pub(crate) struct Connector {
    registry: Arc<EndpointRegistry>,
    servers: Vec<CoapServer>,
    clients: Vec<CoapClient>,
    tasks: Vec<JoinHandle<()>>,
}

impl Connector {
    /// Starts every configured server, then every client.
    ///
    /// When any of them fails to start, the ones already running are stopped again
    /// before the error is returned.
    pub(crate) async fn start(
        registry: Arc<EndpointRegistry>,
        config: &Config,
        executors: &EndpointExecutors,
    ) -> Result<Self, Box<dyn Error>> {
        let mut connector = Self {
            registry,
            servers: Vec::with_capacity(config.servers.len()),
            clients: Vec::with_capacity(config.clients.len()),
            tasks: Vec::new(),
        };

        if let Err(err) = connector.launch(config, executors).await {
            warn!(
                component = COMPONENT,
                err = %err,
                servers = connector.servers.len(),
                clients = connector.clients.len(),
                "startup failed, stopping what already runs"
            );
            connector.stop().await;
            return Err(err);
        }

        info!(
            component = COMPONENT,
            servers = connector.servers.len(),
            clients = connector.clients.len(),
            endpoints = connector.registry.len().await,
            "connector started"
        );
        Ok(connector)
    }

    async fn launch(
        &mut self,
        config: &Config,
        executors: &EndpointExecutors,
    ) -> Result<(), Box<dyn Error>> {
        for server_config in &config.servers {
            let endpoint_config = config
                .endpoint(&server_config.endpoint)
                .ok_or("server endpoint vanished after validation")?;
            let server = CoapServer::start(
                self.registry.clone(),
                &server_config.name,
                endpoint_config,
                executors,
            )
            .await?;
            self.tasks.push(responders::spawn_acknowledger(
                executors.cpu(),
                server_config.name.clone(),
                server.endpoint().clone(),
                server.subscribe(),
            ));
            self.servers.push(server);
        }

        for client_config in &config.clients {
            let endpoint_config = config
                .endpoint(&client_config.endpoint)
                .ok_or("client endpoint vanished after validation")?;
            let client = CoapClient::start(
                self.registry.clone(),
                &client_config.name,
                endpoint_config,
                executors,
            )
            .await?;
            if let Some(ping) = &client_config.ping {
                self.tasks.push(responders::spawn_pinger(
                    executors.cpu(),
                    client_config.name.clone(),
                    client.endpoint().clone(),
                    ping.peer,
                    Duration::from_millis(ping.interval_ms),
                ));
            }
            self.clients.push(client);
        }
        Ok(())
    }

    pub(crate) fn server_count(&self) -> usize {
        self.servers.len()
    }

    pub(crate) fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Stops tasks, clients and servers in reverse start order, then closes whatever
    /// endpoints remain.
    pub(crate) async fn stop(self) {
        for task in self.tasks {
            task.abort();
        }
        for client in self.clients {
            client.stop().await;
        }
        for server in self.servers {
            server.stop().await;
        }
        self.registry.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::Connector;
    use crate::config::Config;
    use coap_endpoint_registry::{EndpointExecutors, EndpointRegistry};
    use std::path::Path;
    use std::sync::Arc;

    #[tokio::test(flavor = "multi_thread")]
    async fn bundled_config_starts_every_server() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/connector.json5");
        let config = Config::load(&path).expect("bundled config should load");
        let executors = EndpointExecutors::try_current().expect("inside a runtime");
        let registry = Arc::new(EndpointRegistry::with_default_factory());

        let connector = Connector::start(registry.clone(), &config, &executors)
            .await
            .expect("every configured server and client should start");

        assert_eq!(connector.server_count(), config.servers.len());
        assert_eq!(connector.client_count(), config.clients.len());
        assert_eq!(
            registry.config_names().await,
            vec!["discovery", "local", "uplink"]
        );

        connector.stop().await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_start_releases_servers_already_running() {
        let occupied = std::net::UdpSocket::bind("127.0.0.1:0").expect("socket should bind");
        let taken_port = occupied.local_addr().expect("bound address").port();
        let config = Config::from_json5(&format!(
            r#"{{
                endpoints: [
                    {{ type: "udp", config_name: "free", bind_address: "127.0.0.1", port: 0 }},
                    {{ type: "udp", config_name: "taken", bind_address: "127.0.0.1", port: {taken_port} }},
                ],
                servers: [
                    {{ name: "first", endpoint: "free" }},
                    {{ name: "second", endpoint: "taken" }},
                ],
            }}"#
        ))
        .expect("config should load");
        let executors = EndpointExecutors::try_current().expect("inside a runtime");
        let registry = Arc::new(EndpointRegistry::with_default_factory());

        let result = Connector::start(registry.clone(), &config, &executors).await;

        assert!(result.is_err());
        assert!(registry.is_empty().await);
        drop(occupied);
    }
}
