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

//! Shared endpoint registry and its ownership bookkeeping.

use crate::endpoint::OperationalEndpoint;
use crate::endpoint_config::EndpointConfig;
use crate::error::EndpointRegistryError;
use crate::executors::EndpointExecutors;
use crate::factory::{EndpointFactory, SocketEndpointFactory};
use crate::handles::{ClientHandle, ServerHandle};
use crate::interceptor::MessageTracer;
use crate::observability::{events, fields};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "endpoint_registry";

/// Whose executors a started endpoint is running on.
#[derive(Clone, Debug, PartialEq)]
enum RunningOn {
    Client,
    Server(ServerHandle),
}

/// Per-endpoint ownership state.
struct EndpointBinding {
    endpoint: Arc<OperationalEndpoint>,
    server: Option<ServerHandle>,
    clients: HashSet<ClientHandle>,
    running_on: Option<RunningOn>,
}

impl EndpointBinding {
    fn new(endpoint: Arc<OperationalEndpoint>) -> Self {
        Self {
            endpoint,
            server: None,
            clients: HashSet::new(),
            running_on: None,
        }
    }

    fn is_unused(&self) -> bool {
        self.server.is_none() && self.clients.is_empty()
    }

    fn usage(&self) -> EndpointUsage {
        let mut clients: Vec<ClientHandle> = self.clients.iter().cloned().collect();
        clients.sort_by(|a, b| a.name().cmp(b.name()));
        EndpointUsage {
            server: self.server.clone(),
            clients,
            executors_set: self.running_on.is_some(),
        }
    }
}

/// Snapshot of who currently uses an endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct EndpointUsage {
    pub server: Option<ServerHandle>,
    /// Sorted by client name.
    pub clients: Vec<ClientHandle>,
    pub executors_set: bool,
}

type EndpointBindings = HashMap<String, EndpointBinding>;

///
/// [`EndpointRegistry`] maps endpoint configuration names to live operational endpoints.
///
/// An endpoint is created the first time a server or client asks for its configuration
/// name and destroyed once neither a server nor any client holds it. At most one server
/// may hold an endpoint; any number of clients may share it, with or without a server.
///
/// Every mutating operation runs under a single registry lock, including transport
/// construction, so concurrent first use of a name builds exactly one transport.
///
/// # Examples
///
/// ```
/// use std::net::IpAddr;
/// use coap_endpoint_registry::{ClientHandle, EndpointConfig, EndpointRegistry, ServerHandle};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let registry = EndpointRegistry::with_default_factory();
/// let config = EndpointConfig::udp("shared", IpAddr::from([127, 0, 0, 1]), 0);
///
/// let server = ServerHandle::new("server");
/// let client = ClientHandle::new("client");
/// let from_server = registry.get_or_create_for_server(&server, &config).await.unwrap();
/// let from_client = registry
///     .get_or_create_for_client(Some(&client), &config)
///     .await
///     .unwrap();
/// assert!(std::sync::Arc::ptr_eq(&from_server, &from_client));
///
/// // The client keeps the endpoint alive after the server leaves.
/// registry.dispose_server(&server).await;
/// assert!(registry.contains("shared").await);
///
/// registry.dispose_client(&client).await;
/// assert!(registry.is_empty().await);
/// # });
/// ```
pub struct EndpointRegistry {
    factory: Arc<dyn EndpointFactory>,
    bindings: Mutex<EndpointBindings>,
}

impl EndpointRegistry {
    pub fn new(factory: Arc<dyn EndpointFactory>) -> Self {
        Self {
            factory,
            bindings: Mutex::new(HashMap::new()),
        }
    }

    /// Registry backed by [`SocketEndpointFactory`].
    pub fn with_default_factory() -> Self {
        Self::new(Arc::new(SocketEndpointFactory::new()))
    }

    fn validate(config: &EndpointConfig) -> Result<(), EndpointRegistryError> {
        if config.config_name().trim().is_empty() {
            return Err(EndpointRegistryError::InvalidConfiguration {
                config_name: config.config_name().to_string(),
                reason: "configuration name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Builds a new binding. The caller holds the registry lock.
    async fn construct(
        &self,
        config: &EndpointConfig,
    ) -> Result<EndpointBinding, EndpointRegistryError> {
        let config_name = config.config_name();
        let kind = config.kind();

        let built = self.factory.build(config).await.map_err(|err| {
            warn!(
                event = events::ENDPOINT_CREATE_FAILED,
                component = COMPONENT,
                config_name,
                kind = %kind,
                err = %err,
                "unable to create endpoint"
            );
            EndpointRegistryError::from_build_error(config_name, kind, err)
        })?;

        if config.log_traffic() {
            built
                .transport
                .add_interceptor(Arc::new(MessageTracer::new()));
        }

        info!(
            event = events::ENDPOINT_CREATE,
            component = COMPONENT,
            config_name,
            kind = %kind,
            endpoint_name = %built.endpoint_name,
            local_addr = %fields::format_local_addr(built.transport.local_addr()),
            log_traffic = config.log_traffic(),
            "endpoint created"
        );

        Ok(EndpointBinding::new(Arc::new(OperationalEndpoint::new(
            config_name,
            built.endpoint_name,
            kind,
            built.transport,
        ))))
    }

    /// Returns the endpoint for `config`, attaching `server` as its owner.
    ///
    /// Fails with [`EndpointRegistryError::ServerConflict`] when another server already
    /// holds the endpoint; that server keeps it.
    pub async fn get_or_create_for_server(
        &self,
        server: &ServerHandle,
        config: &EndpointConfig,
    ) -> Result<Arc<OperationalEndpoint>, EndpointRegistryError> {
        Self::validate(config)?;
        let config_name = config.config_name();

        let mut bindings = self.bindings.lock().await;

        if let Some(binding) = bindings.get_mut(config_name) {
            if let Some(current) = binding.server.as_ref().filter(|current| *current != server) {
                warn!(
                    event = events::SERVER_CONFLICT,
                    component = COMPONENT,
                    config_name,
                    server = %current,
                    requested_server = %server,
                    "endpoint already in use by another server"
                );
                return Err(EndpointRegistryError::ServerConflict {
                    config_name: config_name.to_string(),
                    current_server: current.to_string(),
                    requested_server: server.to_string(),
                });
            }

            binding.server = Some(server.clone());
            debug!(
                event = events::ENDPOINT_REUSE,
                component = COMPONENT,
                config_name,
                server = %server,
                client_count = binding.clients.len(),
                "server attached to existing endpoint"
            );
            return Ok(binding.endpoint.clone());
        }

        let mut binding = self.construct(config).await?;
        binding.server = Some(server.clone());
        let endpoint = binding.endpoint.clone();
        bindings.insert(config_name.to_string(), binding);

        debug!(
            event = events::SERVER_ATTACH,
            component = COMPONENT,
            config_name,
            server = %server,
            "server attached to new endpoint"
        );
        Ok(endpoint)
    }

    /// Returns the endpoint for `config`, adding `client` to its users.
    ///
    /// A missing client is rejected before the registry is touched.
    pub async fn get_or_create_for_client(
        &self,
        client: Option<&ClientHandle>,
        config: &EndpointConfig,
    ) -> Result<Arc<OperationalEndpoint>, EndpointRegistryError> {
        let Some(client) = client else {
            warn!(
                event = events::CLIENT_REJECTED,
                component = COMPONENT,
                config_name = config.config_name(),
                client = fields::NONE,
                "no client given"
            );
            return Err(EndpointRegistryError::MissingClient {
                config_name: config.config_name().to_string(),
            });
        };
        Self::validate(config)?;
        let config_name = config.config_name();

        let mut bindings = self.bindings.lock().await;

        if let Some(binding) = bindings.get_mut(config_name) {
            binding.clients.insert(client.clone());
            debug!(
                event = events::ENDPOINT_REUSE,
                component = COMPONENT,
                config_name,
                client = %client,
                client_count = binding.clients.len(),
                has_server = binding.server.is_some(),
                "client attached to existing endpoint"
            );
            return Ok(binding.endpoint.clone());
        }

        let mut binding = self.construct(config).await?;
        binding.clients.insert(client.clone());
        let endpoint = binding.endpoint.clone();
        bindings.insert(config_name.to_string(), binding);

        debug!(
            event = events::CLIENT_ATTACH,
            component = COMPONENT,
            config_name,
            client = %client,
            "client attached to new endpoint"
        );
        Ok(endpoint)
    }

    fn names_held_by_server(bindings: &EndpointBindings, server: &ServerHandle) -> Vec<String> {
        let mut names: Vec<String> = bindings
            .iter()
            .filter(|(_, binding)| binding.server.as_ref() == Some(server))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn names_held_by_client(bindings: &EndpointBindings, client: &ClientHandle) -> Vec<String> {
        let mut names: Vec<String> = bindings
            .iter()
            .filter(|(_, binding)| binding.clients.contains(client))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Configuration names of every endpoint `server` currently holds.
    pub async fn find_by_server(&self, server: &ServerHandle) -> Vec<String> {
        let bindings = self.bindings.lock().await;
        Self::names_held_by_server(&bindings, server)
    }

    /// Configuration names of every endpoint `client` currently uses.
    pub async fn find_by_client(&self, client: &ClientHandle) -> Vec<String> {
        let bindings = self.bindings.lock().await;
        Self::names_held_by_client(&bindings, client)
    }

    /// Removes and destroys the binding under `config_name` if nobody holds it anymore.
    async fn release_if_unused(bindings: &mut EndpointBindings, config_name: &str) {
        let unused = bindings
            .get(config_name)
            .map(EndpointBinding::is_unused)
            .unwrap_or(false);

        if !unused {
            if let Some(binding) = bindings.get(config_name) {
                debug!(
                    event = events::ENDPOINT_RETAINED,
                    component = COMPONENT,
                    config_name,
                    has_server = binding.server.is_some(),
                    client_count = binding.clients.len(),
                    "endpoint still in use"
                );
            }
            return;
        }

        if let Some(binding) = bindings.remove(config_name) {
            binding.endpoint.transport().destroy().await;
            info!(
                event = events::ENDPOINT_DESTROY,
                component = COMPONENT,
                config_name,
                endpoint_name = %binding.endpoint.endpoint_name(),
                "endpoint destroyed"
            );
        }
    }

    /// Detaches `server` from every endpoint it holds. Idempotent.
    pub async fn dispose_server(&self, server: &ServerHandle) {
        let mut bindings = self.bindings.lock().await;

        for config_name in Self::names_held_by_server(&bindings, server) {
            if let Some(binding) = bindings.get_mut(&config_name) {
                binding.server = None;
                debug!(
                    event = events::SERVER_DETACH,
                    component = COMPONENT,
                    config_name = %config_name,
                    server = %server,
                    "server detached"
                );
            }
            Self::release_if_unused(&mut bindings, &config_name).await;
        }
    }

    /// Detaches `client` from every endpoint it uses. Idempotent.
    pub async fn dispose_client(&self, client: &ClientHandle) {
        let mut bindings = self.bindings.lock().await;

        for config_name in Self::names_held_by_client(&bindings, client) {
            if let Some(binding) = bindings.get_mut(&config_name) {
                binding.clients.remove(client);
                debug!(
                    event = events::CLIENT_DETACH,
                    component = COMPONENT,
                    config_name = %config_name,
                    client = %client,
                    client_count = binding.clients.len(),
                    "client detached"
                );
            }
            Self::release_if_unused(&mut bindings, &config_name).await;
        }
    }

    /// Starts a client-only endpoint on `executors`.
    ///
    /// Injection happens at most once per endpoint and never while a server holds it;
    /// servers go through [`EndpointRegistry::set_server_executors`]. Returns whether
    /// the executors were injected by this call.
    pub async fn set_executors_if_needed(
        &self,
        endpoint: &Arc<OperationalEndpoint>,
        executors: &EndpointExecutors,
    ) -> bool {
        let mut bindings = self.bindings.lock().await;

        let Some(binding) = bindings
            .get_mut(endpoint.config_name())
            .filter(|binding| Arc::ptr_eq(&binding.endpoint, endpoint))
        else {
            debug!(
                event = events::EXECUTORS_SKIP,
                component = COMPONENT,
                config_name = endpoint.config_name(),
                reason = fields::REASON_STALE_ENDPOINT,
                "endpoint is no longer registered"
            );
            return false;
        };

        let skip_reason = if binding.server.is_some() {
            Some(fields::REASON_SERVER_ATTACHED)
        } else if binding.running_on.is_some() {
            Some(fields::REASON_ALREADY_SET)
        } else {
            None
        };

        if let Some(reason) = skip_reason {
            debug!(
                event = events::EXECUTORS_SKIP,
                component = COMPONENT,
                config_name = endpoint.config_name(),
                reason,
                "executors not injected"
            );
            return false;
        }

        Self::inject_executors(binding, executors, RunningOn::Client);
        true
    }

    /// Starts an endpoint on the executors of the server holding it.
    ///
    /// An endpoint a client already started is moved onto the server's executors, so it
    /// no longer depends on the client's runtime. Returns `Ok(false)` only when the
    /// endpoint already runs on this server's executors.
    pub async fn set_server_executors(
        &self,
        server: &ServerHandle,
        endpoint: &Arc<OperationalEndpoint>,
        executors: &EndpointExecutors,
    ) -> Result<bool, EndpointRegistryError> {
        let mut bindings = self.bindings.lock().await;

        let Some(binding) = bindings
            .get_mut(endpoint.config_name())
            .filter(|binding| Arc::ptr_eq(&binding.endpoint, endpoint))
            .filter(|binding| binding.server.as_ref() == Some(server))
        else {
            return Err(EndpointRegistryError::NotOwner {
                config_name: endpoint.config_name().to_string(),
            });
        };

        let owner = RunningOn::Server(server.clone());
        match binding.running_on.clone() {
            Some(current) if current == owner => {
                debug!(
                    event = events::EXECUTORS_SKIP,
                    component = COMPONENT,
                    config_name = endpoint.config_name(),
                    server = %server,
                    reason = fields::REASON_ALREADY_SET,
                    "executors not injected"
                );
                Ok(false)
            }
            Some(previous) => {
                if !binding.endpoint.transport().rebind_executors(executors).await {
                    warn!(
                        event = events::EXECUTORS_SKIP,
                        component = COMPONENT,
                        config_name = endpoint.config_name(),
                        server = %server,
                        reason = fields::REASON_TRANSPORT_CLOSED,
                        "transport closed before it could move"
                    );
                    return Ok(false);
                }
                binding.running_on = Some(owner);
                info!(
                    event = events::EXECUTORS_REHOME,
                    component = COMPONENT,
                    config_name = endpoint.config_name(),
                    server = %server,
                    previous = ?previous,
                    "endpoint moved onto server executors"
                );
                Ok(true)
            }
            None => {
                Self::inject_executors(binding, executors, owner);
                Ok(true)
            }
        }
    }

    fn inject_executors(
        binding: &mut EndpointBinding,
        executors: &EndpointExecutors,
        owner: RunningOn,
    ) {
        binding.endpoint.transport().set_executors(executors);
        binding.running_on = Some(owner);
        debug!(
            event = events::EXECUTORS_INJECT,
            component = COMPONENT,
            config_name = binding.endpoint.config_name(),
            server = %fields::format_server(binding.server.as_ref()),
            "executors injected"
        );
    }

    pub async fn contains(&self, config_name: &str) -> bool {
        self.bindings.lock().await.contains_key(config_name)
    }

    pub async fn len(&self) -> usize {
        self.bindings.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bindings.lock().await.is_empty()
    }

    /// Sorted configuration names of all live endpoints.
    pub async fn config_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn usage(&self, config_name: &str) -> Option<EndpointUsage> {
        self.bindings
            .lock()
            .await
            .get(config_name)
            .map(EndpointBinding::usage)
    }

    /// Destroys every endpoint regardless of its users. Used at application stop.
    pub async fn shutdown(&self) {
        let mut bindings = self.bindings.lock().await;
        let count = bindings.len();

        for (config_name, binding) in bindings.drain() {
            binding.endpoint.transport().destroy().await;
            debug!(
                event = events::ENDPOINT_DESTROY,
                component = COMPONENT,
                config_name = %config_name,
                has_server = binding.server.is_some(),
                client_count = binding.clients.len(),
                "endpoint destroyed at shutdown"
            );
        }

        info!(
            event = events::REGISTRY_SHUTDOWN,
            component = COMPONENT,
            count,
            "endpoint registry shut down"
        );
    }
}
