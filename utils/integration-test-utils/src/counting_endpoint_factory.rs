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

use async_trait::async_trait;
use coap_endpoint_registry::{
    BuiltEndpoint, EndpointBuildError, EndpointConfig, EndpointFactory, SocketEndpointFactory,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Socket-backed factory that counts the builds it performs.
///
/// An optional delay widens the window in which concurrent callers race for the same
/// configuration name.
#[derive(Debug, Default)]
pub struct CountingEndpointFactory {
    inner: SocketEndpointFactory,
    build_delay: Option<Duration>,
    builds: AtomicUsize,
}

impl CountingEndpointFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_build_delay(build_delay: Duration) -> Self {
        Self {
            build_delay: Some(build_delay),
            ..Self::default()
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EndpointFactory for CountingEndpointFactory {
    async fn build(&self, config: &EndpointConfig) -> Result<BuiltEndpoint, EndpointBuildError> {
        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        }
        let built = self.inner.build(config).await?;
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(built)
    }
}

/// Factory whose every build fails as if the port were taken.
#[derive(Debug, Default)]
pub struct FailingEndpointFactory {
    attempts: AtomicUsize,
}

impl FailingEndpointFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EndpointFactory for FailingEndpointFactory {
    async fn build(&self, _config: &EndpointConfig) -> Result<BuiltEndpoint, EndpointBuildError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(EndpointBuildError::Bind(io::Error::new(
            io::ErrorKind::AddrInUse,
            "address already in use",
        )))
    }
}
