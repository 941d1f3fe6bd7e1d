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

mod support;

use coap_endpoint_registry::{ClientHandle, EndpointRegistry, EndpointRegistryError, ServerHandle};
use futures::future::join_all;
use integration_test_utils::CountingEndpointFactory;
use std::sync::Arc;
use std::time::Duration;
use support::loopback_udp;

const CONTENDERS: usize = 24;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_clients_construct_one_endpoint() {
    integration_test_utils::init_logging();

    let factory = Arc::new(CountingEndpointFactory::with_build_delay(Duration::from_millis(
        25,
    )));
    let registry = Arc::new(EndpointRegistry::new(factory.clone()));

    let tasks = (0..CONTENDERS).map(|index| {
        let registry = registry.clone();
        tokio::spawn(async move {
            let client = ClientHandle::new(&format!("client-{index}"));
            let endpoint = registry
                .get_or_create_for_client(Some(&client), &loopback_udp("contended"))
                .await
                .expect("every client should attach");
            (client, endpoint)
        })
    });
    let attached: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should finish"))
        .collect();

    assert_eq!(factory.builds(), 1);
    let first = &attached[0].1;
    assert!(attached
        .iter()
        .all(|(_, endpoint)| Arc::ptr_eq(endpoint, first)));
    let usage = registry.usage("contended").await.expect("endpoint exists");
    assert_eq!(usage.clients.len(), CONTENDERS);

    for (client, _) in &attached {
        registry.dispose_client(client).await;
    }
    assert!(registry.is_empty().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_servers_yield_exactly_one_owner() {
    integration_test_utils::init_logging();

    let factory = Arc::new(CountingEndpointFactory::with_build_delay(Duration::from_millis(
        25,
    )));
    let registry = Arc::new(EndpointRegistry::new(factory.clone()));

    let tasks = (0..CONTENDERS).map(|index| {
        let registry = registry.clone();
        tokio::spawn(async move {
            let server = ServerHandle::new(&format!("server-{index}"));
            let result = registry
                .get_or_create_for_server(&server, &loopback_udp("contended"))
                .await;
            (server, result)
        })
    });
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should finish"))
        .collect();

    let winners: Vec<_> = outcomes
        .iter()
        .filter(|(_, result)| result.is_ok())
        .map(|(server, _)| server.clone())
        .collect();
    assert_eq!(winners.len(), 1);
    assert!(outcomes.iter().all(|(_, result)| matches!(
        result,
        Ok(_) | Err(EndpointRegistryError::ServerConflict { .. })
    )));
    assert_eq!(factory.builds(), 1);
    assert_eq!(
        registry.usage("contended").await.expect("endpoint exists").server,
        Some(winners[0].clone())
    );
}
