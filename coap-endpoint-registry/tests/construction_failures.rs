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

use coap_endpoint_registry::{
    ClientHandle, EndpointBuildError, EndpointConfig, EndpointKind, EndpointRegistry,
    EndpointRegistryError, ServerHandle,
};
use integration_test_utils::FailingEndpointFactory;
use std::error::Error;
use std::sync::Arc;
use support::loopback_udp;

#[tokio::test(flavor = "multi_thread")]
async fn failed_construction_leaves_no_entry_and_is_retried() {
    integration_test_utils::init_logging();

    let factory = Arc::new(FailingEndpointFactory::new());
    let registry = EndpointRegistry::new(factory.clone());
    let server = ServerHandle::new("server");

    for _ in 0..2 {
        let err = registry
            .get_or_create_for_server(&server, &loopback_udp("broken"))
            .await
            .expect_err("construction always fails");
        assert!(matches!(
            err,
            EndpointRegistryError::Construction {
                kind: EndpointKind::Udp,
                ..
            }
        ));
        assert!(err
            .source()
            .and_then(|source| source.downcast_ref::<EndpointBuildError>())
            .is_some());
    }

    assert_eq!(factory.attempts(), 2);
    assert!(registry.is_empty().await);
    assert!(registry.find_by_server(&server).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn stream_variants_from_configuration_are_unsupported() {
    integration_test_utils::init_logging();

    let registry = EndpointRegistry::with_default_factory();
    let client = ClientHandle::new("client");
    let configs: Vec<EndpointConfig> = json5::from_str(
        r#"[
            { type: "tcp_client", config_name: "tcp-out", host: "broker.local", port: 5683 },
            { type: "tls_server", config_name: "tls-in", host: "0.0.0.0", port: 5684 },
        ]"#,
    )
    .expect("stream configurations should parse");

    for config in &configs {
        let err = registry
            .get_or_create_for_client(Some(&client), config)
            .await
            .expect_err("stream variants are not supported");
        assert!(matches!(
            err,
            EndpointRegistryError::UnsupportedVariant { kind, .. } if kind == config.kind()
        ));
        assert_eq!(err.config_name(), config.config_name());
    }
    assert!(registry.is_empty().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn dtls_endpoint_is_shared_like_udp() {
    integration_test_utils::init_logging();

    let registry = EndpointRegistry::with_default_factory();
    let config: EndpointConfig = json5::from_str(
        r#"{
            type: "dtls",
            config_name: "secure",
            bind_address: "127.0.0.1",
            port: 0,
            security: { mode: "pre_shared_key", identity: "device-7", key_hex: "00112233" },
        }"#,
    )
    .expect("dtls configuration should parse");

    let server = ServerHandle::new("secure-server");
    let client = ClientHandle::new("secure-client");
    let from_server = registry
        .get_or_create_for_server(&server, &config)
        .await
        .expect("dtls endpoint should build");
    let from_client = registry
        .get_or_create_for_client(Some(&client), &config)
        .await
        .expect("client should share it");

    assert!(Arc::ptr_eq(&from_server, &from_client));
    assert_eq!(from_server.kind(), EndpointKind::Dtls);
    assert!(from_server.endpoint_name().starts_with("coaps://127.0.0.1:"));

    registry.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_client_is_reported_with_config_name() {
    integration_test_utils::init_logging();

    let registry = EndpointRegistry::with_default_factory();
    let err = registry
        .get_or_create_for_client(None, &loopback_udp("orphan"))
        .await
        .expect_err("a client is required");

    assert_eq!(
        err.to_string(),
        "cannot create endpoint orphan: no client given"
    );
    assert!(registry.is_empty().await);
}
