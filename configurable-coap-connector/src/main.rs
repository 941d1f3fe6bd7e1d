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

mod config;
mod connector;
mod responders;

use crate::config::Config;
use crate::connector::Connector;
use clap::Parser;
use coap_endpoint_registry::{EndpointRegistry, ExecutorPool};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command()]
struct ConnectorArgs {
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt::try_init();

    info!("Started configurable-coap-connector");

    let args = ConnectorArgs::parse();
    let config = Config::load(&args.config)?;

    let pool = ExecutorPool::new(
        "connector",
        config.executors.io_threads,
        config.executors.cpu_threads,
    )?;
    let registry = Arc::new(EndpointRegistry::with_default_factory());

    let started = Connector::start(registry.clone(), &config, &pool.executors()).await;
    let result = match started {
        Ok(connector) => {
            info!(
                servers = connector.server_count(),
                clients = connector.client_count(),
                endpoints = registry.len().await,
                "connector running, press ctrl-c to stop"
            );
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(err = %err, "unable to listen for shutdown signal");
            }
            connector.stop().await;
            Ok(())
        }
        Err(err) => {
            error!(err = %err, "connector failed to start");
            Err(err)
        }
    };
    pool.shutdown();

    info!("Stopped configurable-coap-connector");
    result
}
