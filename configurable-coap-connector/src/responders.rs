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

//! Background tasks run by the connector on top of started servers and clients.

use coap_endpoint_registry::{
    CoapHeaderSummary, CoapMessageType, InboundDatagram, OperationalEndpoint,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const COMPONENT: &str = "connector_responder";

/// Empty acknowledgement for `message_id`.
pub(crate) fn empty_ack(message_id: u16) -> [u8; 4] {
    let [high, low] = message_id.to_be_bytes();
    [0x60, 0x00, high, low]
}

/// Empty reset for `message_id`, the answer to a CoAP ping.
pub(crate) fn empty_reset(message_id: u16) -> [u8; 4] {
    let [high, low] = message_id.to_be_bytes();
    [0x70, 0x00, high, low]
}

/// Empty confirmable message, used as a CoAP ping.
pub(crate) fn ping(message_id: u16) -> [u8; 4] {
    let [high, low] = message_id.to_be_bytes();
    [0x40, 0x00, high, low]
}

/// Acknowledges every confirmable datagram a server receives and answers pings with a reset.
pub(crate) fn spawn_acknowledger(
    executor: &Handle,
    server_name: String,
    endpoint: Arc<OperationalEndpoint>,
    mut inbound: broadcast::Receiver<InboundDatagram>,
) -> JoinHandle<()> {
    executor.spawn(async move {
        loop {
            let datagram = match inbound.recv().await {
                Ok(datagram) => datagram,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        component = COMPONENT,
                        server = %server_name,
                        skipped,
                        "inbound lagged"
                    );
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let Some(header) = CoapHeaderSummary::parse(&datagram.payload) else {
                debug!(
                    component = COMPONENT,
                    server = %server_name,
                    peer = %datagram.peer,
                    "ignoring non-CoAP datagram"
                );
                continue;
            };
            if header.message_type != CoapMessageType::Confirmable {
                continue;
            }

            let is_ping = header.code_class == 0 && header.code_detail == 0;
            let reply = if is_ping {
                empty_reset(header.message_id)
            } else {
                empty_ack(header.message_id)
            };

            if let Err(err) = endpoint.transport().send_to(&reply, datagram.peer).await
            {
                warn!(
                    component = COMPONENT,
                    server = %server_name,
                    err = %err,
                    "unable to answer confirmable message"
                );
                if endpoint.transport().is_closed() {
                    break;
                }
            }
        }
    })
}

/// Sends a CoAP ping to `peer` every `interval` until the endpoint closes.
pub(crate) fn spawn_pinger(
    executor: &Handle,
    client_name: String,
    endpoint: Arc<OperationalEndpoint>,
    peer: SocketAddr,
    interval: Duration,
) -> JoinHandle<()> {
    executor.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut message_id: u16 = 0;
        loop {
            ticker.tick().await;
            message_id = message_id.wrapping_add(1);
            match endpoint.transport().send_to(&ping(message_id), peer).await {
                Ok(()) => debug!(
                    component = COMPONENT,
                    client = %client_name,
                    peer = %peer,
                    message_id,
                    "ping sent"
                ),
                Err(err) if endpoint.transport().is_closed() => {
                    debug!(
                        component = COMPONENT,
                        client = %client_name,
                        err = %err,
                        "endpoint closed, pinger stopped"
                    );
                    break;
                }
                Err(err) => warn!(
                    component = COMPONENT,
                    client = %client_name,
                    err = %err,
                    "ping failed"
                ),
            }
        }
    })
}
