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

use coap_endpoint_registry::InboundDatagram;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

const COAP_VERSION_BITS: u8 = 0b01 << 6;
const TYPE_CONFIRMABLE: u8 = 0;
const TYPE_ACKNOWLEDGEMENT: u8 = 2;
const CODE_GET: u8 = 0x01;

pub fn confirmable_get(message_id: u16, token: &[u8]) -> Vec<u8> {
    assert!(token.len() <= 8, "CoAP tokens are at most 8 bytes");
    let mut datagram = vec![
        COAP_VERSION_BITS | (TYPE_CONFIRMABLE << 4) | token.len() as u8,
        CODE_GET,
    ];
    datagram.extend_from_slice(&message_id.to_be_bytes());
    datagram.extend_from_slice(token);
    datagram
}

pub fn empty_ack(message_id: u16) -> Vec<u8> {
    let mut datagram = vec![COAP_VERSION_BITS | (TYPE_ACKNOWLEDGEMENT << 4), 0x00];
    datagram.extend_from_slice(&message_id.to_be_bytes());
    datagram
}

/// Waits for the next datagram, skipping over lag. Returns `None` on timeout or close.
pub async fn wait_for_datagram(
    receiver: &mut broadcast::Receiver<InboundDatagram>,
    timeout: Duration,
) -> Option<InboundDatagram> {
    tokio::time::timeout(timeout, async {
        loop {
            match receiver.recv().await {
                Ok(datagram) => return Some(datagram),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}
