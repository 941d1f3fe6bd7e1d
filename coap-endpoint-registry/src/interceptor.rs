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

//! Message interceptors attached to endpoint transports.

use crate::observability::events;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use tracing::info;

const COMPONENT: &str = "message_tracer";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrafficDirection {
    Inbound,
    Outbound,
}

/// One datagram crossing a transport.
#[derive(Clone, Copy, Debug)]
pub struct TrafficRecord<'a> {
    pub endpoint_name: &'a str,
    pub direction: TrafficDirection,
    pub peer: SocketAddr,
    pub datagram: &'a [u8],
}

/// Observer invoked for every datagram a transport sends or receives.
pub trait MessageInterceptor: Send + Sync {
    fn on_send(&self, record: &TrafficRecord<'_>);

    fn on_receive(&self, record: &TrafficRecord<'_>);
}

/// Fixed CoAP message header fields (RFC 7252 §3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CoapHeaderSummary {
    pub version: u8,
    pub message_type: CoapMessageType,
    pub token_length: u8,
    pub code_class: u8,
    pub code_detail: u8,
    pub message_id: u16,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CoapMessageType {
    Confirmable,
    NonConfirmable,
    Acknowledgement,
    Reset,
}

impl CoapHeaderSummary {
    /// Reads the 4-byte fixed header; `None` when the datagram cannot be CoAP.
    pub fn parse(datagram: &[u8]) -> Option<Self> {
        let [first, code, id_high, id_low, ..] = *datagram else {
            return None;
        };

        let version = first >> 6;
        let token_length = first & 0x0f;
        if version != 1 || token_length > 8 || datagram.len() < 4 + usize::from(token_length) {
            return None;
        }

        let message_type = match (first >> 4) & 0x03 {
            0 => CoapMessageType::Confirmable,
            1 => CoapMessageType::NonConfirmable,
            2 => CoapMessageType::Acknowledgement,
            _ => CoapMessageType::Reset,
        };

        Some(Self {
            version,
            message_type,
            token_length,
            code_class: code >> 5,
            code_detail: code & 0x1f,
            message_id: u16::from_be_bytes([id_high, id_low]),
        })
    }
}

impl Display for CoapHeaderSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message_type = match self.message_type {
            CoapMessageType::Confirmable => "CON",
            CoapMessageType::NonConfirmable => "NON",
            CoapMessageType::Acknowledgement => "ACK",
            CoapMessageType::Reset => "RST",
        };
        write!(
            f,
            "{message_type} {}.{:02} mid={} tkl={}",
            self.code_class, self.code_detail, self.message_id, self.token_length
        )
    }
}

fn format_header(datagram: &[u8]) -> String {
    CoapHeaderSummary::parse(datagram)
        .map(|header| header.to_string())
        .unwrap_or_else(|| "unparsed".to_string())
}

/// Logs every datagram of an endpoint configured with `log_traffic`.
#[derive(Clone, Debug, Default)]
pub struct MessageTracer;

impl MessageTracer {
    pub fn new() -> Self {
        Self
    }

    fn trace(&self, event: &'static str, record: &TrafficRecord<'_>) {
        info!(
            event,
            component = COMPONENT,
            endpoint_name = record.endpoint_name,
            peer = %record.peer,
            len = record.datagram.len(),
            header = %format_header(record.datagram),
            "datagram traced"
        );
    }
}

impl MessageInterceptor for MessageTracer {
    fn on_send(&self, record: &TrafficRecord<'_>) {
        self.trace(events::TRAFFIC_OUTBOUND, record);
    }

    fn on_receive(&self, record: &TrafficRecord<'_>) {
        self.trace(events::TRAFFIC_INBOUND, record);
    }
}

#[cfg(test)]
mod tests {
    use super::{format_header, CoapHeaderSummary, CoapMessageType};

    #[test]
    fn parses_confirmable_get_header() {
        // CON, tkl=1, 0.01 GET, mid=0x1234, token 0xab
        let datagram = [0x41, 0x01, 0x12, 0x34, 0xab];

        let header = CoapHeaderSummary::parse(&datagram).expect("header should parse");

        assert_eq!(header.version, 1);
        assert_eq!(header.message_type, CoapMessageType::Confirmable);
        assert_eq!(header.token_length, 1);
        assert_eq!((header.code_class, header.code_detail), (0, 1));
        assert_eq!(header.message_id, 0x1234);
        assert_eq!(header.to_string(), "CON 0.01 mid=4660 tkl=1");
    }

    #[test]
    fn parses_acknowledgement_content_response() {
        // ACK, tkl=0, 2.05 Content, mid=7
        let datagram = [0x60, 0x45, 0x00, 0x07];

        let header = CoapHeaderSummary::parse(&datagram).expect("header should parse");

        assert_eq!(header.to_string(), "ACK 2.05 mid=7 tkl=0");
    }

    #[test]
    fn rejects_short_or_foreign_datagrams() {
        assert!(CoapHeaderSummary::parse(&[0x40, 0x01]).is_none());
        // version 2
        assert!(CoapHeaderSummary::parse(&[0x80, 0x01, 0x00, 0x01]).is_none());
        // token length beyond datagram
        assert!(CoapHeaderSummary::parse(&[0x44, 0x01, 0x00, 0x01, 0xaa]).is_none());
        assert_eq!(format_header(b"hi"), "unparsed");
    }
}
