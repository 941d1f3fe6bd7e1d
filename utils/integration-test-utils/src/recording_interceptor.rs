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

use coap_endpoint_registry::{MessageInterceptor, TrafficDirection, TrafficRecord};
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedTraffic {
    pub endpoint_name: String,
    pub direction: TrafficDirection,
    pub peer: SocketAddr,
    pub datagram: Vec<u8>,
}

/// Interceptor that keeps a copy of every datagram it sees.
#[derive(Debug, Default)]
pub struct RecordingInterceptor {
    records: Mutex<Vec<RecordedTraffic>>,
}

impl RecordingInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RecordedTraffic> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, direction: TrafficDirection) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|record| record.direction == direction)
            .count()
    }

    fn record(&self, record: &TrafficRecord<'_>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedTraffic {
                endpoint_name: record.endpoint_name.to_string(),
                direction: record.direction,
                peer: record.peer,
                datagram: record.datagram.to_vec(),
            });
    }
}

impl MessageInterceptor for RecordingInterceptor {
    fn on_send(&self, record: &TrafficRecord<'_>) {
        self.record(record);
    }

    fn on_receive(&self, record: &TrafficRecord<'_>) {
        self.record(record);
    }
}
