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

//! Canonical structured field values and value-format helpers.

use crate::handles::ServerHandle;
use std::net::SocketAddr;

pub const NONE: &str = "none";
pub const REASON_SERVER_ATTACHED: &str = "server_attached";
pub const REASON_ALREADY_SET: &str = "already_set";
pub const REASON_STALE_ENDPOINT: &str = "stale_endpoint";
pub const REASON_TRANSPORT_CLOSED: &str = "transport_closed";
pub const DEFAULT_THREAD_NAME: &str = "unknown-thread";

pub fn format_server(server: Option<&ServerHandle>) -> String {
    server
        .map(ToString::to_string)
        .unwrap_or_else(|| NONE.to_string())
}

pub fn format_local_addr(addr: Option<SocketAddr>) -> String {
    addr.map(|addr| addr.to_string())
        .unwrap_or_else(|| NONE.to_string())
}

pub fn thread_name_or_default(thread_name: Option<&str>) -> String {
    thread_name.unwrap_or(DEFAULT_THREAD_NAME).to_string()
}
