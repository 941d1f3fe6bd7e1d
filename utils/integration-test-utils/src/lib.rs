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

mod coap_datagrams;
pub use coap_datagrams::{confirmable_get, empty_ack, wait_for_datagram};
mod counting_endpoint_factory;
pub use counting_endpoint_factory::{CountingEndpointFactory, FailingEndpointFactory};
mod logging;
pub use logging::init_logging;
mod recording_interceptor;
pub use recording_interceptor::{RecordedTraffic, RecordingInterceptor};
