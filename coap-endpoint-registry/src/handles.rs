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

//! Identity tokens for the servers and clients that use shared endpoints.

use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
struct HandleIdentity {
    id: Uuid,
    name: Arc<str>,
}

impl HandleIdentity {
    fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: Arc::from(name),
        }
    }
}

impl Hash for HandleIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialEq for HandleIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for HandleIdentity {}

/// Opaque identity of a CoAP server using an endpoint.
///
/// Clones share identity; two handles created with the same name do not.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct ServerHandle(HandleIdentity);

impl ServerHandle {
    pub fn new(name: &str) -> Self {
        Self(HandleIdentity::new(name))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
}

/// Opaque identity of a CoAP client using an endpoint.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct ClientHandle(HandleIdentity);

impl ClientHandle {
    pub fn new(name: &str) -> Self {
        Self(HandleIdentity::new(name))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
}

impl Debug for ServerHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("name", &self.0.name)
            .field("id", &self.0.id)
            .finish()
    }
}

impl Debug for ClientHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("name", &self.0.name)
            .field("id", &self.0.id)
            .finish()
    }
}

impl Display for ServerHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

impl Display for ClientHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.name)
    }
}
