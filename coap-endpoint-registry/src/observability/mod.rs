//! Structured logging vocabulary shared by the registry, transports and facades.

pub mod events;
pub mod fields;
