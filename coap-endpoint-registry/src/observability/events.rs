//! Canonical structured event names used across `coap-endpoint-registry`.

// Registry lifecycle events.
pub const ENDPOINT_CREATE: &str = "endpoint_create";
pub const ENDPOINT_CREATE_FAILED: &str = "endpoint_create_failed";
pub const ENDPOINT_REUSE: &str = "endpoint_reuse";
pub const ENDPOINT_DESTROY: &str = "endpoint_destroy";
pub const ENDPOINT_RETAINED: &str = "endpoint_retained";
pub const SERVER_ATTACH: &str = "server_attach";
pub const SERVER_CONFLICT: &str = "server_conflict";
pub const SERVER_DETACH: &str = "server_detach";
pub const CLIENT_ATTACH: &str = "client_attach";
pub const CLIENT_REJECTED: &str = "client_rejected";
pub const CLIENT_DETACH: &str = "client_detach";
pub const REGISTRY_SHUTDOWN: &str = "registry_shutdown";

// Executor injection events.
pub const EXECUTORS_INJECT: &str = "executors_inject";
pub const EXECUTORS_SKIP: &str = "executors_skip";
pub const EXECUTORS_REHOME: &str = "executors_rehome";

// Transport events.
pub const TRANSPORT_BIND_OK: &str = "transport_bind_ok";
pub const TRANSPORT_MULTICAST_JOIN: &str = "transport_multicast_join";
pub const TRANSPORT_RECV_LOOP_START: &str = "transport_recv_loop_start";
pub const TRANSPORT_RECV_FAILED: &str = "transport_recv_failed";
pub const TRANSPORT_REBIND: &str = "transport_rebind";
pub const TRANSPORT_CLOSED: &str = "transport_closed";
pub const TRAFFIC_OUTBOUND: &str = "traffic_outbound";
pub const TRAFFIC_INBOUND: &str = "traffic_inbound";

// Facade lifecycle events.
pub const SERVER_START: &str = "server_start";
pub const SERVER_STOP: &str = "server_stop";
pub const CLIENT_START: &str = "client_start";
pub const CLIENT_SEND: &str = "client_send";
pub const CLIENT_STOP: &str = "client_stop";
