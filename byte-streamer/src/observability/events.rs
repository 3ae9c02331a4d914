//! Canonical structured event names used across `byte-streamer`.

// Endpoint factory events.
pub const ENDPOINT_CREATE_START: &str = "endpoint_create_start";
pub const ENDPOINT_CREATE_FAILED: &str = "endpoint_create_failed";
pub const PROCESS_EXIT: &str = "process_exit";

// Broker registry and lookup events.
pub const ENDPOINT_ANNOUNCE: &str = "endpoint_announce";
pub const ENDPOINT_ANNOUNCE_DUPLICATE: &str = "endpoint_announce_duplicate";
pub const LOOKUP_SATISFIED: &str = "lookup_satisfied";
pub const LOOKUP_PARKED: &str = "lookup_parked";
pub const LOOKUP_REJECTED: &str = "lookup_rejected";
pub const LOOKUP_REPLY_DROPPED: &str = "lookup_reply_dropped";

// Connection pump events.
pub const CONNECTION_OPEN_START: &str = "connection_open_start";
pub const CONNECTION_ESTABLISHED: &str = "connection_established";
pub const CONNECTION_FAILED: &str = "connection_failed";

// Supervisor lifecycle events.
pub const RUN_START: &str = "run_start";
pub const SHUTDOWN_START: &str = "shutdown_start";
pub const ENDPOINT_CLOSE: &str = "endpoint_close";
pub const ENDPOINT_CLOSE_FAILED: &str = "endpoint_close_failed";
pub const ENDPOINT_CLOSE_TIMEOUT: &str = "endpoint_close_timeout";
