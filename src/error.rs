//! geofront-lite/src/error.rs
//! Error kinds for the connection pump, each tied to a log level in the design.

use thiserror::Error;

/// Every way a connection can fail to reach (or survive) the `Forwarding` state.
///
/// Every variant terminates at the pump: callers log it at the level noted below
/// and close the client connection. None of these ever escape `handle_connection`.
#[derive(Debug, Error)]
pub enum PumpError {
    /// VarInt overflow, truncated packet, oversized address, or unknown next-state.
    /// Logged at `debug`.
    #[error("malformed handshake: {0}")]
    MalformedHandshake(String),

    /// No route pattern matched the cleared virtual host. Logged at `debug`.
    #[error("no route matched host {0:?}")]
    NoRouteMatch(String),

    /// A matched route's backend set was empty. Should be prevented by config
    /// validation; defended here in case a snapshot is ever constructed by hand.
    /// Logged at `info`.
    #[error("route for host {0:?} has no backends")]
    NoBackendAvailable(String),

    /// Dialing the chosen backend failed or exceeded the connection timeout.
    /// Logged at `info`.
    #[error("backend {backend} unreachable: {source}")]
    BackendUnreachable {
        backend: String,
        #[source]
        source: std::io::Error,
    },

    /// A copy direction ended with a non-EOF I/O error. Logged at `debug`.
    #[error("forwarding I/O error: {0}")]
    ForwardingIoError(#[from] std::io::Error),
}
