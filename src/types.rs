//! geofront-lite/src/types.rs
//! Small shared types: connection ids and the metrics snapshot shape.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;

/// Identifies one accepted connection for the lifetime of its pump task, and
/// for log correlation.
pub type ProxyConnection = u64;

/// Per-connection byte counters, updated from both directions of the copy.
#[derive(Default)]
pub struct ConnMetrics {
    pub bytes_sent: AtomicU64,
    pub bytes_recv: AtomicU64,
}

/// A point-in-time view of the process-wide and per-connection counters.
#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub total_conn: u64,
    pub active_conn: u64,
    pub total_bytes_sent: u64,
    pub total_bytes_recv: u64,
    pub connections: HashMap<ProxyConnection, ConnMetricsSnapshot>,
}

#[derive(Serialize)]
pub struct ConnMetricsSnapshot {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
}
