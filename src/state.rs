//! geofront-lite/src/state.rs
//! Global, process-wide state: metrics counters and the logging reload handle.

use crate::types::{ConnMetrics, ConnMetricsSnapshot, MetricsSnapshot, ProxyConnection};
use lazy_static::lazy_static;
use std::{
    collections::HashMap,
    sync::{Arc, atomic::{AtomicU64, Ordering}},
};
use tracing_subscriber::{filter::EnvFilter, reload::Handle as ReloadHandle};

// Global metrics counters, read by the metrics snapshot and updated from the
// pump's copy loop in both directions.
pub static TOTAL_CONN: AtomicU64 = AtomicU64::new(0);
pub static ACTIVE_CONN: AtomicU64 = AtomicU64::new(0);
pub static TOTAL_BYTES_SENT: AtomicU64 = AtomicU64::new(0);
pub static TOTAL_BYTES_RECV: AtomicU64 = AtomicU64::new(0);

lazy_static! {
    /// Per-connection byte counters, keyed by connection id. Removed once the
    /// connection's pump task finishes.
    pub static ref CONN_METRICS: std::sync::Mutex<HashMap<ProxyConnection, Arc<ConnMetrics>>> =
        std::sync::Mutex::new(HashMap::new());

    /// Assigns each accepted connection its id; starts at 1 so 0 stays free
    /// for "no connection" sentinels in logs.
    pub static ref CONN_COUNTER: AtomicU64 = AtomicU64::new(1);

    /// Set once by `logging::init_logging`, used to change the active
    /// `EnvFilter` at runtime (e.g. on SIGHUP) without restarting the process.
    pub static ref RELOAD_HANDLE: std::sync::Mutex<Option<ReloadHandle<EnvFilter, tracing_subscriber::Registry>>> =
        std::sync::Mutex::new(None);
}

/// A point-in-time read of the process-wide and per-connection counters.
/// No network exporter consumes this; it exists so an embedder (or a test)
/// can inspect current traffic levels directly.
pub fn metrics_snapshot() -> MetricsSnapshot {
    let connections = CONN_METRICS
        .lock()
        .unwrap()
        .iter()
        .map(|(conn_id, metrics)| {
            (
                *conn_id,
                ConnMetricsSnapshot {
                    bytes_sent: metrics.bytes_sent.load(Ordering::Relaxed),
                    bytes_recv: metrics.bytes_recv.load(Ordering::Relaxed),
                },
            )
        })
        .collect();

    MetricsSnapshot {
        total_conn: TOTAL_CONN.load(Ordering::Relaxed),
        active_conn: ACTIVE_CONN.load(Ordering::Relaxed),
        total_bytes_sent: TOTAL_BYTES_SENT.load(Ordering::Relaxed),
        total_bytes_recv: TOTAL_BYTES_RECV.load(Ordering::Relaxed),
        connections,
    }
}
