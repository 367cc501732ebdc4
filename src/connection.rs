//! geofront-lite/src/connection.rs
//! The connection pump: one spawned task per accepted socket, carrying it
//! through Accepted -> ReadingHandshake -> Routing -> Dialing -> Preparing ->
//! Forwarding -> Closed.

use crate::backend::select_backend;
use crate::config::ConfigSnapshot;
use crate::error::PumpError;
use crate::handshake::{parse_handshake, read_packet_body, write_framed_packet, NEXT_STATE_LOGIN, NEXT_STATE_STATUS};
use crate::hostname::{clear_virtual_host, is_real_ip};
use crate::proxy_protocol::write_proxy_v2_header;
use crate::realip::{now_millis, rewrite_real_ip};
use crate::route::find_route;
use crate::state::{ACTIVE_CONN, CONN_METRICS, TOTAL_BYTES_RECV, TOTAL_BYTES_SENT, TOTAL_CONN};
use crate::types::{ConnMetrics, ProxyConnection};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Drives one accepted connection to completion. Never returns an error: every
/// failure is logged at the level its `PumpError` variant specifies and the
/// client socket is closed.
pub async fn handle_connection(
    conn_id: ProxyConnection,
    mut inbound: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ConfigSnapshot>,
) {
    TOTAL_CONN.fetch_add(1, Ordering::Relaxed);
    ACTIVE_CONN.fetch_add(1, Ordering::Relaxed);
    let metrics = Arc::new(ConnMetrics::default());
    CONN_METRICS.lock().unwrap().insert(conn_id, metrics.clone());

    if let Err(err) = run(conn_id, &mut inbound, peer_addr, &config, &metrics).await {
        log_pump_error(conn_id, &err);
    }

    CONN_METRICS.lock().unwrap().remove(&conn_id);
    ACTIVE_CONN.fetch_sub(1, Ordering::Relaxed);
    debug!(conn = conn_id, "connection closed");
}

fn log_pump_error(conn_id: ProxyConnection, err: &PumpError) {
    match err {
        PumpError::MalformedHandshake(_) | PumpError::NoRouteMatch(_) | PumpError::ForwardingIoError(_) => {
            debug!(conn = conn_id, error = %err, "connection dropped");
        }
        PumpError::NoBackendAvailable(_) | PumpError::BackendUnreachable { .. } => {
            info!(conn = conn_id, error = %err, "connection dropped");
        }
    }
}

async fn run(
    conn_id: ProxyConnection,
    inbound: &mut TcpStream,
    peer_addr: SocketAddr,
    config: &ConfigSnapshot,
    metrics: &Arc<ConnMetrics>,
) -> Result<(), PumpError> {
    let timeout = Duration::from_millis(config.connection_timeout_ms);

    let body = tokio::time::timeout(timeout, read_packet_body(inbound))
        .await
        .map_err(|_| PumpError::MalformedHandshake("timed out reading handshake".to_string()))?
        .map_err(|e| PumpError::MalformedHandshake(e.to_string()))?;
    let ctx = parse_handshake(body).map_err(|e| PumpError::MalformedHandshake(e.to_string()))?;

    if ctx.handshake.next_state != NEXT_STATE_STATUS && ctx.handshake.next_state != NEXT_STATE_LOGIN {
        return Err(PumpError::MalformedHandshake(format!(
            "unknown next_state {}",
            ctx.handshake.next_state
        )));
    }

    let cleared_host = clear_virtual_host(&ctx.handshake.server_address);
    let (_, route) = find_route(&cleared_host, &config.routes)
        .ok_or_else(|| PumpError::NoRouteMatch(cleared_host.clone()))?;

    if route.backends.is_empty() {
        return Err(PumpError::NoBackendAvailable(cleared_host.clone()));
    }
    let backend_addr = select_backend(route).map_err(|e| PumpError::NoBackendAvailable(e.to_string()))?;

    info!(conn = conn_id, host = %cleared_host, backend = %backend_addr, "routing connection");

    let mut outbound = tokio::time::timeout(timeout, TcpStream::connect(&backend_addr))
        .await
        .map_err(|_| PumpError::BackendUnreachable {
            backend: backend_addr.clone(),
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "dial timed out"),
        })?
        .map_err(|source| PumpError::BackendUnreachable {
            backend: backend_addr.clone(),
            source,
        })?;
    let _ = outbound.set_nodelay(true);

    if route.proxy_protocol {
        let destination = inbound
            .local_addr()
            .unwrap_or_else(|_| "0.0.0.0:0".parse().unwrap());
        write_proxy_v2_header(&mut outbound, peer_addr, destination)
            .await
            .map_err(PumpError::ForwardingIoError)?;
    }

    let payload = if route.real_ip && is_real_ip(&ctx.handshake.server_address) {
        let rewritten = rewrite_real_ip(&ctx.handshake, &cleared_host, peer_addr.ip(), now_millis());
        crate::handshake::encode_handshake(&rewritten)
    } else {
        ctx.payload
    };

    write_framed_packet(&mut outbound, &payload)
        .await
        .map_err(PumpError::ForwardingIoError)?;

    copy_bidirectional_with_metrics(inbound, &mut outbound, metrics).await?;
    Ok(())
}

/// Bidirectionally copies bytes between the client and backend sockets until
/// either side closes, crediting every chunk to both the per-connection and
/// global byte counters. Deadlines do not apply here: the connection timeout
/// only bounds handshake read and dial, per the design.
async fn copy_bidirectional_with_metrics<A, B>(
    client: &mut A,
    backend: &mut B,
    metrics: &ConnMetrics,
) -> Result<(), PumpError>
where
    A: AsyncRead + AsyncWrite + Unpin + ?Sized,
    B: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let mut client_buf = [0u8; 4096];
    let mut backend_buf = [0u8; 4096];
    let mut client_closed = false;
    let mut backend_closed = false;

    loop {
        tokio::select! {
            result = client.read(&mut client_buf), if !client_closed => {
                let n = result.map_err(PumpError::ForwardingIoError)?;
                if n == 0 {
                    client_closed = true;
                    if !backend_closed {
                        backend.shutdown().await.map_err(PumpError::ForwardingIoError)?;
                    }
                } else {
                    backend.write_all(&client_buf[..n]).await.map_err(PumpError::ForwardingIoError)?;
                    metrics.bytes_sent.fetch_add(n as u64, Ordering::Relaxed);
                    TOTAL_BYTES_SENT.fetch_add(n as u64, Ordering::Relaxed);
                }
            },
            result = backend.read(&mut backend_buf), if !backend_closed => {
                let n = result.map_err(PumpError::ForwardingIoError)?;
                if n == 0 {
                    backend_closed = true;
                    if !client_closed {
                        client.shutdown().await.map_err(PumpError::ForwardingIoError)?;
                    }
                } else {
                    client.write_all(&backend_buf[..n]).await.map_err(PumpError::ForwardingIoError)?;
                    metrics.bytes_recv.fetch_add(n as u64, Ordering::Relaxed);
                    TOTAL_BYTES_RECV.fetch_add(n as u64, Ordering::Relaxed);
                }
            },
            else => break,
        }

        if client_closed && backend_closed {
            break;
        }
    }

    Ok(())
}
