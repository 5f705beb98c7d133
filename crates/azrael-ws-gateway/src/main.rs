// SPDX-License-Identifier: Apache-2.0
//! WebSocket ↔ Unix socket bridge in front of the Azrael Gateway.
//! Browsers speak WebSocket; the bridge forwards length-prefixed CBOR
//! frames to the Gateway's Unix socket verbatim and relays replies back.

use std::{
    collections::HashMap,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::{anyhow, Result};
use axum::{
    extract::ws::{Message, WebSocket},
    extract::{ConnectInfo, State, WebSocketUpgrade},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use azrael_proto::wire::Packet;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::task::JoinError;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::UnixStream,
    sync::{mpsc, Mutex},
    time::{self, Duration},
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Length-prefix framing overhead (bytes): the 4-byte big-endian body length.
const FRAME_HEADER_BYTES: usize = 4;
type TaskResult<T> = std::result::Result<T, JoinError>;

#[derive(Debug)]
struct ConnMetrics {
    peer: SocketAddr,
    commands_sent: u64,
    last_seen_ms: u64,
}

impl ConnMetrics {
    const fn new(peer: SocketAddr, now_ms: u64) -> Self {
        Self { peer, commands_sent: 0, last_seen_ms: now_ms }
    }
}

#[derive(Debug, Default)]
struct GatewayMetrics {
    next_conn_id: u64,
    total_connections: u64,
    active_connections: usize,

    ws_to_uds_bytes: u64,
    ws_to_uds_frames: u64,
    uds_to_ws_bytes: u64,
    uds_to_ws_frames: u64,

    invalid_ws_frames: u64,
    decode_errors: u64,

    commands_by_name: HashMap<&'static str, u64>,

    connections: HashMap<u64, ConnMetrics>,
}

#[derive(Debug, Serialize)]
struct DirectionCounters {
    bytes: u64,
    frames: u64,
}

#[derive(Debug, Serialize)]
struct ConnMetricsResponse {
    conn_id: u64,
    peer: String,
    commands_sent: u64,
    last_seen_ms: u64,
}

#[derive(Debug, Serialize)]
struct MetricsResponse {
    started_at_unix_ms: u64,
    uptime_ms: u64,
    active_connections: usize,
    total_connections: u64,

    ws_to_uds: DirectionCounters,
    uds_to_ws: DirectionCounters,

    invalid_ws_frames: u64,
    decode_errors: u64,
    commands_by_name: HashMap<&'static str, u64>,

    connections: Vec<ConnMetricsResponse>,
}

impl GatewayMetrics {
    fn alloc_conn(&mut self, peer: SocketAddr, now_ms: u64) -> u64 {
        let conn_id = self.next_conn_id;
        self.next_conn_id = self.next_conn_id.wrapping_add(1);
        self.total_connections = self.total_connections.wrapping_add(1);
        self.active_connections = self.active_connections.saturating_add(1);
        self.connections.insert(conn_id, ConnMetrics::new(peer, now_ms));
        conn_id
    }

    fn remove_conn(&mut self, conn_id: u64) {
        self.active_connections = self.active_connections.saturating_sub(1);
        self.connections.remove(&conn_id);
    }

    fn touch_conn(&mut self, conn_id: u64, now_ms: u64) {
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.last_seen_ms = now_ms;
        }
    }

    fn observe_command(&mut self, conn_id: u64, cmd: &azrael_proto::Command, now_ms: u64) {
        if let Some(conn) = self.connections.get_mut(&conn_id) {
            conn.commands_sent += 1;
            conn.last_seen_ms = now_ms;
        }
        *self.commands_by_name.entry(cmd.name()).or_default() += 1;
    }

    fn snapshot(&self, started_at_unix_ms: u64, uptime_ms: u64) -> MetricsResponse {
        let mut connections: Vec<ConnMetricsResponse> = self
            .connections
            .iter()
            .map(|(&conn_id, c)| ConnMetricsResponse {
                conn_id,
                peer: c.peer.to_string(),
                commands_sent: c.commands_sent,
                last_seen_ms: c.last_seen_ms,
            })
            .collect();
        connections.sort_by_key(|c| c.conn_id);

        MetricsResponse {
            started_at_unix_ms,
            uptime_ms,
            active_connections: self.active_connections,
            total_connections: self.total_connections,
            ws_to_uds: DirectionCounters { bytes: self.ws_to_uds_bytes, frames: self.ws_to_uds_frames },
            uds_to_ws: DirectionCounters { bytes: self.uds_to_ws_bytes, frames: self.uds_to_ws_frames },
            invalid_ws_frames: self.invalid_ws_frames,
            decode_errors: self.decode_errors,
            commands_by_name: self.commands_by_name.clone(),
            connections,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Azrael WebSocket gateway")]
struct Args {
    /// TCP listener for browser clients (e.g. 0.0.0.0:8787)
    #[arg(long, default_value = "0.0.0.0:8787")]
    listen: SocketAddr,
    /// Path to the Unix socket exposed by azrael-gateway
    #[arg(long, default_value = "/tmp/azrael-gateway.sock")]
    unix_socket: PathBuf,
    /// Maximum frame payload in bytes (binary WS message must match exact frame length)
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    max_frame_bytes: usize,
    /// Optional allowed Origin values (repeatable). If none provided, all origins are accepted.
    #[arg(long)]
    allow_origin: Vec<String>,
}

#[derive(Clone)]
struct AppState {
    unix_socket: PathBuf,
    max_frame_bytes: usize,
    allow_origins: Option<std::collections::HashSet<String>>,
    started_at_unix_ms: u64,
    start_instant: Instant,
    metrics: Arc<Mutex<GatewayMetrics>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let allow_origins =
        if args.allow_origin.is_empty() { None } else { Some(args.allow_origin.iter().cloned().collect()) };

    let started_at_unix_ms: u64 =
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis().try_into().unwrap_or(0);

    let state = Arc::new(AppState {
        unix_socket: args.unix_socket.clone(),
        max_frame_bytes: args.max_frame_bytes,
        allow_origins,
        started_at_unix_ms,
        start_instant: Instant::now(),
        metrics: Arc::new(Mutex::new(GatewayMetrics::default())),
    });

    let app = Router::new()
        .route("/api/metrics", get(metrics_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let listener = TcpListener::bind(args.listen).await?;
    info!("ws gateway listening on {}", args.listen);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime_ms: u64 = state.start_instant.elapsed().as_millis().try_into().unwrap_or(u64::MAX);

    let snapshot = {
        let metrics = state.metrics.lock().await;
        metrics.snapshot(state.started_at_unix_ms, uptime_ms)
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    (headers, Json(snapshot))
}

async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if !origin_allowed(&state, &headers) {
        let origin = headers.get("origin").and_then(|v| v.to_str().ok()).unwrap_or("<missing>");
        warn!(?addr, origin = %origin, "origin rejected");
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, state, addr)).into_response()
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, peer: SocketAddr) {
    let socket_path = state.unix_socket.clone();
    let unix = match time::timeout(Duration::from_secs(2), UnixStream::connect(&socket_path)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => {
            error!(?err, path = %socket_path.display(), "failed to connect to gateway socket");
            return;
        }
        Err(_) => {
            warn!(?peer, path = %socket_path.display(), "timed out connecting to gateway socket");
            return;
        }
    };

    let conn_id = {
        let now_ms: u64 = state.start_instant.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        let mut metrics = state.metrics.lock().await;
        metrics.alloc_conn(peer, now_ms)
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (mut uds_reader, mut uds_writer) = tokio::io::split(unix);
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(256);

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    let max_len = state.max_frame_bytes;
    let out_tx_clone = out_tx.clone();
    let metrics_uds_to_ws = state.metrics.clone();
    let start_instant_uds_to_ws = state.start_instant;
    let uds_to_ws = tokio::spawn(async move {
        let mut buf = vec![0u8; 16 * 1024];
        let mut acc: Vec<u8> = Vec::with_capacity(32 * 1024);
        loop {
            let n = uds_reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            acc.extend_from_slice(&buf[..n]);
            while let Some(pkt) = try_extract_frame(&mut acc, max_len)? {
                let now_ms: u64 = start_instant_uds_to_ws.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
                {
                    let mut metrics = metrics_uds_to_ws.lock().await;
                    metrics.uds_to_ws_frames = metrics.uds_to_ws_frames.wrapping_add(1);
                    metrics.uds_to_ws_bytes =
                        metrics.uds_to_ws_bytes.wrapping_add(pkt.len().try_into().unwrap_or(u64::MAX));
                    metrics.touch_conn(conn_id, now_ms);
                }
                if out_tx_clone.send(Message::Binary(pkt.into())).await.is_err() {
                    return Ok::<(), anyhow::Error>(());
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    });

    let max_len_ws = state.max_frame_bytes;
    let pong_tx = out_tx.clone();
    let metrics_ws_to_uds = state.metrics.clone();
    let start_instant_ws_to_uds = state.start_instant;
    let ws_to_uds = tokio::spawn(async move {
        while let Some(msg) = ws_rx.next().await {
            match msg {
                Ok(Message::Binary(data)) => {
                    let now_ms: u64 = start_instant_ws_to_uds.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
                    if data.len() > max_len_ws {
                        let mut metrics = metrics_ws_to_uds.lock().await;
                        metrics.invalid_ws_frames = metrics.invalid_ws_frames.wrapping_add(1);
                        metrics.touch_conn(conn_id, now_ms);
                        warn!(?peer, "oversized frame from client");
                        break;
                    }
                    {
                        let mut metrics = metrics_ws_to_uds.lock().await;
                        metrics.ws_to_uds_frames = metrics.ws_to_uds_frames.wrapping_add(1);
                        metrics.ws_to_uds_bytes =
                            metrics.ws_to_uds_bytes.wrapping_add(data.len().try_into().unwrap_or(u64::MAX));
                        match Packet::decode_command(&data) {
                            Ok((cmd, _consumed)) => metrics.observe_command(conn_id, &cmd, now_ms),
                            Err(_) => {
                                metrics.decode_errors = metrics.decode_errors.wrapping_add(1);
                                metrics.touch_conn(conn_id, now_ms);
                            }
                        }
                    }
                    if let Err(err) = uds_writer.write_all(&data).await {
                        warn!(?err, "failed to write to gateway socket");
                        break;
                    }
                }
                Ok(Message::Ping(payload)) => {
                    let _ = pong_tx.send(Message::Pong(payload)).await;
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Text(_)) => {
                    warn!(?peer, "ignoring text frame");
                    break;
                }
                Err(err) => {
                    warn!(?err, ?peer, "ws recv error");
                    break;
                }
                Message::Pong(_) => {}
            }
        }
    });

    let ping_tx = out_tx.clone();
    let ping = tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(30));
        interval.tick().await;
        loop {
            interval.tick().await;
            if ping_tx.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                break;
            }
        }
    });

    let mut ws_to_uds = ws_to_uds;
    let mut uds_to_ws = uds_to_ws;
    let mut writer = writer;

    tokio::select! {
        res = &mut ws_to_uds => log_void_task_result("ws_to_uds", peer, res),
        res = &mut uds_to_ws => log_result_task_result("uds_to_ws", peer, res),
        res = &mut writer => log_void_task_result("writer", peer, res),
    }

    ping.abort();
    ws_to_uds.abort();
    uds_to_ws.abort();
    writer.abort();
    drop(out_tx);

    {
        let mut metrics = state.metrics.lock().await;
        metrics.remove_conn(conn_id);
    }
}

fn origin_allowed(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(allow) = &state.allow_origins else { return true };
    if let Some(origin) = headers.get("origin") {
        if let Ok(origin_str) = origin.to_str() {
            return allow.contains(origin_str);
        }
    }
    false
}

fn log_void_task_result(name: &'static str, peer: SocketAddr, res: TaskResult<()>) {
    match res {
        Ok(()) => {}
        Err(err) => log_join_error(name, peer, err),
    }
}

fn log_result_task_result(name: &'static str, peer: SocketAddr, res: TaskResult<Result<(), anyhow::Error>>) {
    match res {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(?peer, ?err, "{name} task returned error"),
        Err(err) => log_join_error(name, peer, err),
    }
}

fn log_join_error(name: &'static str, peer: SocketAddr, err: JoinError) {
    if err.is_cancelled() {
        return;
    }
    if err.is_panic() {
        error!(?peer, ?err, "{name} task panicked");
    } else {
        warn!(?peer, ?err, "{name} task failed");
    }
}

/// Pull one length-prefixed frame off the front of `acc`, if a complete one
/// is buffered. Leaves `acc` untouched when the frame is still incomplete.
fn try_extract_frame(acc: &mut Vec<u8>, max_payload: usize) -> Result<Option<Vec<u8>>> {
    if acc.len() < FRAME_HEADER_BYTES {
        return Ok(None);
    }
    let payload_len = u32::from_be_bytes([acc[0], acc[1], acc[2], acc[3]]) as usize;
    if payload_len > max_payload {
        return Err(anyhow!("payload too large ({payload_len} > {max_payload})"));
    }
    let frame_len = FRAME_HEADER_BYTES
        .checked_add(payload_len)
        .ok_or_else(|| anyhow!("frame length overflow"))?;
    if acc.len() < frame_len {
        return Ok(None);
    }
    let pkt: Vec<u8> = acc.drain(..frame_len).collect();
    Ok(Some(pkt))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn make_frame(payload_len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; FRAME_HEADER_BYTES + payload_len];
        buf[..4].copy_from_slice(&(payload_len as u32).to_be_bytes());
        buf
    }

    #[test]
    fn try_extract_frame_drains_one_frame_and_preserves_remainder() {
        let f1 = make_frame(2);
        let f2 = make_frame(3);
        let mut acc = [f1.clone(), f2.clone()].concat();

        let pkt1 = try_extract_frame(&mut acc, 8).unwrap().expect("pkt1");
        assert_eq!(pkt1, f1);
        assert_eq!(acc, f2);

        let pkt2 = try_extract_frame(&mut acc, 8).unwrap().expect("pkt2");
        assert_eq!(pkt2, f2);
        assert!(acc.is_empty());
    }

    #[test]
    fn try_extract_frame_returns_none_for_partial_header() {
        let mut acc = vec![0u8; FRAME_HEADER_BYTES - 1];
        let pkt = try_extract_frame(&mut acc, 8).unwrap();
        assert!(pkt.is_none());
        assert_eq!(acc.len(), FRAME_HEADER_BYTES - 1);
    }

    #[test]
    fn try_extract_frame_returns_none_for_partial_frame() {
        let full = make_frame(5);
        let mut acc = full[..full.len() - 1].to_vec();
        let pkt = try_extract_frame(&mut acc, 8).unwrap();
        assert!(pkt.is_none());
        assert_eq!(acc.len(), full.len() - 1);
    }

    #[test]
    fn try_extract_frame_errors_on_payload_too_large_without_draining() {
        let mut acc = make_frame(6);
        let err = try_extract_frame(&mut acc, 5).expect_err("expected payload-too-large error");
        assert!(err.to_string().contains("payload too large"));
        assert_eq!(acc.len(), FRAME_HEADER_BYTES + 6);
    }
}
