// SPDX-License-Identifier: Apache-2.0
//! Azrael Gateway: a Unix-socket request/reply server fronting the Template
//! Registry, Object Store, and Constraint Registry, with a background task
//! ticking the reference Physics Worker against the same Command Queue.

mod clerk;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use azrael_app_core::config::ConfigService;
use azrael_cas::MemoryAssetStore;
use azrael_config_fs::FsConfigStore;
use azrael_igor::ConstraintRegistry;
use azrael_proto::{default_socket_path, wire::Packet, Reply};
use azrael_queue::CommandQueue;
use azrael_store::InMemoryStore;
use azrael_worker::SemiImplicitEulerWorld;
use clerk::Clerk;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GatewayPrefs {
    socket_path: String,
    tick_hz: f64,
}

impl Default for GatewayPrefs {
    fn default() -> Self {
        Self { socket_path: default_socket_path().display().to_string(), tick_hz: 60.0 }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config: Option<ConfigService<FsConfigStore>> =
        FsConfigStore::new().map(ConfigService::new).ok();

    let prefs: GatewayPrefs =
        config.as_ref().and_then(|c| c.load::<GatewayPrefs>("gateway").ok().flatten()).unwrap_or_default();
    if let Some(cfg) = &config {
        let _ = cfg.save("gateway", &prefs);
    }

    let queue = Arc::new(CommandQueue::new());
    let store = Arc::new(InMemoryStore::new(Arc::new(MemoryAssetStore::new()), queue.clone()));
    let constraints = Arc::new(ConstraintRegistry::new());
    let clerk = Arc::new(Clerk::new(store.clone(), constraints));

    tokio::spawn(run_physics_loop(store, queue, prefs.tick_hz));

    let _ = std::fs::remove_file(&prefs.socket_path);
    let listener = UnixListener::bind(&prefs.socket_path)?;
    info!("gateway listening at {}", prefs.socket_path);

    loop {
        let (stream, _) = listener.accept().await?;
        let clerk = clerk.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_client(stream, &clerk).await {
                warn!(?err, "client handler error");
            }
        });
    }
}

/// Drain the Command Queue into the reference Physics Worker and write its
/// results back to the store, once per tick.
async fn run_physics_loop(store: Arc<InMemoryStore>, queue: Arc<CommandQueue>, tick_hz: f64) {
    let dt = 1.0 / tick_hz.max(1.0);
    let mut interval = tokio::time::interval(Duration::from_secs_f64(dt));
    let mut world = SemiImplicitEulerWorld::new();
    loop {
        interval.tick().await;
        azrael_worker::tick(&mut world, &queue, &store, dt);
    }
}

async fn handle_client(stream: UnixStream, clerk: &Arc<Clerk>) -> Result<()> {
    let (mut reader, mut writer) = stream.into_split();

    const MAX_PAYLOAD: usize = 16 * 1024 * 1024;
    let mut read_buf = vec![0u8; 16 * 1024];
    let mut acc: Vec<u8> = Vec::with_capacity(32 * 1024);
    loop {
        let n = reader.read(&mut read_buf).await?;
        if n == 0 {
            return Ok(());
        }
        acc.extend_from_slice(&read_buf[..n]);

        loop {
            if acc.len() < 4 {
                break;
            }
            let len = u32::from_be_bytes([acc[0], acc[1], acc[2], acc[3]]) as usize;
            if len > MAX_PAYLOAD {
                warn!("payload too large from client");
                return Ok(());
            }
            let frame_len = 4 + len;
            if acc.len() < frame_len {
                break;
            }

            let reply = match Packet::decode_command(&acc[..frame_len]) {
                Ok((cmd, _consumed)) => clerk.dispatch(cmd),
                Err(err) => {
                    warn!(?err, "malformed request frame");
                    Reply::err(format!("malformed request: {err}"))
                }
            };
            acc.drain(..frame_len);

            let framed = Packet::encode_reply(&reply)?;
            writer.write_all(&framed).await?;
        }
    }
}
