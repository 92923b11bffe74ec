use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tracing::{debug, error, info, warn};

use super::actor::CoordinatorHandle;
use super::coordinator::{Coordinator, DEFAULT_ROOM};
use super::types::{ConnectionId, Outbound};

pub const DEFAULT_SIGNALING_PORT: u16 = 3000;
const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime knobs for the WebSocket front end
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
    /// Room used when a `join` carries no usable room key
    pub default_room: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ping_interval: PING_INTERVAL,
            pong_timeout: PONG_TIMEOUT,
            default_room: DEFAULT_ROOM.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Keepalive {
    ping_interval: Duration,
    pong_timeout: Duration,
}

pub struct SignalingServer {
    handle: CoordinatorHandle,
    keepalive: Keepalive,
}

impl Default for SignalingServer {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

impl SignalingServer {
    /// Must be called inside a tokio runtime; spawns the coordinator actor.
    pub fn new(config: ServerConfig) -> Self {
        let handle = CoordinatorHandle::spawn(Coordinator::new(config.default_room));

        Self {
            handle,
            keepalive: Keepalive {
                ping_interval: config.ping_interval,
                pong_timeout: config.pong_timeout,
            },
        }
    }

    pub async fn run(&self, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Accept loop over an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> std::io::Result<()> {
        info!("Signaling server listening on {}", listener.local_addr()?);

        loop {
            let (stream, addr) = listener.accept().await?;
            let handle = self.handle.clone();
            let keepalive = self.keepalive;

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, handle, keepalive).await {
                    error!("Connection error from {}: {}", addr, e);
                }
            });
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    handle: CoordinatorHandle,
    keepalive: Keepalive,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    let conn = ConnectionId::next();
    info!("WebSocket connection {} from {}", conn, addr);

    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel::<Message>();

    handle.connect(conn, tx).await?;

    let mut ping_interval = tokio::time::interval(keepalive.ping_interval);
    // first tick completes immediately
    ping_interval.tick().await;
    let mut waiting_for_pong = false;
    let mut pong_deadline: Option<tokio::time::Instant> = None;

    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(out) = rx.recv() => {
                    match out {
                        Outbound::Text(msg) => {
                            if ws_tx.send(Message::Text(msg.into_inner())).await.is_err() {
                                break;
                            }
                        }
                        Outbound::Close => {
                            let _ = ws_tx.send(Message::Close(None)).await;
                            break;
                        }
                    }
                }
                Some(ctrl_msg) = ctrl_rx.recv() => {
                    if ws_tx.send(ctrl_msg).await.is_err() {
                        break;
                    }
                }
                else => break,
            }
        }
    });

    loop {
        let pong_timeout = async {
            match pong_deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = &mut send_task => {
                debug!("Writer for {} finished", conn);
                break;
            }

            _ = ping_interval.tick() => {
                if waiting_for_pong {
                    warn!("No Pong received, disconnecting {}", conn);
                    break;
                }
                if ctrl_tx.send(Message::Ping(Bytes::new())).is_err() {
                    break;
                }
                waiting_for_pong = true;
                pong_deadline = Some(tokio::time::Instant::now() + keepalive.pong_timeout);
                debug!("Ping sent to {}", conn);
            }

            _ = pong_timeout => {
                warn!("Pong timeout, disconnecting {}", conn);
                break;
            }

            msg = ws_rx.next() => {
                let msg = match msg {
                    Some(Ok(m)) => m,
                    Some(Err(e)) => {
                        warn!("WebSocket error on {}: {}", conn, e);
                        break;
                    }
                    None => break,
                };

                match msg {
                    Message::Text(text) => {
                        if let Err(e) = handle.inbound(conn, text).await {
                            warn!("Dropping {}: {}", conn, e);
                            break;
                        }
                    }
                    Message::Pong(_) => {
                        waiting_for_pong = false;
                        pong_deadline = None;
                        debug!("Pong received from {}", conn);
                    }
                    Message::Close(_) => {
                        info!("Close received from {}", conn);
                        break;
                    }
                    Message::Binary(_) => debug!("Ignoring binary frame from {}", conn),
                    _ => {}
                }
            }
        }
    }

    handle.disconnect(conn).await;

    send_task.abort();
    info!("WebSocket disconnected: {} ({})", conn, addr);

    Ok(())
}
