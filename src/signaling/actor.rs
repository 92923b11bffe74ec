use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Utf8Bytes;
use tracing::info;

use super::coordinator::Coordinator;
use super::types::{ConnectionId, Outbound, SignalingError};

/// Commands sent to the coordinator actor
pub(crate) enum CoordinatorCommand {
    Connect {
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<Outbound>,
        reply: oneshot::Sender<Result<(), SignalingError>>,
    },
    Inbound {
        conn: ConnectionId,
        text: Utf8Bytes,
    },
    Disconnect {
        conn: ConnectionId,
    },
}

/// Sole owner of the coordinator (and so of the room registry). Commands are
/// applied one at a time in arrival order.
pub(crate) async fn coordinator_actor(
    mut coordinator: Coordinator,
    mut rx: mpsc::Receiver<CoordinatorCommand>,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            CoordinatorCommand::Connect { conn, tx, reply } => {
                let _ = reply.send(coordinator.connect(conn, tx));
            }
            CoordinatorCommand::Inbound { conn, text } => coordinator.handle_text(conn, &text),
            CoordinatorCommand::Disconnect { conn } => coordinator.disconnect(conn),
        }
    }

    info!(
        "Coordinator stopped with {} rooms still open",
        coordinator.registry().room_count()
    );
}

/// Handle to communicate with the coordinator actor
#[derive(Clone)]
pub struct CoordinatorHandle {
    pub(crate) tx: mpsc::Sender<CoordinatorCommand>,
}

impl CoordinatorHandle {
    /// Spawn the actor on the current runtime
    pub fn spawn(coordinator: Coordinator) -> Self {
        let (tx, rx) = mpsc::channel::<CoordinatorCommand>(1024);
        tokio::spawn(coordinator_actor(coordinator, rx));
        Self { tx }
    }

    /// Register a new connection and the channel its writer drains.
    /// Fails if `conn` is already live.
    pub async fn connect(
        &self,
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<Outbound>,
    ) -> Result<(), SignalingError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CoordinatorCommand::Connect {
            conn,
            tx,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| SignalingError::ActorUnavailable)?
    }

    /// Forward a text frame received from `conn`
    pub async fn inbound(&self, conn: ConnectionId, text: Utf8Bytes) -> Result<(), SignalingError> {
        self.send(CoordinatorCommand::Inbound { conn, text }).await
    }

    /// Transport for `conn` closed
    pub async fn disconnect(&self, conn: ConnectionId) {
        let _ = self.send(CoordinatorCommand::Disconnect { conn }).await;
    }

    async fn send(&self, cmd: CoordinatorCommand) -> Result<(), SignalingError> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| SignalingError::ActorUnavailable)
    }
}
