use std::collections::HashMap;
use std::collections::hash_map::Entry;

use rand::Rng;
use serde_json::Value;
use serde_json::value::RawValue;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::{ClientMessage, ServerMessage, coerce_text};
use super::registry::{RoomOutcome, RoomRegistry};
use super::types::{ConnectionId, Outbound, Role, RoomKey, SignalingError};

pub const DEFAULT_ROOM: &str = "lobby";

/// Outbound side of one connection as the coordinator sees it
#[derive(Debug)]
struct PeerLink {
    tx: mpsc::UnboundedSender<Outbound>,
    /// Cleared once a close was requested; the writer may still be draining
    open: bool,
}

impl PeerLink {
    fn is_open(&self) -> bool {
        self.open && !self.tx.is_closed()
    }
}

/// Room lifecycle and relay logic. Drives the registry and decides which
/// connection receives what; knows nothing about sockets.
#[derive(Debug)]
pub struct Coordinator {
    registry: RoomRegistry,
    links: HashMap<ConnectionId, PeerLink>,
    default_room: String,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new(DEFAULT_ROOM)
    }
}

impl Coordinator {
    pub fn new(default_room: impl Into<String>) -> Self {
        Self {
            registry: RoomRegistry::new(),
            links: HashMap::new(),
            default_room: default_room.into(),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Registers the writer for `conn`. An id that is already live is
    /// refused and the existing link stays untouched.
    pub fn connect(
        &mut self,
        conn: ConnectionId,
        tx: mpsc::UnboundedSender<Outbound>,
    ) -> Result<(), SignalingError> {
        match self.links.entry(conn) {
            Entry::Occupied(_) => {
                warn!("Connection id {} already registered, refusing duplicate", conn);
                Err(SignalingError::DuplicateConnection(conn))
            }
            Entry::Vacant(slot) => {
                slot.insert(PeerLink { tx, open: true });
                debug!("Connection {} registered", conn);
                Ok(())
            }
        }
    }

    /// Raw text frame from `conn`. Frames that do not parse are dropped.
    pub fn handle_text(&mut self, conn: ConnectionId, text: &str) {
        match ClientMessage::parse(text) {
            Ok(msg) => self.handle_message(conn, msg),
            Err(e) => debug!("Discarding frame from {}: {}", conn, e),
        }
    }

    pub fn handle_message(&mut self, conn: ConnectionId, msg: ClientMessage) {
        if !self.links.get(&conn).is_some_and(PeerLink::is_open) {
            debug!("Ignoring message from closed connection {}", conn);
            return;
        }

        match msg {
            ClientMessage::Join { room, user } => self.join(conn, room, user),
            ClientMessage::Signal { data } => self.relay(conn, data),
            ClientMessage::Goodbye => {
                debug!("Goodbye from {}", conn);
                self.close(conn);
            }
        }
    }

    /// Transport for `conn` is gone: leave the room and tell whoever remains.
    pub fn disconnect(&mut self, conn: ConnectionId) {
        self.links.remove(&conn);

        let Some(departure) = self.registry.leave(&conn) else {
            return;
        };
        info!("Connection {} left room {}", conn, departure.room);

        if let Some(remaining) = departure.remaining {
            self.deliver(remaining, &ServerMessage::PeerLeft);
            if departure.promoted {
                info!("{} promoted to initiator in room {}", remaining, departure.room);
                self.deliver(
                    remaining,
                    &ServerMessage::RoomStatus {
                        role: Role::Initiator,
                        room: departure.room,
                    },
                );
            }
        }
    }

    fn join(&mut self, conn: ConnectionId, room: Option<Value>, user: Option<Value>) {
        let room = RoomKey::new(
            coerce_text(room.as_ref()).unwrap_or_else(|| self.default_room.clone()),
        );
        let user = coerce_text(user.as_ref()).unwrap_or_else(guest_name);

        let outcome = match self.registry.join(conn, room.clone(), user.clone()) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("Ignoring join from {}: {}", conn, e);
                return;
            }
        };

        match outcome {
            RoomOutcome::AssignedInitiator => {
                info!("{} ({}) joined room {} as initiator", user, conn, room);
                self.deliver(
                    conn,
                    &ServerMessage::RoomStatus {
                        role: Role::Initiator,
                        room,
                    },
                );
            }
            RoomOutcome::AssignedResponder { notify } => {
                info!("{} ({}) joined room {} as responder", user, conn, room);
                self.deliver(
                    conn,
                    &ServerMessage::RoomStatus {
                        role: Role::Responder,
                        room,
                    },
                );
                self.deliver(notify, &ServerMessage::PeerJoined { user });
            }
            RoomOutcome::RoomFull => {
                info!("Room {} is full, rejecting {}", room, conn);
                self.deliver(conn, &ServerMessage::RoomFull { room });
                self.close(conn);
            }
        }
    }

    fn relay(&mut self, conn: ConnectionId, data: Option<Box<RawValue>>) {
        let Some(target) = self.registry.other_member(&conn) else {
            debug!("No peer for signal from {}, dropped", conn);
            return;
        };

        if self.deliver(target, &ServerMessage::Signal { data }) {
            debug!("Relayed signal {} -> {}", conn, target);
        } else {
            debug!("Peer {} not open, signal from {} dropped", target, conn);
        }
    }

    fn close(&mut self, conn: ConnectionId) {
        if let Some(link) = self.links.get_mut(&conn) {
            if link.open {
                link.open = false;
                let _ = link.tx.send(Outbound::Close);
            }
        }
    }

    /// Fire-and-forget send. Returns false when the target is not open.
    fn deliver(&self, conn: ConnectionId, msg: &ServerMessage) -> bool {
        let Some(link) = self.links.get(&conn).filter(|l| l.is_open()) else {
            return false;
        };

        match msg.encode() {
            Ok(text) => link.tx.send(Outbound::Text(text)).is_ok(),
            Err(e) => {
                warn!("Failed to encode message for {}: {}", conn, e);
                false
            }
        }
    }
}

fn guest_name() -> String {
    format!("Guest-{:04}", rand::rng().random_range(0..10_000))
}
