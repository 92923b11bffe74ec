use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::info;

use super::types::{ConnectionId, Role, RoomKey, SignalingError};

/// Result of asking the registry to admit a connection into a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomOutcome {
    /// Room was created, the connection is its only member
    AssignedInitiator,
    /// Connection became the second member; `notify` is the initiator
    AssignedResponder { notify: ConnectionId },
    /// Room already holds two members, nothing changed
    RoomFull,
}

/// What is left behind after a connection leaves its room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room: RoomKey,
    pub remaining: Option<ConnectionId>,
    /// The remaining member was the responder and now holds the initiator slot
    pub promoted: bool,
}

/// Per-connection record, keyed by connection id
#[derive(Debug, Clone)]
pub struct Membership {
    pub room: RoomKey,
    pub display_name: String,
}

// Members are ordered by arrival: the initiator slot is always filled while
// the room exists.
#[derive(Debug)]
struct Room {
    initiator: ConnectionId,
    responder: Option<ConnectionId>,
}

/// In-memory room table. Owns every room and membership record; sends nothing.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomKey, Room>,
    members: HashMap<ConnectionId, Membership>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(
        &mut self,
        conn: ConnectionId,
        room: RoomKey,
        display_name: String,
    ) -> Result<RoomOutcome, SignalingError> {
        if let Some(existing) = self.members.get(&conn) {
            return Err(SignalingError::AlreadyJoined(conn, existing.room.clone()));
        }

        let outcome = match self.rooms.entry(room.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(Room {
                    initiator: conn,
                    responder: None,
                });
                info!("Room {} created by {}", room, conn);
                RoomOutcome::AssignedInitiator
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if existing.responder.is_some() {
                    return Ok(RoomOutcome::RoomFull);
                }
                existing.responder = Some(conn);
                RoomOutcome::AssignedResponder {
                    notify: existing.initiator,
                }
            }
        };

        self.members.insert(conn, Membership { room, display_name });
        Ok(outcome)
    }

    /// Co-member of `conn`'s room, if `conn` is joined and not alone
    pub fn other_member(&self, conn: &ConnectionId) -> Option<ConnectionId> {
        let membership = self.members.get(conn)?;
        let room = self.rooms.get(&membership.room)?;
        if room.initiator == *conn {
            room.responder
        } else {
            Some(room.initiator)
        }
    }

    pub fn leave(&mut self, conn: &ConnectionId) -> Option<Departure> {
        let membership = self.members.remove(conn)?;
        let room_key = membership.room;

        let Entry::Occupied(mut slot) = self.rooms.entry(room_key.clone()) else {
            return Some(Departure {
                room: room_key,
                remaining: None,
                promoted: false,
            });
        };

        let room = slot.get_mut();
        let (remaining, promoted) = if room.initiator == *conn {
            match room.responder.take() {
                Some(next) => {
                    room.initiator = next;
                    (Some(next), true)
                }
                None => {
                    slot.remove();
                    info!("Room {} removed (empty)", room_key);
                    (None, false)
                }
            }
        } else {
            room.responder = None;
            (Some(room.initiator), false)
        };

        Some(Departure {
            room: room_key,
            remaining,
            promoted,
        })
    }

    pub fn membership(&self, conn: &ConnectionId) -> Option<&Membership> {
        self.members.get(conn)
    }

    pub fn role(&self, conn: &ConnectionId) -> Role {
        let Some(room) = self
            .members
            .get(conn)
            .and_then(|m| self.rooms.get(&m.room))
        else {
            return Role::Unassigned;
        };

        if room.initiator == *conn {
            Role::Initiator
        } else if room.responder == Some(*conn) {
            Role::Responder
        } else {
            Role::Unassigned
        }
    }

    /// Members of a room in arrival order
    pub fn members(&self, room: &RoomKey) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|r| std::iter::once(r.initiator).chain(r.responder).collect())
            .unwrap_or_default()
    }

    pub fn contains_room(&self, room: &RoomKey) -> bool {
        self.rooms.contains_key(room)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn connection_count(&self) -> usize {
        self.members.len()
    }
}
