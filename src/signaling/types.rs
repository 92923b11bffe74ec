use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tokio_tungstenite::tungstenite::Utf8Bytes;

/// Signaling errors
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("connection {0} already joined room {1}")]
    AlreadyJoined(ConnectionId, RoomKey),

    #[error("connection id {0} is already registered")]
    DuplicateConnection(ConnectionId),

    #[error("coordinator actor is not running")]
    ActorUnavailable,

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

const HEX_CHARS: &[u8] = b"0123456789abcdef";
const CONNECTION_ID_LEN: usize = 21;

static NEXT_CONNECTION: AtomicU64 = AtomicU64::new(1);

/// Connection ID: 21-byte fixed array ("conn_" + 16 hex), unique per process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    bytes: [u8; CONNECTION_ID_LEN],
    len: u8,
}

impl ConnectionId {
    /// Next id from a process-wide counter; never repeats.
    pub fn next() -> Self {
        Self::from_sequence(NEXT_CONNECTION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn from_sequence(value: u64) -> Self {
        let mut bytes = [0u8; CONNECTION_ID_LEN];
        bytes[..5].copy_from_slice(b"conn_");

        for i in 0..16 {
            let nibble = ((value >> (60 - i * 4)) & 0xF) as usize;
            bytes[5 + i] = HEX_CHARS[nibble];
        }
        Self {
            bytes,
            len: CONNECTION_ID_LEN as u8,
        }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        assert!(s.len() <= CONNECTION_ID_LEN, "connection id too long: {s}");
        let mut bytes = [0u8; CONNECTION_ID_LEN];
        bytes[..s.len()].copy_from_slice(s.as_bytes());
        Self {
            bytes,
            len: s.len() as u8,
        }
    }
}

/// Room key chosen by the clients. Any string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomKey(String);

impl RoomKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl Serialize for RoomKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RoomKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(RoomKey)
    }
}

/// Role a member holds inside its room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Unassigned,
    /// Produces the first offer once a peer arrives
    Initiator,
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Unassigned => "unassigned",
            Role::Initiator => "initiator",
            Role::Responder => "responder",
        })
    }
}

/// Wrapper for outbound WebSocket text using tungstenite's Utf8Bytes.
#[derive(Debug, Clone)]
pub struct OutboundMessage(Utf8Bytes);

impl OutboundMessage {
    pub fn new(s: impl Into<Utf8Bytes>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the inner Utf8Bytes for tungstenite Message::Text
    pub fn into_inner(self) -> Utf8Bytes {
        self.0
    }
}

impl From<String> for OutboundMessage {
    fn from(s: String) -> Self {
        Self(Utf8Bytes::from(s))
    }
}

/// What the coordinator asks a connection's writer to do.
#[derive(Debug, Clone)]
pub enum Outbound {
    Text(OutboundMessage),
    /// Send a close frame and stop writing
    Close,
}
