use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;
use thiserror::Error;

use super::types::{OutboundMessage, Role, RoomKey, SignalingError};

/// Why an inbound frame was not turned into a `ClientMessage`
#[derive(Debug, Error)]
pub enum InboundError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unknown message type: {0}")]
    UnknownType(String),
}

/// Messages sent from client to server
#[derive(Debug)]
pub enum ClientMessage {
    /// Enter a room. Both fields are coerced later, see [`coerce_text`].
    Join {
        room: Option<Value>,
        user: Option<Value>,
    },

    /// Opaque handshake payload for the other member, kept as raw JSON text
    Signal { data: Option<Box<RawValue>> },

    /// Close this connection
    Goodbye,
}

// Flat view of any inbound frame. `data` must stay a RawValue so it is
// forwarded without re-encoding, which rules out an internally tagged enum.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    room: Option<Value>,
    #[serde(default)]
    user: Option<Value>,
    #[serde(default, deserialize_with = "present_raw")]
    data: Option<Box<RawValue>>,
}

// A present `data` is kept even when it is `null`; only a missing field is `None`.
fn present_raw<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error> {
    Box::<RawValue>::deserialize(deserializer).map(Some)
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, InboundError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        match envelope.kind.as_str() {
            "join" => Ok(ClientMessage::Join {
                room: envelope.room,
                user: envelope.user,
            }),
            "signal" => Ok(ClientMessage::Signal {
                data: envelope.data,
            }),
            "goodbye" => Ok(ClientMessage::Goodbye),
            _ => Err(InboundError::UnknownType(envelope.kind)),
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Join succeeded, tells the member which side of the handshake it plays
    RoomStatus { role: Role, room: RoomKey },

    /// Sent to the initiator when a responder arrives
    PeerJoined { user: String },

    PeerLeft,

    RoomFull { room: RoomKey },

    /// Relayed handshake payload, passed through unmodified
    Signal {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Box<RawValue>>,
    },
}

impl ServerMessage {
    pub fn encode(&self) -> Result<OutboundMessage, SignalingError> {
        Ok(OutboundMessage::from(serde_json::to_string(self)?))
    }
}

/// Turns a loosely typed `room`/`user` field into text.
///
/// Strings pass through. Missing, `null`, `false`, `0` and `""` yield `None`
/// so the caller can apply its default. Anything else uses its JSON text,
/// so `1.0` stays `"1.0"` and `["a","b"]` stays `["a","b"]`; this is
/// intentional and differs from JavaScript's `String()` coercion.
pub fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}
