//! Signaling relay pairing two browser peers per room.
//!
//! Clients connect over WebSocket, `join` a room, and exchange opaque
//! `signal` payloads (session descriptions, ICE candidates) with the one
//! other member until their direct connection is up.

pub mod config;
pub mod signaling;
