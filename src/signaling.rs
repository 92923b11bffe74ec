//! WebSocket signaling relay for two-party rooms

mod actor;
mod coordinator;
mod messages;
mod registry;
mod server;
mod types;

pub use actor::CoordinatorHandle;
pub use coordinator::{Coordinator, DEFAULT_ROOM};
pub use messages::{ClientMessage, InboundError, ServerMessage, coerce_text};
pub use registry::{Departure, Membership, RoomOutcome, RoomRegistry};
pub use server::{DEFAULT_SIGNALING_PORT, ServerConfig, SignalingServer};
pub use types::{ConnectionId, Outbound, OutboundMessage, Role, RoomKey, SignalingError};
