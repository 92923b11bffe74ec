use std::time::Duration;

use clap::Parser;

use crate::signaling::{DEFAULT_ROOM, DEFAULT_SIGNALING_PORT, ServerConfig};

/// Duet signaling server
///
/// Pairs two browser peers per room and relays their WebRTC handshake.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Interface to bind
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_SIGNALING_PORT, env = "PORT")]
    pub port: u16,

    /// Seconds between keepalive pings
    #[arg(
        long,
        default_value_t = 30,
        env = "PING_INTERVAL_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub ping_interval_secs: u64,

    /// Seconds to wait for a pong before dropping the client
    #[arg(
        long,
        default_value_t = 10,
        env = "PONG_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub pong_timeout_secs: u64,

    /// Room used when a join names none
    #[arg(long, default_value = DEFAULT_ROOM, env = "DEFAULT_ROOM")]
    pub default_room: String,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            ping_interval: Duration::from_secs(self.ping_interval_secs),
            pong_timeout: Duration::from_secs(self.pong_timeout_secs),
            default_room: self.default_room.clone(),
        }
    }
}
