//! Runtime configuration for the dedicated server.

use crate::error::{Result, ServerError};
use shared::{
    DEFAULT_DISCOVERY_PORT, DEFAULT_GAME_PORT, DEFAULT_HOST, DEFAULT_MAX_PLAYERS,
    DEFAULT_TICK_RATE,
};
use std::time::Duration;

/// Highest accepted tick rate; one tick per millisecond.
pub const MAX_TICK_RATE: u32 = 1000;

/// Server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Interface both sockets bind to.
    pub host: String,
    /// TCP port for game connections. 0 picks an ephemeral port.
    pub game_port: u16,
    /// UDP port answering discovery probes. 0 picks an ephemeral port.
    pub discovery_port: u16,
    /// Name advertised to discovery probes.
    pub name: String,
    pub max_players: usize,
    /// World ticks per second.
    pub tick_rate: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            game_port: DEFAULT_GAME_PORT,
            discovery_port: DEFAULT_DISCOVERY_PORT,
            name: "Shooter Server".to_string(),
            max_players: DEFAULT_MAX_PLAYERS,
            tick_rate: DEFAULT_TICK_RATE,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_rate == 0 {
            return Err(ServerError::InvalidConfig(
                "tick rate must be at least 1".to_string(),
            ));
        }
        if self.tick_rate > MAX_TICK_RATE {
            return Err(ServerError::InvalidConfig(format!(
                "tick rate must be at most {}",
                MAX_TICK_RATE
            )));
        }
        if self.max_players == 0 {
            return Err(ServerError::InvalidConfig(
                "max players must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Nominal duration of one world tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn game_addr(&self) -> String {
        format!("{}:{}", self.host, self.game_port)
    }

    pub fn discovery_addr(&self) -> String {
        format!("{}:{}", self.host, self.discovery_port)
    }
}
