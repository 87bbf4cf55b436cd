//! Types and constants shared by the dedicated server and game clients.

pub mod protocol;
pub mod vector;

pub use protocol::{
    is_discovery_probe, ClientMessage, DiscoveryReply, EntityId, ParseReplyError, PlayerView,
    ProjectileView, ServerMessage, DISCOVERY_PROBE,
};
pub use vector::{NonFiniteVector, Vec3};

/// Hit radius around a player's reported position.
pub const PLAYER_RADIUS: f32 = 0.8;
pub const PROJECTILE_SPEED: f32 = 18.0;
/// Seconds a projectile stays alive when it hits nothing.
pub const PROJECTILE_LIFETIME: f32 = 3.0;
pub const PROJECTILE_DAMAGE: i32 = 25;
pub const MAX_HEALTH: i32 = 100;
pub const RESPAWN_HEIGHT: f32 = 3.0;
pub const RESPAWN_POINT: Vec3 = Vec3::new(0.0, RESPAWN_HEIGHT, 0.0);
pub const DEFAULT_PLAYER_NAME: &str = "Player";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_GAME_PORT: u16 = 50000;
pub const DEFAULT_DISCOVERY_PORT: u16 = 50001;
pub const DEFAULT_TICK_RATE: u32 = 30;
pub const DEFAULT_MAX_PLAYERS: usize = 8;
