//! # Dedicated Game Server Library
//!
//! Authoritative server for a LAN first-person shooter. Clients report their
//! own movement and aim; the server owns projectiles, hit detection, damage
//! and respawns, and broadcasts one world snapshot per tick to everyone.
//!
//! ## Core Responsibilities
//!
//! ### Session Management
//! Each TCP connection may join once and becomes a session in the
//! [`sessions::SessionRegistry`]. Capacity is enforced on join; a session is
//! removed whenever its connection ends, however it ends.
//!
//! ### Projectile Simulation
//! Projectiles live in the [`projectiles::ProjectileStore`]. Every tick they
//! advance along their direction, are tested against every session except
//! their owner, and expire after a fixed lifetime.
//!
//! ### State Broadcasting
//! After each tick the server serializes a single snapshot and queues it on
//! every session's outbound channel. A dead recipient is skipped without
//! affecting anyone else.
//!
//! ### LAN Discovery
//! A UDP responder answers `DISCOVER` probes with the server's name, game
//! port, player count and capacity.
//!
//! ## Concurrency Model
//!
//! Both registries sit behind one `tokio::sync::RwLock` ([`game::SharedState`]).
//! Connection handlers, the world loop and the discovery responder each take
//! it for one short operation and never hold it across network I/O: outbound
//! messages go through bounded channels drained by per-connection writer
//! tasks, and a peer that stops reading misses snapshots instead of stalling
//! the tick.
//!
//! ## Module Organization
//!
//! - `config`: server configuration and validation
//! - `error`: error taxonomy
//! - `sessions`: session registry
//! - `projectiles`: projectile store
//! - `game`: world state and tick step
//! - `broadcast`: snapshot and damage fan-out
//! - `connection`: per-connection protocol state machine
//! - `discovery`: UDP discovery responder
//! - `network`: socket setup, accept loop and world loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind(ServerConfig::default()).await?;
//!
//!     // Runs until Ctrl+C: accepts players, ticks the world at the
//!     // configured rate and answers discovery probes.
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod game;
pub mod network;
pub mod projectiles;
pub mod sessions;
