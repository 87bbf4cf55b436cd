//! # Shooter Client Library
//!
//! Headless client side of the LAN shooter: finding servers on the local
//! network and talking to one over its JSON-lines protocol.
//!
//! ## Module Organization
//!
//! ### Discovery Module (`discovery`)
//! - Broadcasts the `DISCOVER` probe and collects `SERVER ...` replies
//! - Unicast probing of a single known host
//! - Parsed server listings with capacity information
//!
//! ### Network Module (`network`)
//! - TCP connection with an automatic `join` request
//! - Background decoding of `welcome`, `world_state`, `damage` and `error` lines
//! - Typed senders for `state` and `shoot` messages
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::discovery::DiscoveryClient;
//! use client::network::NetworkClient;
//!
//! # async fn demo() -> std::io::Result<()> {
//! let servers = DiscoveryClient::default().scan().await?;
//! if let Some(server) = servers.iter().find(|s| !s.is_full()) {
//!     let mut client = NetworkClient::connect(server.game_addr(), "Bot").await?;
//!     while let Some(message) = client.next_message().await {
//!         println!("{:?}", message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod network;
