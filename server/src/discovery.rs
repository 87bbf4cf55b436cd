//! LAN discovery responder.
//!
//! Listens on a UDP port for the literal `DISCOVER` probe and answers the
//! sender with `SERVER <name> <port> <players> <max_players>`. Runs on its own
//! task; it only takes the world lock briefly to read the session count.

use crate::error::{Result, ServerError};
use crate::game::SharedState;
use log::{debug, error, info};
use shared::{is_discovery_probe, DiscoveryReply};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

pub struct DiscoveryService {
    socket: UdpSocket,
    name: String,
    /// Game port advertised in replies
    game_port: u16,
    state: SharedState,
}

impl DiscoveryService {
    pub async fn bind(
        addr: &str,
        name: &str,
        game_port: u16,
        state: SharedState,
    ) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                role: "discovery",
                addr: addr.to_string(),
                source,
            })?;
        info!("Discovery service listening on {}", addr);

        Ok(Self {
            socket,
            name: name.to_string(),
            game_port,
            state,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Builds the reply for a datagram, or None if it is not a probe.
    pub async fn reply_to(&self, datagram: &[u8]) -> Option<String> {
        if !is_discovery_probe(datagram) {
            return None;
        }
        let (players, max_players) = {
            let state = self.state.read().await;
            (state.sessions.len(), state.sessions.capacity())
        };
        let reply = DiscoveryReply::new(&self.name, self.game_port, players, max_players);
        Some(format!("{}\n", reply))
    }

    /// Answers probes until the task is cancelled.
    pub async fn run(self) {
        let mut buffer = [0u8; 512];

        loop {
            match self.socket.recv_from(&mut buffer).await {
                Ok((len, addr)) => {
                    let Some(reply) = self.reply_to(&buffer[..len]).await else {
                        debug!("Ignoring {} byte datagram from {}", len, addr);
                        continue;
                    };
                    if let Err(e) = self.socket.send_to(reply.as_bytes(), addr).await {
                        error!("Failed to answer discovery probe from {}: {}", addr, e);
                    }
                }
                Err(e) => {
                    error!("Error receiving discovery datagram: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}
