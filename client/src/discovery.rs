//! LAN server discovery over UDP broadcast.

use log::debug;
use shared::{DiscoveryReply, DEFAULT_DISCOVERY_PORT, DISCOVERY_PROBE};
use std::collections::BTreeMap;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};

/// A server that answered a discovery probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    /// Address the reply came from
    pub host: IpAddr,
    /// Game port advertised by the server
    pub port: u16,
    pub players: usize,
    pub max_players: usize,
}

impl ServerInfo {
    pub fn from_reply(host: IpAddr, reply: DiscoveryReply) -> Self {
        Self {
            name: reply.name,
            host,
            port: reply.port,
            players: reply.players,
            max_players: reply.max_players,
        }
    }

    /// Address to open the game connection to
    pub fn game_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn is_full(&self) -> bool {
        self.players >= self.max_players
    }
}

/// Finds servers by broadcasting `DISCOVER` and collecting replies
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    pub port: u16,
    /// How long to wait for replies after sending the probe
    pub timeout: Duration,
}

impl Default for DiscoveryClient {
    fn default() -> Self {
        Self {
            port: DEFAULT_DISCOVERY_PORT,
            timeout: Duration::from_millis(1500),
        }
    }
}

impl DiscoveryClient {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Broadcasts a probe on the local network
    pub async fn scan(&self) -> io::Result<Vec<ServerInfo>> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;
        socket
            .send_to(probe_line().as_bytes(), (Ipv4Addr::BROADCAST, self.port))
            .await?;
        self.collect(&socket).await
    }

    /// Sends a probe to one known address
    pub async fn probe(&self, addr: SocketAddr) -> io::Result<Vec<ServerInfo>> {
        let local: IpAddr = if addr.is_ipv4() {
            Ipv4Addr::UNSPECIFIED.into()
        } else {
            Ipv6Addr::UNSPECIFIED.into()
        };
        let socket = UdpSocket::bind((local, 0)).await?;
        socket.send_to(probe_line().as_bytes(), addr).await?;
        self.collect(&socket).await
    }

    /// Gathers replies until the timeout, keeping one entry per host
    async fn collect(&self, socket: &UdpSocket) -> io::Result<Vec<ServerInfo>> {
        let deadline = Instant::now() + self.timeout;
        let mut servers = BTreeMap::new();
        let mut buffer = [0u8; 1024];

        loop {
            let (len, from) = match timeout_at(deadline, socket.recv_from(&mut buffer)).await {
                Err(_) => break,
                Ok(Ok(received)) => received,
                Ok(Err(e)) => {
                    debug!("Discovery receive error: {}", e);
                    continue;
                }
            };

            let Ok(text) = std::str::from_utf8(&buffer[..len]) else {
                continue;
            };
            match text.parse::<DiscoveryReply>() {
                Ok(reply) => {
                    servers.insert(from.ip(), ServerInfo::from_reply(from.ip(), reply));
                }
                Err(e) => debug!("Ignoring reply from {}: {}", from, e),
            }
        }

        Ok(servers.into_values().collect())
    }
}

fn probe_line() -> String {
    format!("{}\n", DISCOVERY_PROBE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_info_from_reply() {
        let reply: DiscoveryReply = "SERVER Arena 50000 8 8".parse().unwrap();
        let info = ServerInfo::from_reply(Ipv4Addr::LOCALHOST.into(), reply);

        assert_eq!(info.name, "Arena");
        assert_eq!(
            info.game_addr(),
            "127.0.0.1:50000".parse::<SocketAddr>().unwrap()
        );
        assert!(info.is_full());
    }

    #[tokio::test]
    async fn test_probe_collects_replies_and_skips_garbage() {
        let responder = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = responder.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buffer = [0u8; 64];
            let (len, from) = responder.recv_from(&mut buffer).await.unwrap();
            assert_eq!(&buffer[..len], b"DISCOVER\n");
            responder.send_to(b"garbage", from).await.unwrap();
            responder
                .send_to(b"SERVER Arena 50000 2 8\n", from)
                .await
                .unwrap();
        });

        let client = DiscoveryClient::new(addr.port(), Duration::from_millis(300));
        let servers = client.probe(addr).await.unwrap();

        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "Arena");
        assert_eq!(servers[0].port, 50000);
        assert_eq!(servers[0].players, 2);
        assert_eq!(servers[0].max_players, 8);
    }

    #[tokio::test]
    async fn test_probe_without_answer_is_empty() {
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let client = DiscoveryClient::new(0, Duration::from_millis(100));
        let servers = client.probe(silent.local_addr().unwrap()).await.unwrap();
        assert!(servers.is_empty());
    }
}
