use log::{debug, warn};
use shared::{ClientMessage, EntityId, ServerMessage, Vec3};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// JSON-lines connection to a dedicated server
///
/// A background task decodes incoming lines into a queue; `poll` drains it
/// without blocking and `next_message` waits for the next one.
pub struct NetworkClient {
    writer: OwnedWriteHalf,
    inbox: mpsc::UnboundedReceiver<ServerMessage>,
    receiver: JoinHandle<()>,
    player_id: Option<EntityId>,
}

impl NetworkClient {
    /// Connects and sends the `join` request.
    pub async fn connect<A: ToSocketAddrs>(addr: A, name: &str) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (read_half, writer) = stream.into_split();

        let (tx, inbox) = mpsc::unbounded_channel();
        let receiver = tokio::spawn(receive_loop(read_half, tx));

        let mut client = Self {
            writer,
            inbox,
            receiver,
            player_id: None,
        };
        client
            .send(&ClientMessage::Join {
                name: Some(name.to_string()),
            })
            .await?;
        Ok(client)
    }

    pub async fn send(&mut self, message: &ClientMessage) -> io::Result<()> {
        let mut line = message.encode()?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await
    }

    pub async fn send_state(
        &mut self,
        position: Vec3,
        rotation_y: f32,
        health: Option<i32>,
    ) -> io::Result<()> {
        self.send(&ClientMessage::State {
            position: Some(position),
            rotation_y: Some(rotation_y),
            health,
        })
        .await
    }

    pub async fn shoot(&mut self, origin: Vec3, direction: Vec3) -> io::Result<()> {
        self.send(&ClientMessage::Shoot {
            origin: Some(origin),
            direction: Some(direction),
        })
        .await
    }

    /// Returns every message received so far.
    pub fn poll(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.inbox.try_recv() {
            self.observe(&message);
            messages.push(message);
        }
        messages
    }

    /// Waits for the next message; None once the server closed the connection.
    pub async fn next_message(&mut self) -> Option<ServerMessage> {
        let message = self.inbox.recv().await?;
        self.observe(&message);
        Some(message)
    }

    /// Identifier assigned by the server, once the welcome has been seen
    pub fn player_id(&self) -> Option<&EntityId> {
        self.player_id.as_ref()
    }

    pub async fn close(mut self) -> io::Result<()> {
        let result = self.writer.shutdown().await;
        self.receiver.abort();
        result
    }

    fn observe(&mut self, message: &ServerMessage) {
        if let ServerMessage::Welcome { player_id } = message {
            self.player_id = Some(player_id.clone());
        }
    }
}

async fn receive_loop(read_half: OwnedReadHalf, tx: mpsc::UnboundedSender<ServerMessage>) {
    let mut reader = BufReader::new(read_half);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => {
                debug!("Server closed the connection");
                break;
            }
            Ok(_) => match ServerMessage::decode(&line) {
                Ok(message) => {
                    if tx.send(message).is_err() {
                        break;
                    }
                }
                Err(e) => debug!("Skipping undecodable line: {}", e),
            },
            Err(e) => {
                warn!("Connection error: {}", e);
                break;
            }
        }
    }
}
