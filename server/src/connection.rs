//! Per-connection protocol handling.
//!
//! Each accepted stream gets a reader loop (this task) and a writer task fed
//! by a bounded channel. The reader decodes newline-delimited JSON and
//! drives a small state machine:
//!
//! - **Unjoined**: only `join` is accepted. A full server answers with an
//!   `error` line and the connection is closed.
//! - **Joined**: `state` and `shoot` mutate the world; repeated `join` is ignored.
//! - **Closed**: peer EOF, an I/O error, or a rejected join. The session, if
//!   any, is always removed.
//!
//! Malformed lines never close the connection.

use crate::error::{Result, ServerError};
use crate::game::SharedState;
use crate::sessions::{outbound_channel, send_message, Inbox, Outbound, StateUpdate};
use log::{debug, info, warn};
use shared::{ClientMessage, EntityId, ServerMessage};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Unjoined,
    Joined(EntityId),
}

/// Whether the reader should keep going after a message
enum Flow {
    Continue,
    Close,
}

/// Why a connection ended
#[derive(Debug)]
enum Closed {
    PeerClosed,
    Rejected,
}

struct Connection {
    peer: SocketAddr,
    state: SharedState,
    outbound: Outbound,
    phase: Phase,
}

/// Serves one client until it disconnects, errors, or is rejected.
pub async fn handle_connection<S>(stream: S, peer: SocketAddr, state: SharedState)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    info!("Client connected from {}", peer);

    let (read_half, write_half) = tokio::io::split(stream);
    let (outbound, rx) = outbound_channel();
    let writer = tokio::spawn(write_lines(write_half, rx, peer));

    let mut connection = Connection {
        peer,
        state,
        outbound,
        phase: Phase::Unjoined,
    };

    let closed = connection.read_loop(BufReader::new(read_half)).await;
    connection.release().await;

    match closed {
        Ok(Closed::Rejected) => {
            // Let the writer flush the error line, then it shuts the stream down.
            drop(connection);
            if let Err(e) = writer.await {
                debug!("Writer for {} ended abnormally: {}", peer, e);
            }
        }
        Ok(Closed::PeerClosed) => {
            info!("Client {} disconnected", peer);
            writer.abort();
        }
        Err(e) => {
            warn!("Connection with {} failed: {}", peer, e);
            writer.abort();
        }
    }
}

impl Connection {
    async fn read_loop<R>(&mut self, mut reader: BufReader<R>) -> Result<Closed>
    where
        R: AsyncRead + Unpin,
    {
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                return Ok(Closed::PeerClosed);
            }

            let message = match ClientMessage::decode(&line) {
                Ok(message) => message,
                Err(e) => {
                    debug!("Ignoring malformed line from {}: {}", self.peer, e);
                    continue;
                }
            };

            if let Flow::Close = self.handle_message(message).await {
                return Ok(Closed::Rejected);
            }
        }
    }

    async fn handle_message(&mut self, message: ClientMessage) -> Flow {
        let joined = match &self.phase {
            Phase::Joined(id) => Some(id.clone()),
            Phase::Unjoined => None,
        };
        let Some(id) = joined else {
            return match message {
                ClientMessage::Join { name } => self.join(name).await,
                other => {
                    debug!("Ignoring {:?} from {} before join", other, self.peer);
                    Flow::Continue
                }
            };
        };

        match message {
            ClientMessage::Join { .. } => {
                debug!("Ignoring repeated join from {}", id);
            }
            ClientMessage::State {
                position,
                rotation_y,
                health,
            } => {
                let update = StateUpdate {
                    position,
                    rotation_y,
                    health,
                };
                self.state.write().await.update_player(&id, update);
            }
            ClientMessage::Shoot {
                origin: Some(origin),
                direction: Some(direction),
            } => {
                self.state
                    .write()
                    .await
                    .spawn_projectile(&id, origin, direction);
            }
            ClientMessage::Shoot { .. } => {
                debug!("Ignoring incomplete shoot from {}", id);
            }
        }
        Flow::Continue
    }

    async fn join(&mut self, name: Option<String>) -> Flow {
        let mut state = self.state.write().await;
        match state.join(name, self.outbound.clone()) {
            Ok(id) => {
                // Queued under the lock so it precedes this session's first snapshot.
                let welcome = ServerMessage::Welcome {
                    player_id: id.clone(),
                };
                if let Err(e) = send_message(&self.outbound, &welcome) {
                    warn!("Failed to welcome {}: {}", id, e);
                }
                self.phase = Phase::Joined(id);
                Flow::Continue
            }
            Err(e @ ServerError::CapacityExceeded { .. }) => {
                warn!("Rejecting join from {}: {}", self.peer, e);
                let error = ServerMessage::Error {
                    message: e.to_string(),
                };
                if let Err(e) = send_message(&self.outbound, &error) {
                    debug!("Could not queue rejection for {}: {}", self.peer, e);
                }
                Flow::Close
            }
            Err(e) => {
                warn!("Join from {} failed: {}", self.peer, e);
                Flow::Continue
            }
        }
    }

    /// Removes the session, if one was assigned.
    async fn release(&mut self) {
        if let Phase::Joined(id) = std::mem::replace(&mut self.phase, Phase::Unjoined) {
            self.state.write().await.remove_player(&id);
        }
    }
}

/// Drains the outbound queue onto the stream, one line per message.
///
/// Shuts the stream down once every sender is gone.
async fn write_lines<W>(
    mut writer: W,
    mut rx: Inbox,
    peer: SocketAddr,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = written {
            debug!("Write to {} failed: {}", peer, e);
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Shutdown of {} failed: {}", peer, e);
    }
}
