//! Error taxonomy for the dedicated server.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    /// A join arrived while the session registry was full.
    #[error("Server full ({max_players} players)")]
    CapacityExceeded { max_players: usize },

    /// A line from a client could not be decoded.
    #[error("Malformed message: {0}")]
    Protocol(#[from] serde_json::Error),

    /// The peer reset or the connection failed.
    #[error("Connection fault: {0}")]
    Io(#[from] io::Error),

    /// A recipient's outbound channel closed before a message could be queued.
    #[error("Recipient {0} is gone")]
    RecipientGone(String),

    /// A recipient's outbound queue is full because it stopped reading.
    #[error("Recipient is lagging ({0} lines queued)")]
    RecipientLagging(usize),

    /// The world loop ended while the server was still accepting players.
    #[error("World loop stopped: {0}")]
    WorldLoopStopped(String),

    #[error("Failed to bind {role} socket on {addr}: {source}")]
    Bind {
        role: &'static str,
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServerError {
    /// Fatal errors stop the server; everything else is scoped to one connection or recipient.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Bind { .. } | Self::InvalidConfig(_) | Self::WorldLoopStopped(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
