//! Session registry for connected players
//!
//! This module owns the server-side record of every joined player:
//! - Session lifecycle (join, update, remove)
//! - Capacity enforcement
//! - Damage and respawn bookkeeping applied by the world tick
//! - Outbound channels used to deliver messages to each player
//!
//! The registry trusts client-reported movement; the server simulates only
//! projectiles.

use crate::error::{Result, ServerError};
use log::info;
use shared::{EntityId, PlayerView, ServerMessage, Vec3, MAX_HEALTH, RESPAWN_POINT};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Lines a connection may have waiting for its writer before new ones are dropped
pub const OUTBOUND_CAPACITY: usize = 64;

/// Queue feeding one connection's writer task with encoded lines.
pub type Outbound = mpsc::Sender<Arc<str>>;
/// Receiving end drained by the writer task.
pub type Inbox = mpsc::Receiver<Arc<str>>;

/// Creates a bounded outbound queue of `OUTBOUND_CAPACITY` lines.
pub fn outbound_channel() -> (Outbound, Inbox) {
    mpsc::channel(OUTBOUND_CAPACITY)
}

/// Queues an encoded line without waiting.
///
/// A full queue means the peer stopped reading; the line is dropped.
pub fn queue_line(outbound: &Outbound, line: Arc<str>) -> Result<()> {
    outbound.try_send(line).map_err(|e| match e {
        TrySendError::Full(_) => ServerError::RecipientLagging(OUTBOUND_CAPACITY),
        TrySendError::Closed(_) => {
            ServerError::RecipientGone("outbound channel closed".to_string())
        }
    })
}

/// Encodes a message and queues it on a single outbound channel.
pub fn send_message(outbound: &Outbound, message: &ServerMessage) -> Result<()> {
    queue_line(outbound, message.encode()?.into())
}

/// Represents one joined player and their latest reported state
#[derive(Debug)]
pub struct Session {
    /// Unique identifier assigned by the server on join
    pub id: EntityId,
    pub name: String,
    /// Last position reported by the client (or the respawn point)
    pub position: Vec3,
    /// Facing angle around the vertical axis
    pub rotation_y: f32,
    pub health: i32,
    /// Last time this session received a state report
    pub last_update: Instant,
    /// Channel to the connection's writer task
    pub outbound: Outbound,
}

impl Session {
    /// Creates a session at the respawn point with full health
    pub fn new(id: EntityId, name: String, outbound: Outbound) -> Self {
        Self {
            id,
            name,
            position: RESPAWN_POINT,
            rotation_y: 0.0,
            health: MAX_HEALTH,
            last_update: Instant::now(),
            outbound,
        }
    }

    /// Time since the client last reported state
    pub fn since_last_update(&self) -> Duration {
        self.last_update.elapsed()
    }

    /// Overwrites only the fields present and refreshes the timestamp.
    /// Non-finite positions and angles are skipped.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(position) = update.position.filter(Vec3::is_finite) {
            self.position = position;
        }
        if let Some(rotation_y) = update.rotation_y.filter(|r| r.is_finite()) {
            self.rotation_y = rotation_y;
        }
        if let Some(health) = update.health {
            self.health = health;
        }
        self.last_update = Instant::now();
    }

    /// Subtracts damage, resetting to the respawn point when health runs out.
    ///
    /// Returns true if the session respawned.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.health -= amount;
        if self.health <= 0 {
            self.position = RESPAWN_POINT;
            self.health = MAX_HEALTH;
            true
        } else {
            false
        }
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id.clone(),
            name: self.name.clone(),
            position: self.position,
            rotation_y: self.rotation_y,
            health: self.health,
        }
    }
}

/// Partial state report from a client
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateUpdate {
    pub position: Option<Vec3>,
    pub rotation_y: Option<f32>,
    pub health: Option<i32>,
}

/// Outcome of a hit applied to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Health after damage and any respawn
    pub health: i32,
    pub respawned: bool,
}

/// Holds every joined session, keyed by identifier
///
/// Enforces the configured capacity. All mutation goes through `join`,
/// `update`, `remove` and `apply_damage`.
pub struct SessionRegistry {
    sessions: HashMap<EntityId, Session>,
    /// Maximum number of concurrent sessions allowed
    max_players: usize,
}

impl SessionRegistry {
    pub fn new(max_players: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_players,
        }
    }

    /// Attempts to register a new player.
    ///
    /// Fails with `CapacityExceeded` when the registry is full; otherwise the
    /// session starts at the respawn point with full health.
    pub fn join(&mut self, name: String, outbound: Outbound) -> Result<EntityId> {
        if self.sessions.len() >= self.max_players {
            return Err(ServerError::CapacityExceeded {
                max_players: self.max_players,
            });
        }

        let mut id = EntityId::generate();
        while self.sessions.contains_key(&id) {
            id = EntityId::generate();
        }

        info!("Player {} joined as {}", id, name);
        self.sessions
            .insert(id.clone(), Session::new(id.clone(), name, outbound));
        Ok(id)
    }

    /// Applies a state report. Unknown ids are ignored; returns whether a session was updated.
    pub fn update(&mut self, id: &EntityId, update: StateUpdate) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                session.apply(update);
                true
            }
            None => false,
        }
    }

    /// Removes a session. Removing an absent id is a no-op returning false.
    pub fn remove(&mut self, id: &EntityId) -> bool {
        if let Some(session) = self.sessions.remove(id) {
            info!("Player {} ({}) left", session.id, session.name);
            true
        } else {
            false
        }
    }

    pub fn apply_damage(&mut self, id: &EntityId, amount: i32) -> Option<DamageOutcome> {
        let session = self.sessions.get_mut(id)?;
        let respawned = session.take_damage(amount);
        if respawned {
            info!("Player {} was eliminated and respawned", id);
        }
        Some(DamageOutcome {
            health: session.health,
            respawned,
        })
    }

    pub fn get(&self, id: &EntityId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Player views for one snapshot, taken from a single borrow of the registry
    pub fn snapshot(&self) -> Vec<PlayerView> {
        self.sessions.values().map(Session::view).collect()
    }

    /// Outbound channels of every session, for fan-out after the lock is released
    pub fn recipients(&self) -> Vec<(EntityId, Outbound)> {
        self.sessions
            .values()
            .map(|session| (session.id.clone(), session.outbound.clone()))
            .collect()
    }

    pub fn outbound(&self, id: &EntityId) -> Option<Outbound> {
        self.sessions.get(id).map(|session| session.outbound.clone())
    }

    pub fn capacity(&self) -> usize {
        self.max_players
    }

    /// Returns the number of joined sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_players
    }
}
