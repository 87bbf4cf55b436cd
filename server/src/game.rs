//! Authoritative world state and the per-tick simulation step.

use crate::error::Result;
use crate::projectiles::ProjectileStore;
use crate::sessions::{Outbound, SessionRegistry, StateUpdate};
use log::{debug, info};
use shared::{
    EntityId, ServerMessage, Vec3, DEFAULT_PLAYER_NAME, PLAYER_RADIUS, PROJECTILE_DAMAGE,
    PROJECTILE_LIFETIME,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// World state shared by connection handlers, the tick loop and discovery
pub type SharedState = Arc<RwLock<GameState>>;

/// A projectile striking a session during a tick
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub projectile_id: EntityId,
    pub owner_id: EntityId,
    pub target_id: EntityId,
    pub amount: i32,
    /// Target's health after the hit (already reset if it respawned)
    pub health: i32,
    pub respawned: bool,
}

/// Everything one simulation step changed
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub hits: Vec<Hit>,
    pub expired: Vec<EntityId>,
}

/// Both registries behind the server's single lock
pub struct GameState {
    pub tick: u64,
    pub sessions: SessionRegistry,
    pub projectiles: ProjectileStore,
}

impl GameState {
    pub fn new(max_players: usize) -> Self {
        Self {
            tick: 0,
            sessions: SessionRegistry::new(max_players),
            projectiles: ProjectileStore::new(),
        }
    }

    pub fn shared(max_players: usize) -> SharedState {
        Arc::new(RwLock::new(Self::new(max_players)))
    }

    pub fn join(&mut self, name: Option<String>, outbound: Outbound) -> Result<EntityId> {
        let name = name.unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string());
        self.sessions.join(name, outbound)
    }

    pub fn update_player(&mut self, id: &EntityId, update: StateUpdate) -> bool {
        self.sessions.update(id, update)
    }

    /// Removes a player. Their projectiles stay in flight until they hit or expire.
    pub fn remove_player(&mut self, id: &EntityId) -> bool {
        self.sessions.remove(id)
    }

    /// Fires a projectile for a joined session.
    ///
    /// Returns None for unknown owners and for non-finite origins or directions.
    pub fn spawn_projectile(
        &mut self,
        owner_id: &EntityId,
        origin: Vec3,
        direction: Vec3,
    ) -> Option<EntityId> {
        if !self.sessions.contains(owner_id) {
            return None;
        }
        if !origin.is_finite() || !direction.is_finite() {
            debug!("Player {} fired a non-finite projectile", owner_id);
            return None;
        }
        let id = self.projectiles.spawn(owner_id.clone(), origin, direction);
        debug!("Player {} fired projectile {}", owner_id, id);
        Some(id)
    }

    /// Runs one tick: advance, collide, respawn and expire.
    ///
    /// `dt` is the nominal tick interval; `now` is compared against projectile
    /// creation times for expiry.
    pub fn step(&mut self, dt: f32, now: Instant) -> TickReport {
        self.tick += 1;
        let hits = self.advance_and_collide(dt);
        let expired = self
            .projectiles
            .expire(now, Duration::from_secs_f32(PROJECTILE_LIFETIME));

        TickReport {
            tick: self.tick,
            hits,
            expired,
        }
    }

    /// Advances every projectile then tests each against every non-owner session.
    ///
    /// A projectile hits at most once: the first session found within the
    /// player radius takes the damage and the projectile is removed.
    pub fn advance_and_collide(&mut self, dt: f32) -> Vec<Hit> {
        self.projectiles.advance(dt);

        let radius_sq = PLAYER_RADIUS * PLAYER_RADIUS;
        let mut hits = Vec::new();

        for projectile_id in self.projectiles.ids() {
            let Some(projectile) = self.projectiles.get(&projectile_id) else {
                continue;
            };

            let target_id = self
                .sessions
                .iter()
                .filter(|session| session.id != projectile.owner_id)
                .find(|session| {
                    session.position.distance_squared(&projectile.position) <= radius_sq
                })
                .map(|session| session.id.clone());

            let Some(target_id) = target_id else {
                continue;
            };

            let owner_id = projectile.owner_id.clone();
            self.projectiles.remove(&projectile_id);

            if let Some(outcome) = self.sessions.apply_damage(&target_id, PROJECTILE_DAMAGE) {
                info!(
                    "Player {} hit {} for {}",
                    owner_id, target_id, PROJECTILE_DAMAGE
                );
                hits.push(Hit {
                    projectile_id,
                    owner_id,
                    target_id,
                    amount: PROJECTILE_DAMAGE,
                    health: outcome.health,
                    respawned: outcome.respawned,
                });
            }
        }

        hits
    }

    /// Builds one consistent world snapshot.
    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::WorldState {
            players: self.sessions.snapshot(),
            projectiles: self.projectiles.snapshot(),
        }
    }
}
