//! Server-simulated projectiles.

use shared::{EntityId, ProjectileView, Vec3, PROJECTILE_SPEED};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A bullet travelling at constant velocity until it hits or expires
#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: EntityId,
    /// Session that fired it; never hit by its own projectile
    pub owner_id: EntityId,
    pub position: Vec3,
    /// Unit direction, fixed for the projectile's lifetime
    pub direction: Vec3,
    pub created_at: Instant,
}

impl Projectile {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    pub fn view(&self) -> ProjectileView {
        ProjectileView {
            id: self.id.clone(),
            position: self.position,
        }
    }
}

/// In-flight projectiles keyed by identifier
#[derive(Debug, Default)]
pub struct ProjectileStore {
    projectiles: HashMap<EntityId, Projectile>,
}

impl ProjectileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a new projectile created now. The direction is normalized.
    pub fn spawn(&mut self, owner_id: EntityId, origin: Vec3, direction: Vec3) -> EntityId {
        self.spawn_at(owner_id, origin, direction, Instant::now())
    }

    pub fn spawn_at(
        &mut self,
        owner_id: EntityId,
        origin: Vec3,
        direction: Vec3,
        created_at: Instant,
    ) -> EntityId {
        let mut id = EntityId::generate();
        while self.projectiles.contains_key(&id) {
            id = EntityId::generate();
        }

        self.projectiles.insert(
            id.clone(),
            Projectile {
                id: id.clone(),
                owner_id,
                position: origin,
                direction: direction.normalize(),
                created_at,
            },
        );
        id
    }

    /// Moves every projectile by `direction * speed * dt`
    pub fn advance(&mut self, dt: f32) {
        for projectile in self.projectiles.values_mut() {
            projectile.position = projectile
                .position
                .add(&projectile.direction.scale(PROJECTILE_SPEED * dt));
        }
    }

    /// Removes and returns the ids of projectiles older than `lifetime`
    pub fn expire(&mut self, now: Instant, lifetime: Duration) -> Vec<EntityId> {
        let expired: Vec<EntityId> = self
            .projectiles
            .values()
            .filter(|projectile| projectile.age(now) > lifetime)
            .map(|projectile| projectile.id.clone())
            .collect();

        for id in &expired {
            self.projectiles.remove(id);
        }
        expired
    }

    pub fn remove(&mut self, id: &EntityId) -> Option<Projectile> {
        self.projectiles.remove(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Projectile> {
        self.projectiles.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.projectiles.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Projectile> {
        self.projectiles.values()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.projectiles.keys().cloned().collect()
    }

    pub fn snapshot(&self) -> Vec<ProjectileView> {
        self.projectiles.values().map(Projectile::view).collect()
    }

    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn owner() -> EntityId {
        EntityId::from("owner")
    }

    #[test]
    fn test_spawn_normalizes_direction() {
        let mut store = ProjectileStore::new();
        let id = store.spawn(owner(), Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0));

        let projectile = store.get(&id).unwrap();
        assert_eq!(projectile.owner_id, owner());
        assert_eq!(projectile.direction, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_spawn_ids_are_unique() {
        let mut store = ProjectileStore::new();
        for _ in 0..100 {
            store.spawn(owner(), Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        }
        assert_eq!(store.len(), 100);
    }

    #[test]
    fn test_advance_integrates_position() {
        let mut store = ProjectileStore::new();
        let id = store.spawn(owner(), Vec3::new(1.0, 1.0, 1.0), Vec3::new(-1.0, 0.0, 0.0));

        store.advance(0.5);

        let projectile = store.get(&id).unwrap();
        assert_approx_eq!(projectile.position.x, 1.0 - PROJECTILE_SPEED * 0.5, 1e-5);
        assert_approx_eq!(projectile.position.y, 1.0, 1e-6);
        assert_approx_eq!(projectile.position.z, 1.0, 1e-6);
    }

    #[test]
    fn test_zero_direction_stays_in_place() {
        let mut store = ProjectileStore::new();
        let id = store.spawn(owner(), Vec3::new(2.0, 0.0, 0.0), Vec3::ZERO);
        store.advance(1.0);
        assert_eq!(store.get(&id).unwrap().position, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_expire_removes_only_old_projectiles() {
        let mut store = ProjectileStore::new();
        let start = Instant::now();
        let now = start + Duration::from_secs(5);
        let stale = store.spawn_at(owner(), Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), start);
        let fresh = store.spawn_at(owner(), Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), now);

        let expired = store.expire(now, Duration::from_secs(3));

        assert_eq!(expired, vec![stale.clone()]);
        assert!(store.contains(&fresh));
        assert!(!store.contains(&stale));
    }

    #[test]
    fn test_expire_uses_strictly_greater_age() {
        let mut store = ProjectileStore::new();
        let now = Instant::now();
        let id = store.spawn_at(owner(), Vec3::ZERO, Vec3::ZERO, now);

        assert!(store.expire(now + Duration::from_secs(3), Duration::from_secs(3)).is_empty());
        assert_eq!(
            store.expire(now + Duration::from_millis(3001), Duration::from_secs(3)),
            vec![id]
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut store = ProjectileStore::new();
        let id = store.spawn(owner(), Vec3::ZERO, Vec3::ZERO);
        assert!(store.remove(&id).is_some());
        assert!(store.remove(&id).is_none());
    }
}
