//! Homing projectiles and the pool that recycles them.
//!
//! A projectile chases its target's current position every tick. It hits
//! once it is within the hit threshold, and fizzles if the target dies or
//! disappears first. Finished projectiles go back to a per-kind free list
//! instead of being dropped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::{apply_hit, DamageEvent};
use crate::components::EntityId;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::simulation::EntityStorage;

/// Pool key. One free list exists per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Shot fired by a tower.
    TowerBolt,
}

/// A single projectile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Projectile {
    /// Pool-assigned identity, stable across reuse.
    pub serial: u64,
    /// Pool key.
    pub kind: ProjectileKind,
    /// Current world position.
    pub position: Vec2Fixed,
    /// World units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Damage on impact.
    pub damage: u32,
    /// Firing entity.
    pub source: EntityId,
    /// Entity being chased. Cleared whenever the projectile deactivates.
    pub target: Option<EntityId>,
    /// False once it has hit or fizzled.
    pub active: bool,
    /// Number of times the pool has handed this projectile out.
    pub uses: u32,
}

/// Result of advancing a projectile by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flight {
    /// Still travelling.
    InFlight,
    /// Reached the target and dealt damage.
    Hit(DamageEvent),
    /// Target vanished or died; no damage dealt.
    Fizzled,
}

impl Projectile {
    fn blank(serial: u64, kind: ProjectileKind) -> Self {
        Self {
            serial,
            kind,
            position: Vec2Fixed::ZERO,
            speed: Fixed::ZERO,
            damage: 0,
            source: 0,
            target: None,
            active: false,
            uses: 0,
        }
    }

    /// Reset every field for a fresh shot.
    pub fn launch(
        &mut self,
        source: EntityId,
        target: EntityId,
        position: Vec2Fixed,
        speed: Fixed,
        damage: u32,
    ) {
        self.source = source;
        self.target = Some(target);
        self.position = position;
        self.speed = speed;
        self.damage = damage;
        self.active = true;
        self.uses += 1;
    }

    /// Mark finished and drop the target reference.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.target = None;
    }

    /// Move one tick toward the target, or hit it if already close enough.
    pub fn advance(&mut self, storage: &mut EntityStorage, dt: Fixed, hit_threshold: Fixed) -> Flight {
        if !self.active {
            return Flight::Fizzled;
        }
        let aim = self
            .target
            .and_then(|id| storage.get(id))
            .filter(|target| !target.health.is_dead())
            .map(|target| target.position);
        let (Some(target), Some(aim)) = (self.target, aim) else {
            self.deactivate();
            return Flight::Fizzled;
        };

        if self.position.distance_squared(aim) < hit_threshold * hit_threshold {
            let hit = apply_hit(storage, self.source, target, self.damage);
            self.deactivate();
            return hit.map_or(Flight::Fizzled, Flight::Hit);
        }

        self.position = self.position.step_towards(aim, self.speed * dt);
        Flight::InFlight
    }
}

/// Per-kind free lists of finished projectiles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectilePool {
    free: BTreeMap<ProjectileKind, Vec<Projectile>>,
    created: u64,
}

impl ProjectilePool {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a projectile off the free list, or make a new one if the list is
    /// empty. The result is inactive until [`Projectile::launch`] is called.
    pub fn acquire(&mut self, kind: ProjectileKind) -> Projectile {
        if let Some(projectile) = self.free.get_mut(&kind).and_then(Vec::pop) {
            return projectile;
        }
        let serial = self.created;
        self.created += 1;
        Projectile::blank(serial, kind)
    }

    /// Return a finished projectile to its free list.
    pub fn release(&mut self, mut projectile: Projectile) {
        projectile.deactivate();
        self.free.entry(projectile.kind).or_default().push(projectile);
    }

    /// Number of idle projectiles of a kind.
    #[must_use]
    pub fn free_count(&self, kind: ProjectileKind) -> usize {
        self.free.get(&kind).map_or(0, Vec::len)
    }

    /// Total projectiles ever created.
    #[must_use]
    pub const fn created(&self) -> u64 {
        self.created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::Side;
    use crate::simulation::Entity;
    use crate::unit_kind::UnitKind;

    fn target_at(storage: &mut EntityStorage, x: i32, y: i32) -> EntityId {
        storage.insert(Entity::unit(UnitKind::Tank, Side::Blue, Vec2Fixed::from_ints(x, y), None))
    }

    fn dt() -> Fixed {
        Fixed::ONE / Fixed::from_num(16)
    }

    #[test]
    fn pool_reuses_released_projectiles() {
        let mut pool = ProjectilePool::new();
        let mut first = pool.acquire(ProjectileKind::TowerBolt);
        first.launch(1, 2, Vec2Fixed::ZERO, Fixed::from_num(300), 50);
        let serial = first.serial;
        pool.release(first);
        assert_eq!(pool.free_count(ProjectileKind::TowerBolt), 1);

        let again = pool.acquire(ProjectileKind::TowerBolt);
        assert_eq!(again.serial, serial);
        assert_eq!(again.target, None);
        assert!(!again.active);
        assert_eq!(pool.created(), 1);
        assert_eq!(pool.free_count(ProjectileKind::TowerBolt), 0);
    }

    #[test]
    fn projectile_travels_then_hits() {
        let mut storage = EntityStorage::new();
        let target = target_at(&mut storage, 105, 0);
        let mut shot = ProjectilePool::new().acquire(ProjectileKind::TowerBolt);
        shot.launch(77, target, Vec2Fixed::ZERO, Fixed::from_num(320), 50);

        let threshold = Fixed::from_num(10);
        let mut flights = Vec::new();
        for _ in 0..10 {
            let flight = shot.advance(&mut storage, dt(), threshold);
            flights.push(flight);
            if flight != Flight::InFlight {
                break;
            }
        }
        // 20px per tick: 100px after five ticks, hit on the sixth.
        assert_eq!(flights.len(), 6);
        assert!(matches!(flights[5], Flight::Hit(DamageEvent { amount: 50, .. })));
        assert_eq!(storage.get(target).unwrap().health.current, 250);
        assert!(!shot.active);
        assert_eq!(shot.target, None);
    }

    #[test]
    fn projectile_fizzles_when_target_dies() {
        let mut storage = EntityStorage::new();
        let target = target_at(&mut storage, 200, 0);
        let mut shot = ProjectilePool::new().acquire(ProjectileKind::TowerBolt);
        shot.launch(77, target, Vec2Fixed::ZERO, Fixed::from_num(300), 50);
        assert_eq!(shot.advance(&mut storage, dt(), Fixed::from_num(10)), Flight::InFlight);

        storage.get_mut(target).unwrap().health.current = 0;
        assert_eq!(shot.advance(&mut storage, dt(), Fixed::from_num(10)), Flight::Fizzled);
        assert_eq!(shot.target, None);
    }

    #[test]
    fn projectile_fizzles_when_target_removed() {
        let mut storage = EntityStorage::new();
        let target = target_at(&mut storage, 200, 0);
        let mut shot = ProjectilePool::new().acquire(ProjectileKind::TowerBolt);
        shot.launch(77, target, Vec2Fixed::ZERO, Fixed::from_num(300), 50);
        storage.remove(target);
        assert_eq!(shot.advance(&mut storage, dt(), Fixed::from_num(10)), Flight::Fizzled);
    }
}
