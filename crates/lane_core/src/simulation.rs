//! Core battle loop.
//!
//! [`Battle`] owns every piece of mutable state: entities, projectiles,
//! resource pools, ruins and the opponent controller. The terrain and its
//! landmarks are fixed at construction.
//!
//! # Determinism
//!
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - The only randomness is the opponent's seeded generator
//! - Entities are stepped in ascending id order
//! - The same seed and placements always produce the same state hash
//!
//! # Tick order
//!
//! 1. Rebuild the spatial index from living entities
//! 2. Regenerate resources
//! 3. Let the opponent decide and possibly place a unit
//! 4. Step every living entity (units move and fight, towers fire)
//! 5. Advance projectiles, releasing finished ones to the pool
//! 6. Remove dead entities, leaving ruins for towers and deciding the
//!    outcome when a primary tower falls
//!
//! # Example
//!
//! ```
//! use lane_core::prelude::*;
//!
//! let mut battle = Battle::standard(7).unwrap();
//! let id = battle.place(UnitKind::Knight, 300, 600, Side::Blue).unwrap();
//! battle.tick();
//! assert!(battle.entities().contains(id));
//! assert_eq!(battle.current_tick(), 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::behavior::{step_unit, StepContext};
use crate::combat::DamageEvent;
use crate::components::{
    CombatStats, EntityId, Facing, Health, StrategicTarget, UnitState,
};
use crate::config::BattleConfig;
use crate::economy::{Economy, ResourcePool, ResourceReadout};
use crate::error::{PlacementError, Result};
use crate::factions::Side;
use crate::map::{Arena, Cell};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::opponent::{OpponentController, OpponentView};
use crate::projectile::{Flight, Projectile, ProjectilePool};
use crate::snapshot::Frame;
use crate::spatial::{Occupant, SpatialIndex};
use crate::tower::step_tower;
use crate::unit_kind::{TowerTier, UnitKind};

/// Per-unit decision state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitBrain {
    /// Stat table entry.
    pub kind: UnitKind,
    /// Long-term destination while nothing is engaged.
    pub strategic: Option<StrategicTarget>,
    /// Seconds until a path may be recomputed.
    #[serde(with = "fixed_serde")]
    pub repath_timer: Fixed,
    /// Mode chosen on the last step.
    pub state: UnitState,
}

/// Per-tower data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TowerPost {
    /// Minor or primary.
    pub tier: TowerTier,
}

/// What an entity is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// A mobile unit.
    Unit(UnitBrain),
    /// A stationary tower.
    Tower(TowerPost),
}

/// A unit or tower on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier, assigned by [`EntityStorage::insert`].
    pub id: EntityId,
    /// Owning side.
    pub side: Side,
    /// World position.
    pub position: Vec2Fixed,
    /// Hit points.
    pub health: Health,
    /// Attack and movement numbers.
    pub combat: CombatStats,
    /// Heading for sprite selection.
    pub facing: Facing,
    /// Opposing entity currently being fought.
    pub engaged: Option<EntityId>,
    /// Waypoints still to walk, nearest first.
    pub path: VecDeque<Vec2Fixed>,
    /// Unit or tower data.
    pub role: Role,
}

impl Entity {
    /// A fresh unit at full health. The id is assigned on insertion.
    #[must_use]
    pub fn unit(
        kind: UnitKind,
        side: Side,
        position: Vec2Fixed,
        strategic: Option<StrategicTarget>,
    ) -> Self {
        let stats = kind.stats();
        Self {
            id: 0,
            side,
            position,
            health: Health::new(stats.max_health),
            combat: stats.combat(),
            facing: Facing::default(),
            engaged: None,
            path: VecDeque::new(),
            role: Role::Unit(UnitBrain {
                kind,
                strategic,
                repath_timer: Fixed::ZERO,
                state: UnitState::Marching,
            }),
        }
    }

    /// A fresh tower at full health.
    #[must_use]
    pub fn tower(tier: TowerTier, side: Side, position: Vec2Fixed) -> Self {
        let (combat, max_health) = tier.combat();
        Self {
            id: 0,
            side,
            position,
            health: Health::new(max_health),
            combat,
            facing: Facing::default(),
            engaged: None,
            path: VecDeque::new(),
            role: Role::Tower(TowerPost { tier }),
        }
    }

    /// True for towers.
    #[must_use]
    pub const fn is_structure(&self) -> bool {
        matches!(self.role, Role::Tower(_))
    }

    /// Unit kind, if this is a unit.
    #[must_use]
    pub const fn kind(&self) -> Option<UnitKind> {
        match &self.role {
            Role::Unit(brain) => Some(brain.kind),
            Role::Tower(_) => None,
        }
    }

    /// Tower tier, if this is a tower.
    #[must_use]
    pub const fn tier(&self) -> Option<TowerTier> {
        match &self.role {
            Role::Tower(post) => Some(post.tier),
            Role::Unit(_) => None,
        }
    }

    /// Unit state; towers always report [`UnitState::Attacking`] while
    /// engaged and [`UnitState::Marching`] otherwise.
    #[must_use]
    pub const fn state(&self) -> UnitState {
        match &self.role {
            Role::Unit(brain) => brain.state,
            Role::Tower(_) if self.engaged.is_some() => UnitState::Attacking,
            Role::Tower(_) => UnitState::Marching,
        }
    }

    /// Index entry for this entity.
    #[must_use]
    pub const fn occupant(&self) -> Occupant {
        Occupant {
            id: self.id,
            side: self.side,
            position: self.position,
            is_structure: self.is_structure(),
        }
    }
}

/// Storage for all entities in the battle.
///
/// Uses a `HashMap` for O(1) entity lookup by ID, with deterministic
/// iteration via sorted keys when stepping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityStorage {
    /// Map of entity ID to entity data.
    entities: HashMap<EntityId, Entity>,
    /// Next entity ID to assign.
    next_id: EntityId,
}

impl Default for EntityStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its ID.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Put back an entity previously taken out with [`Self::remove`],
    /// keeping its id.
    pub fn reattach(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// True if the entity exists and has health left.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(|e| !e.health.is_dead())
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Entities in ascending id order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.sorted_ids().into_iter().filter_map(move |id| self.get(id))
    }

    /// Lowest-id living tower of `side` with the given tier.
    #[must_use]
    pub fn find_tower(&self, side: Side, tier: TowerTier) -> Option<EntityId> {
        self.iter_sorted()
            .find(|e| e.side == side && e.tier() == Some(tier) && !e.health.is_dead())
            .map(|e| e.id)
    }
}

/// A validated-on-apply deployment request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    /// Unit to deploy.
    pub kind: UnitKind,
    /// World x in whole pixels.
    pub x: i32,
    /// World y in whole pixels.
    pub y: i32,
    /// Issuing side.
    pub side: Side,
}

/// How the battle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outcome {
    /// Side whose opponent lost its primary tower.
    pub winner: Side,
    /// Tick on which the primary tower fell.
    pub tick: u64,
}

/// A destroyed tower's footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ruin {
    /// Side that owned the tower.
    pub side: Side,
    /// Tier of the tower.
    pub tier: TowerTier,
    /// Where it stood.
    pub position: Vec2Fixed,
}

/// Events generated during a tick.
///
/// These events can be used by a front end to trigger effects, sounds and
/// animations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Damage from attacks and projectile impacts.
    pub damage: Vec<DamageEvent>,
    /// Entities removed this tick.
    pub deaths: Vec<EntityId>,
    /// Units placed by the opponent this tick.
    pub spawned: Vec<EntityId>,
    /// Towers destroyed this tick.
    pub ruins: Vec<Ruin>,
    /// Set on the tick a primary tower falls.
    pub outcome: Option<Outcome>,
}

/// Construction options that are not numeric tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSetup {
    /// Seed for the opponent's random choices.
    pub seed: u64,
    /// Place a tower on every tower site of the arena.
    pub spawn_towers: bool,
    /// Let the opponent controller drive Red.
    pub opponent: bool,
}

impl Default for BattleSetup {
    fn default() -> Self {
        Self {
            seed: 0,
            spawn_towers: true,
            opponent: true,
        }
    }
}

/// A running battle.
#[derive(Debug, Clone)]
pub struct Battle {
    tick: u64,
    seed: u64,
    arena: Arena,
    config: BattleConfig,
    entities: EntityStorage,
    index: SpatialIndex,
    economy: Economy,
    projectiles: Vec<Projectile>,
    pool: ProjectilePool,
    ruins: Vec<Ruin>,
    opponent: Option<OpponentController>,
    outcome: Option<Outcome>,
}

impl Battle {
    /// Create a battle on `arena`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn new(arena: Arena, config: BattleConfig, setup: BattleSetup) -> Result<Self> {
        config.validate()?;

        let economy = Economy::new(
            ResourcePool::new(config.resource_start, config.resource_max, config.opponent_regen()),
            ResourcePool::new(config.resource_start, config.resource_max, config.player_regen()),
        );
        let opponent = setup
            .opponent
            .then(|| OpponentController::new(Side::Red, config.difficulty, setup.seed));

        let mut battle = Self {
            tick: 0,
            seed: setup.seed,
            index: SpatialIndex::for_map(&arena.map),
            arena,
            config,
            entities: EntityStorage::new(),
            economy,
            projectiles: Vec::new(),
            pool: ProjectilePool::new(),
            ruins: Vec::new(),
            opponent,
            outcome: None,
        };

        if setup.spawn_towers {
            let sites = battle.arena.landmarks.tower_sites.clone();
            for site in sites {
                battle.spawn_tower(site.tier, site.side, site.cell);
            }
        }

        info!(
            seed = setup.seed,
            towers = battle.entities.len(),
            difficulty = battle.config.difficulty.name(),
            "battle created"
        );
        Ok(battle)
    }

    /// The standard arena with default tunables, towers and opponent.
    pub fn standard(seed: u64) -> Result<Self> {
        Self::new(
            Arena::standard()?,
            BattleConfig::default(),
            BattleSetup {
                seed,
                ..BattleSetup::default()
            },
        )
    }

    /// Number of completed ticks.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Opponent seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Terrain and landmarks.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Tunables.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// All entities.
    #[must_use]
    pub const fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Mutable access to entities, for scripted setups.
    pub fn entities_mut(&mut self) -> &mut EntityStorage {
        &mut self.entities
    }

    /// Projectiles in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Projectile free lists.
    #[must_use]
    pub const fn projectile_pool(&self) -> &ProjectilePool {
        &self.pool
    }

    /// Destroyed tower footprints, in destruction order.
    #[must_use]
    pub fn ruins(&self) -> &[Ruin] {
        &self.ruins
    }

    /// Both resource pools.
    #[must_use]
    pub const fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Resource bar values for a side.
    #[must_use]
    pub fn readout(&self, side: Side) -> ResourceReadout {
        self.economy.pool(side).readout()
    }

    /// Set once a primary tower falls.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// True once the battle has a winner.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Winning side, if decided.
    #[must_use]
    pub fn winner(&self) -> Option<Side> {
        self.outcome.map(|o| o.winner)
    }

    /// Render-ready copy of the current state.
    #[must_use]
    pub fn frame(&self) -> Frame {
        Frame::capture(self)
    }

    /// Validate and apply a placement command.
    ///
    /// # Errors
    ///
    /// Rejections leave the battle untouched.
    pub fn place(&mut self, kind: UnitKind, x: i32, y: i32, side: Side) -> std::result::Result<EntityId, PlacementError> {
        self.place_at(kind, Vec2Fixed::from_ints(x, y), side)
    }

    /// [`Self::place`] taking a [`Placement`].
    pub fn apply_placement(&mut self, placement: &Placement) -> std::result::Result<EntityId, PlacementError> {
        self.place(placement.kind, placement.x, placement.y, placement.side)
    }

    fn place_at(&mut self, kind: UnitKind, point: Vec2Fixed, side: Side) -> std::result::Result<EntityId, PlacementError> {
        if self.outcome.is_some() {
            return Err(PlacementError::BattleOver);
        }
        let Some((row, col)) = self.arena.map.cell_of(point) else {
            let (x, y) = point.to_pixels();
            return Err(PlacementError::OutOfBounds { x, y });
        };
        if !self.arena.map.is_passable(row, col) {
            return Err(PlacementError::Impassable { row, col });
        }
        if !self.arena.landmarks.half_contains(side, row) {
            return Err(PlacementError::WrongSide { row, col });
        }
        self.economy.pool_mut(side).try_spend(kind.stats().cost)?;

        let strategic = self
            .nearest_opposing_tower(side, point)
            .map(StrategicTarget::Structure);
        let id = self.spawn_unit(kind, side, point, strategic);
        debug!(tick = self.tick, %side, kind = kind.name(), id, row, col, "unit placed");
        Ok(id)
    }

    /// Add a unit without validation or cost.
    pub fn spawn_unit(
        &mut self,
        kind: UnitKind,
        side: Side,
        position: Vec2Fixed,
        strategic: Option<StrategicTarget>,
    ) -> EntityId {
        self.entities.insert(Entity::unit(kind, side, position, strategic))
    }

    /// Add a tower centred on `cell`.
    pub fn spawn_tower(&mut self, tier: TowerTier, side: Side, cell: Cell) -> EntityId {
        let position = self.arena.map.cell_center(cell);
        self.entities.insert(Entity::tower(tier, side, position))
    }

    /// Closest living tower not owned by `side`; ties go to the lower id.
    #[must_use]
    pub fn nearest_opposing_tower(&self, side: Side, point: Vec2Fixed) -> Option<EntityId> {
        self.entities
            .iter_sorted()
            .filter(|e| e.is_structure() && e.side != side && !e.health.is_dead())
            .min_by_key(|e| (e.position.distance_squared(point), e.id))
            .map(|e| e.id)
    }

    /// Advance the battle by one tick.
    ///
    /// Does nothing once the outcome is decided.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();
        if self.outcome.is_some() {
            return events;
        }
        let dt = self.config.dt();

        self.rebuild_index();
        self.economy.accrue(dt);
        self.run_opponent(dt, &mut events);
        self.step_entities(dt, &mut events);
        self.advance_projectiles(dt, &mut events);
        self.remove_dead(&mut events);
        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        self.tick += 1;
        debug!(tick = self.tick, state_hash = self.state_hash(), "tick complete");
        events
    }

    fn rebuild_index(&mut self) {
        let occupants: Vec<Occupant> = self
            .entities
            .iter_sorted()
            .filter(|e| !e.health.is_dead())
            .map(Entity::occupant)
            .collect();
        self.index.rebuild(occupants);
    }

    fn run_opponent(&mut self, dt: Fixed, events: &mut TickEvents) {
        let Some(mut opponent) = self.opponent.take() else {
            return;
        };
        let side = opponent.side();
        let order = opponent.update(
            dt,
            &OpponentView {
                storage: &self.entities,
                arena: &self.arena,
                pool: self.economy.pool(side),
                overflow_percent: self.config.overflow_percent,
            },
        );
        if let Some(order) = order {
            match self.place_at(order.kind, order.position, side) {
                Ok(id) => events.spawned.push(id),
                Err(err) => debug!(tick = self.tick, %side, %err, "opponent placement rejected"),
            }
        }
        self.opponent = Some(opponent);
    }

    fn step_entities(&mut self, dt: Fixed, events: &mut TickEvents) {
        let ctx = StepContext {
            map: &self.arena.map,
            index: &self.index,
            config: &self.config,
            dt,
        };

        for id in self.entities.sorted_ids() {
            let Some(mut entity) = self.entities.remove(id) else {
                continue;
            };
            if !entity.health.is_dead() {
                if entity.is_structure() {
                    step_tower(&mut entity, &self.entities, &ctx, &mut self.pool, &mut self.projectiles);
                } else {
                    step_unit(&mut entity, &mut self.entities, &ctx, &mut events.damage);
                }
            }
            self.entities.reattach(entity);
        }
    }

    fn advance_projectiles(&mut self, dt: Fixed, events: &mut TickEvents) {
        let hit_threshold = Fixed::from_num(self.config.projectile_hit_threshold);
        let mut in_flight = Vec::with_capacity(self.projectiles.len());

        for mut projectile in std::mem::take(&mut self.projectiles) {
            match projectile.advance(&mut self.entities, dt, hit_threshold) {
                Flight::InFlight => in_flight.push(projectile),
                Flight::Hit(event) => {
                    events.damage.push(event);
                    self.pool.release(projectile);
                }
                Flight::Fizzled => self.pool.release(projectile),
            }
        }
        self.projectiles = in_flight;
    }

    fn remove_dead(&mut self, events: &mut TickEvents) {
        for id in self.entities.sorted_ids() {
            if self.entities.is_alive(id) {
                continue;
            }
            let Some(entity) = self.entities.remove(id) else {
                continue;
            };
            events.deaths.push(id);

            let Role::Tower(post) = entity.role else {
                continue;
            };
            let ruin = Ruin {
                side: entity.side,
                tier: post.tier,
                position: entity.position,
            };
            self.ruins.push(ruin);
            events.ruins.push(ruin);
            info!(tick = self.tick, side = %entity.side, tier = post.tier.name(), "tower destroyed");

            if post.tier.is_primary() && self.outcome.is_none() {
                let outcome = Outcome {
                    winner: entity.side.opponent(),
                    tick: self.tick,
                };
                self.outcome = Some(outcome);
                events.outcome = Some(outcome);
                info!(tick = self.tick, winner = %outcome.winner, "battle decided");
            }
        }
    }

    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        for entity in self.entities.iter_sorted() {
            assert!(entity.health.current <= entity.health.max, "entity {} overhealed", entity.id);
            assert!(!entity.health.is_dead(), "entity {} survived removal", entity.id);
            assert_ne!(entity.engaged, Some(entity.id), "entity {} engaged itself", entity.id);
        }
        for projectile in &self.projectiles {
            assert!(projectile.active && projectile.target.is_some(), "idle projectile in flight");
        }
    }

    /// Hash of all mutable battle state, for replay verification and
    /// determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.entities.len().hash(&mut hasher);
        for entity in self.entities.iter_sorted() {
            entity.hash(&mut hasher);
        }

        self.projectiles.hash(&mut hasher);
        self.economy.hash(&mut hasher);
        self.ruins.hash(&mut hasher);
        self.outcome.hash(&mut hasher);

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Battle {
        Battle::new(
            Arena::open(20, 20, 40).unwrap(),
            BattleConfig::default(),
            BattleSetup {
                seed: 1,
                spawn_towers: false,
                opponent: false,
            },
        )
        .unwrap()
    }

    #[test]
    fn storage_ids_are_monotonic_and_never_reused() {
        let mut storage = EntityStorage::new();
        let a = storage.insert(Entity::unit(UnitKind::Knight, Side::Red, Vec2Fixed::ZERO, None));
        let b = storage.insert(Entity::unit(UnitKind::Knight, Side::Red, Vec2Fixed::ZERO, None));
        storage.remove(b);
        let c = storage.insert(Entity::unit(UnitKind::Knight, Side::Red, Vec2Fixed::ZERO, None));
        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(storage.sorted_ids(), vec![1, 3]);
    }

    #[test]
    fn reattach_keeps_id() {
        let mut storage = EntityStorage::new();
        let id = storage.insert(Entity::unit(UnitKind::Knight, Side::Red, Vec2Fixed::ZERO, None));
        let entity = storage.remove(id).unwrap();
        storage.reattach(entity);
        assert_eq!(storage.get(id).unwrap().id, id);
        assert_eq!(
            storage.insert(Entity::unit(UnitKind::Knight, Side::Red, Vec2Fixed::ZERO, None)),
            2
        );
    }

    #[test]
    fn standard_battle_has_six_towers() {
        let battle = Battle::standard(0).unwrap();
        assert_eq!(battle.entities().len(), 6);
        assert!(battle.entities().find_tower(Side::Red, TowerTier::King).is_some());
        assert_eq!(battle.readout(Side::Blue), ResourceReadout { current: 5, max: 10 });
    }

    #[test]
    fn placement_validation_order() {
        let mut battle = Battle::standard(0).unwrap();
        assert_eq!(
            battle.place(UnitKind::Knight, -10, 600, Side::Blue),
            Err(PlacementError::OutOfBounds { x: -10, y: 600 })
        );
        assert_eq!(
            battle.place(UnitKind::Knight, 20, 380, Side::Blue),
            Err(PlacementError::Impassable { row: 9, col: 0 })
        );
        assert_eq!(
            battle.place(UnitKind::Knight, 300, 100, Side::Blue),
            Err(PlacementError::WrongSide { row: 2, col: 7 })
        );
        assert_eq!(
            battle.place(UnitKind::Pekka, 300, 600, Side::Blue),
            Err(PlacementError::InsufficientResources { required: 7, available: 5 })
        );
        assert_eq!(battle.entities().len(), 6);
        assert_eq!(battle.readout(Side::Blue).current, 5);
    }

    #[test]
    fn placement_spends_and_targets_nearest_tower() {
        let mut battle = Battle::standard(0).unwrap();
        let id = battle.place(UnitKind::Knight, 100, 600, Side::Blue).unwrap();
        assert_eq!(battle.readout(Side::Blue).current, 2);

        let princess = battle
            .entities()
            .iter_sorted()
            .find(|e| e.side == Side::Red && e.tier() == Some(TowerTier::Princess))
            .map(|e| e.id)
            .unwrap();
        let Role::Unit(brain) = &battle.entities().get(id).unwrap().role else {
            panic!("placed entity is not a unit");
        };
        assert_eq!(brain.strategic, Some(StrategicTarget::Structure(princess)));
    }

    #[test]
    fn tick_advances_counter_and_accrues() {
        let mut battle = sandbox();
        for _ in 0..60 {
            battle.tick();
        }
        assert_eq!(battle.current_tick(), 60);
        // 3 seconds at 0.357/s on top of 5.
        assert_eq!(battle.readout(Side::Blue).current, 6);
    }

    #[test]
    fn dead_entities_are_removed() {
        let mut battle = sandbox();
        let id = battle.spawn_unit(UnitKind::Melee, Side::Red, Vec2Fixed::from_ints(100, 100), None);
        battle.entities_mut().get_mut(id).unwrap().health.current = 0;
        let events = battle.tick();
        assert_eq!(events.deaths, vec![id]);
        assert!(!battle.entities().contains(id));
    }

    #[test]
    fn state_hash_tracks_changes() {
        let mut a = sandbox();
        let b = a.clone();
        assert_eq!(a.state_hash(), b.state_hash());
        a.spawn_unit(UnitKind::Melee, Side::Red, Vec2Fixed::from_ints(100, 100), None);
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
