//! Per-tick unit decision making.
//!
//! Every unit kind runs the same three-state machine:
//!
//! - **Marching**: nothing engaged; walk the path toward the strategic
//!   target (a tower, or a fixed point).
//! - **Pursuing**: an engaged target is out of reach; re-path toward it at
//!   most once per repath interval.
//! - **Attacking**: the engaged target is within range; stop, face it and
//!   swing whenever the cooldown allows.
//!
//! Acquisition scans the spatial index within the unit's aggro radius. Once
//! engaged, a target is kept until it dies, disappears, or moves beyond the
//! aggro radius scaled by the configured slack, so units on the edge of
//! aggro range do not flicker between targets.

use std::collections::VecDeque;

use crate::combat::{resolve_attack, Attack, DamageEvent};
use crate::components::{EntityId, Facing, StrategicTarget, UnitState};
use crate::config::BattleConfig;
use crate::factions::Side;
use crate::map::GridMap;
use crate::math::{Fixed, Vec2Fixed};
use crate::pathfinding::{find_path, path_to_waypoints};
use crate::simulation::{Entity, EntityStorage, Role, UnitBrain};
use crate::spatial::SpatialIndex;
use crate::unit_kind::{TowerTier, UnitStats};

/// Read-only world state shared by every step in a tick.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// Terrain.
    pub map: &'a GridMap,
    /// Start-of-tick positions.
    pub index: &'a SpatialIndex,
    /// Tunables.
    pub config: &'a BattleConfig,
    /// Seconds per tick.
    pub dt: Fixed,
}

/// Advance one unit by a tick.
///
/// `entity` must be detached from `storage`. Damage dealt is appended to
/// `events`. Towers are ignored.
pub fn step_unit(
    entity: &mut Entity,
    storage: &mut EntityStorage,
    ctx: &StepContext<'_>,
    events: &mut Vec<DamageEvent>,
) {
    let Entity {
        id,
        side,
        position,
        combat,
        facing,
        engaged,
        path,
        role,
        ..
    } = entity;
    let Role::Unit(brain) = role else {
        return;
    };
    let stats = brain.kind.stats();

    combat.tick_cooldown(ctx.dt);
    if brain.repath_timer > Fixed::ZERO {
        brain.repath_timer -= ctx.dt;
    }

    let aggro = Fixed::from_num(stats.aggro_radius);
    revalidate_engagement(engaged, path, brain, storage, *side, *position, aggro * ctx.config.aggro_slack());
    if engaged.is_none() {
        acquire_target(engaged, path, brain, storage, ctx.index, &stats, *side, *position, aggro);
    }

    let step = combat.speed * ctx.dt;
    let arrival = Fixed::from_num(ctx.config.arrival_threshold);

    let target = engaged.and_then(|target_id| storage.get(target_id).map(|t| (target_id, t.position)));
    if let Some((target_id, target_pos)) = target {
        if combat.in_range_sq(position.distance_squared(target_pos)) {
            brain.state = UnitState::Attacking;
            path.clear();
            facing.face(target_pos - *position);
            if combat.ready() {
                let attack = Attack {
                    attacker: *id,
                    side: *side,
                    origin: *position,
                    damage: combat.attack,
                    effect: stats.effect,
                };
                resolve_attack(&attack, target_id, storage, ctx.index, events);
                combat.reset_cooldown();
            }
        } else {
            brain.state = UnitState::Pursuing;
            if path.is_empty() || brain.repath_timer <= Fixed::ZERO {
                replan(path, ctx.map, *position, target_pos);
                brain.repath_timer = ctx.config.repath_interval();
            }
            follow(position, facing, path, ctx.map, target_pos, step, arrival);
        }
        return;
    }

    brain.state = UnitState::Marching;
    let Some(goal) = strategic_goal(brain, path, storage, *side) else {
        return;
    };
    // The timer only throttles retries toward an unreachable goal.
    if path.is_empty() && brain.repath_timer <= Fixed::ZERO {
        replan(path, ctx.map, *position, goal);
        brain.repath_timer = ctx.config.repath_interval();
    }
    follow(position, facing, path, ctx.map, goal, step, arrival);
}

/// Drop the engaged target if it died, vanished, changed hands or moved out
/// of the leash radius. A dropped target re-plans the march on this tick.
fn revalidate_engagement(
    engaged: &mut Option<EntityId>,
    path: &mut VecDeque<Vec2Fixed>,
    brain: &mut UnitBrain,
    storage: &EntityStorage,
    side: Side,
    position: Vec2Fixed,
    leash: Fixed,
) {
    let Some(target_id) = *engaged else {
        return;
    };
    let keep = storage.get(target_id).is_some_and(|t| {
        t.side != side && !t.health.is_dead() && t.position.distance_squared(position) <= leash * leash
    });
    if !keep {
        *engaged = None;
        path.clear();
        brain.repath_timer = Fixed::ZERO;
    }
}

#[allow(clippy::too_many_arguments)]
fn acquire_target(
    engaged: &mut Option<EntityId>,
    path: &mut VecDeque<Vec2Fixed>,
    brain: &mut UnitBrain,
    storage: &EntityStorage,
    index: &SpatialIndex,
    stats: &UnitStats,
    side: Side,
    position: Vec2Fixed,
    aggro: Fixed,
) {
    let found = index.nearest(position, aggro, |occupant| {
        occupant.side != side && stats.policy.accepts(occupant) && storage.is_alive(occupant.id)
    });
    if let Some(found) = found {
        *engaged = Some(found.id);
        path.clear();
        brain.repath_timer = Fixed::ZERO;
    }
}

/// Where a marching unit is headed. A destroyed structure target is
/// replaced with the opposing primary tower.
fn strategic_goal(
    brain: &mut UnitBrain,
    path: &mut VecDeque<Vec2Fixed>,
    storage: &EntityStorage,
    side: Side,
) -> Option<Vec2Fixed> {
    match brain.strategic? {
        StrategicTarget::Point(point) => Some(point),
        StrategicTarget::Structure(target_id) => {
            if let Some(target) = storage.get(target_id).filter(|t| !t.health.is_dead()) {
                return Some(target.position);
            }
            path.clear();
            brain.repath_timer = Fixed::ZERO;
            brain.strategic = storage
                .find_tower(side.opponent(), TowerTier::King)
                .map(StrategicTarget::Structure);
            let next = brain.strategic?;
            match next {
                StrategicTarget::Structure(king) => storage.get(king).map(|k| k.position),
                StrategicTarget::Point(point) => Some(point),
            }
        }
    }
}

fn replan(path: &mut VecDeque<Vec2Fixed>, map: &GridMap, from: Vec2Fixed, to: Vec2Fixed) {
    path.clear();
    let (Some(start), Some(goal)) = (map.cell_of(from), map.cell_of(to)) else {
        return;
    };
    *path = path_to_waypoints(map, &find_path(map, start, goal));
}

/// Walk the waypoint queue. With no waypoints left, close the final
/// distance directly when already in the goal's cell.
fn follow(
    position: &mut Vec2Fixed,
    facing: &mut Facing,
    path: &mut VecDeque<Vec2Fixed>,
    map: &GridMap,
    goal: Vec2Fixed,
    step: Fixed,
    arrival: Fixed,
) {
    let arrival_sq = arrival * arrival;
    while let Some(&waypoint) = path.front() {
        if position.distance_squared(waypoint) < arrival_sq {
            path.pop_front();
            continue;
        }
        move_towards(position, facing, waypoint, step);
        return;
    }

    let same_cell = map.cell_of(*position).is_some() && map.cell_of(*position) == map.cell_of(goal);
    if same_cell && position.distance_squared(goal) >= arrival_sq {
        move_towards(position, facing, goal, step);
    }
}

fn move_towards(position: &mut Vec2Fixed, facing: &mut Facing, target: Vec2Fixed, step: Fixed) {
    let next = position.step_towards(target, step);
    facing.face(next - *position);
    *position = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit_kind::UnitKind;

    fn open_map() -> GridMap {
        GridMap::open(20, 20, 40).unwrap()
    }

    struct World {
        map: GridMap,
        index: SpatialIndex,
        config: BattleConfig,
        storage: EntityStorage,
    }

    impl World {
        fn new() -> Self {
            let map = open_map();
            Self {
                index: SpatialIndex::for_map(&map),
                map,
                config: BattleConfig::default(),
                storage: EntityStorage::new(),
            }
        }

        fn spawn(&mut self, kind: UnitKind, side: Side, x: i32, y: i32, strategic: Option<StrategicTarget>) -> EntityId {
            self.storage.insert(Entity::unit(kind, side, Vec2Fixed::from_ints(x, y), strategic))
        }

        fn step(&mut self, id: EntityId) -> Vec<DamageEvent> {
            let occupants: Vec<_> = self
                .storage
                .iter_sorted()
                .filter(|e| !e.health.is_dead())
                .map(Entity::occupant)
                .collect();
            self.index.rebuild(occupants);
            let ctx = StepContext {
                map: &self.map,
                index: &self.index,
                config: &self.config,
                dt: self.config.dt(),
            };
            let mut events = Vec::new();
            let mut entity = self.storage.remove(id).unwrap();
            step_unit(&mut entity, &mut self.storage, &ctx, &mut events);
            self.storage.reattach(entity);
            events
        }

        fn entity(&self, id: EntityId) -> &Entity {
            self.storage.get(id).unwrap()
        }
    }

    fn state(entity: &Entity) -> UnitState {
        entity.state()
    }

    #[test]
    fn marches_toward_point() {
        let mut world = World::new();
        let goal = Vec2Fixed::from_ints(420, 100);
        let id = world.spawn(UnitKind::Knight, Side::Blue, 100, 100, Some(StrategicTarget::Point(goal)));
        let start = world.entity(id).position.distance(goal);
        for _ in 0..20 {
            world.step(id);
        }
        let unit = world.entity(id);
        assert_eq!(state(unit), UnitState::Marching);
        assert!(unit.position.distance(goal) < start);
    }

    #[test]
    fn acquires_nearest_enemy_in_aggro() {
        let mut world = World::new();
        let id = world.spawn(UnitKind::Knight, Side::Blue, 100, 100, None);
        let near = world.spawn(UnitKind::Melee, Side::Red, 200, 100, None);
        world.spawn(UnitKind::Melee, Side::Red, 250, 100, None);
        world.spawn(UnitKind::Melee, Side::Blue, 120, 100, None);
        world.step(id);
        assert_eq!(world.entity(id).engaged, Some(near));
        assert_eq!(state(world.entity(id)), UnitState::Pursuing);
    }

    #[test]
    fn ignores_enemies_beyond_aggro() {
        let mut world = World::new();
        let id = world.spawn(UnitKind::Knight, Side::Blue, 100, 100, None);
        world.spawn(UnitKind::Melee, Side::Red, 300, 100, None);
        world.step(id);
        assert_eq!(world.entity(id).engaged, None);
    }

    #[test]
    fn attacks_in_range_and_respects_cooldown() {
        let mut world = World::new();
        let id = world.spawn(UnitKind::Knight, Side::Blue, 100, 100, None);
        let target = world.spawn(UnitKind::Tank, Side::Red, 150, 100, None);

        let first = world.step(id);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].target, target);
        assert_eq!(state(world.entity(id)), UnitState::Attacking);

        // One-second interval at 20 ticks per second.
        let mut hits = 0;
        for _ in 0..19 {
            hits += world.step(id).len();
        }
        assert_eq!(hits, 0);
        let mut later = 0;
        for _ in 0..3 {
            later += world.step(id).len();
        }
        assert_eq!(later, 1);
        assert_eq!(world.entity(target).health.current, 300 - 40);
    }

    #[test]
    fn keeps_target_inside_leash() {
        let mut world = World::new();
        let id = world.spawn(UnitKind::Knight, Side::Blue, 100, 100, None);
        let target = world.spawn(UnitKind::Melee, Side::Red, 250, 100, None);
        world.step(id);
        assert_eq!(world.entity(id).engaged, Some(target));

        // 230 away: beyond aggro (180) but inside the leash (270).
        world.storage.get_mut(target).unwrap().position = Vec2Fixed::from_ints(330, 100);
        world.storage.get_mut(id).unwrap().position = Vec2Fixed::from_ints(100, 100);
        world.step(id);
        assert_eq!(world.entity(id).engaged, Some(target));

        // 300 away: dropped.
        world.storage.get_mut(target).unwrap().position = Vec2Fixed::from_ints(400, 100);
        world.storage.get_mut(id).unwrap().position = Vec2Fixed::from_ints(100, 100);
        world.step(id);
        assert_eq!(world.entity(id).engaged, None);
    }

    #[test]
    fn resumes_march_on_the_tick_a_target_is_dropped() {
        let mut world = World::new();
        let goal = Vec2Fixed::from_ints(100, 700);
        let id = world.spawn(UnitKind::Knight, Side::Blue, 100, 100, Some(StrategicTarget::Point(goal)));
        let target = world.spawn(UnitKind::Melee, Side::Red, 250, 100, None);
        world.step(id);
        assert_eq!(world.entity(id).engaged, Some(target));
        assert_eq!(state(world.entity(id)), UnitState::Pursuing);

        world.storage.get_mut(target).unwrap().position = Vec2Fixed::from_ints(700, 100);
        let before = world.entity(id).position;
        world.step(id);
        let unit = world.entity(id);
        assert_eq!(unit.engaged, None);
        assert_eq!(state(unit), UnitState::Marching);
        assert!(!unit.path.is_empty());
        assert!(unit.position.distance(goal) < before.distance(goal));
    }

    #[test]
    fn area_attack_misses_engaged_target_outside_radius() {
        let mut world = World::new();
        let id = world.spawn(UnitKind::Valkyrie, Side::Blue, 100, 100, None);
        let target = world.spawn(UnitKind::Tank, Side::Red, 155, 100, None);
        let events = world.step(id);
        assert_eq!(world.entity(id).engaged, Some(target));
        assert_eq!(state(world.entity(id)), UnitState::Attacking);
        assert!(events.is_empty());
        assert_eq!(world.entity(target).health.current, 300);

        world.storage.get_mut(target).unwrap().position = Vec2Fixed::from_ints(140, 100);
        for _ in 0..30 {
            world.step(id);
        }
        assert!(world.entity(target).health.current < 300);
    }

    #[test]
    fn dead_target_is_released() {
        let mut world = World::new();
        let id = world.spawn(UnitKind::Knight, Side::Blue, 100, 100, None);
        let target = world.spawn(UnitKind::Melee, Side::Red, 150, 100, None);
        world.step(id);
        world.storage.get_mut(target).unwrap().health.current = 0;
        world.step(id);
        assert_eq!(world.entity(id).engaged, None);
        assert_eq!(state(world.entity(id)), UnitState::Marching);
    }

    #[test]
    fn structure_only_units_ignore_troops() {
        let mut world = World::new();
        let id = world.spawn(UnitKind::Giant, Side::Blue, 100, 100, None);
        world.spawn(UnitKind::Melee, Side::Red, 150, 100, None);
        let tower = world
            .storage
            .insert(Entity::tower(TowerTier::Princess, Side::Red, Vec2Fixed::from_ints(100, 250)));
        world.step(id);
        assert_eq!(world.entity(id).engaged, Some(tower));
    }

    #[test]
    fn destroyed_structure_target_falls_back_to_king() {
        let mut world = World::new();
        let princess = world
            .storage
            .insert(Entity::tower(TowerTier::Princess, Side::Red, Vec2Fixed::from_ints(700, 100)));
        let king = world
            .storage
            .insert(Entity::tower(TowerTier::King, Side::Red, Vec2Fixed::from_ints(700, 700)));
        let id = world.spawn(
            UnitKind::Knight,
            Side::Blue,
            100,
            100,
            Some(StrategicTarget::Structure(princess)),
        );
        world.step(id);
        world.storage.remove(princess);
        world.step(id);

        let Role::Unit(brain) = &world.entity(id).role else {
            panic!("not a unit");
        };
        assert_eq!(brain.strategic, Some(StrategicTarget::Structure(king)));
    }
}
