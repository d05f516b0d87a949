//! End-to-end battle scenarios driven through `Battle::tick`.

use lane_core::error::PlacementError;
use lane_core::prelude::*;
use lane_core::projectile::ProjectileKind;
use lane_test_utils::fixtures::{
    open_arena, run_until, sandbox, standard_battle, vec2, walled_arena,
};

fn health_of(battle: &Battle, id: EntityId) -> Option<u32> {
    battle.entities().get(id).map(|e| e.health.current)
}

// ============================================================================
// Tank against a melee pair
// ============================================================================

#[test]
fn tank_takes_damage_only_in_melee_hit_steps() {
    let mut battle = sandbox(open_arena(20, 20));
    let tank = battle.spawn_unit(
        UnitKind::Tank,
        Side::Red,
        vec2(400, 200),
        Some(StrategicTarget::Point(vec2(400, 760))),
    );
    let melee_a = battle.spawn_unit(
        UnitKind::Melee,
        Side::Blue,
        vec2(380, 600),
        Some(StrategicTarget::Point(vec2(380, 40))),
    );
    let melee_b = battle.spawn_unit(
        UnitKind::Melee,
        Side::Blue,
        vec2(420, 600),
        Some(StrategicTarget::Point(vec2(420, 40))),
    );

    let mut hits_on_tank = 0u32;
    let mut tank_has_struck = false;
    let mut first_contact = None;

    for _ in 0..600 {
        let events = battle.tick();
        for hit in &events.damage {
            if hit.target == tank {
                assert!(hit.attacker == melee_a || hit.attacker == melee_b);
                assert_eq!(hit.amount, 15);
                hits_on_tank += 1;
                first_contact.get_or_insert(battle.current_tick());
            }
            if hit.attacker == tank {
                assert!(hit.amount <= 20);
                tank_has_struck = true;
            }
        }

        match health_of(&battle, tank) {
            Some(current) => {
                let lost = 300 - current;
                assert_eq!(lost % 15, 0, "tank lost {lost} health");
                if !tank_has_struck {
                    assert_eq!(lost, 15 * hits_on_tank);
                }
            }
            None => break,
        }
        for melee in [melee_a, melee_b] {
            if let Some(current) = health_of(&battle, melee) {
                assert_eq!((150 - current) % 20, 0);
            }
        }
    }

    let contact = first_contact.expect("melee pair never reached the tank");
    // The gap closes at 90 px/s from 400 px apart.
    assert!(contact > 60, "contact at tick {contact}");
    assert!(health_of(&battle, tank).is_none(), "tank should fall to the pair");
    assert!(hits_on_tank >= 20);
}

#[test]
fn lone_unit_marches_to_its_point() {
    let mut battle = sandbox(open_arena(12, 12));
    let id = battle.spawn_unit(
        UnitKind::DartGoblin,
        Side::Blue,
        vec2(60, 420),
        Some(StrategicTarget::Point(vec2(420, 60))),
    );

    let arrived = run_until(&mut battle, 400, |b| {
        b.entities()
            .get(id)
            .is_some_and(|e| e.position.distance(vec2(420, 60)) < Fixed::from_num(6))
    });
    assert!(arrived.is_some());
    assert_eq!(battle.entities().get(id).unwrap().state(), UnitState::Marching);
}

#[test]
fn walls_are_walked_around() {
    let wall: Vec<Cell> = (1..8).map(|col| (3, col)).collect();
    let mut battle = sandbox(walled_arena(8, 8, &wall));
    let id = battle.spawn_unit(
        UnitKind::Knight,
        Side::Blue,
        vec2(300, 260),
        Some(StrategicTarget::Point(vec2(300, 60))),
    );

    let mut visited_gap = false;
    let reached = run_until(&mut battle, 800, |b| {
        let entity = b.entities().get(id).unwrap();
        let cell = b.arena().map.cell_of(entity.position).unwrap();
        assert!(b.arena().map.is_passable(cell.0, cell.1), "walked into {cell:?}");
        visited_gap |= cell == (3, 0);
        entity.position.distance(vec2(300, 60)) < Fixed::from_num(6)
    });
    assert!(reached.is_some());
    assert!(visited_gap);
}

// ============================================================================
// Towers and the outcome
// ============================================================================

#[test]
fn primary_tower_destruction_decides_once() {
    let mut battle = standard_battle(1, false);
    let king = battle.entities().find_tower(Side::Red, TowerTier::King).unwrap();
    battle.entities_mut().get_mut(king).unwrap().health.current = 0;

    let events = battle.tick();
    let outcome = events.outcome.expect("outcome on the deciding tick");
    assert_eq!(outcome.winner, Side::Blue);
    assert_eq!(outcome.tick, 0);
    assert_eq!(battle.winner(), Some(Side::Blue));
    assert!(events.deaths.contains(&king));
    assert_eq!(battle.ruins().len(), 1);
    assert_eq!(battle.ruins()[0].tier, TowerTier::King);

    let hash = battle.state_hash();
    for _ in 0..5 {
        let events = battle.tick();
        assert!(events.outcome.is_none());
        assert!(events.damage.is_empty());
    }
    assert_eq!(battle.current_tick(), 1);
    assert_eq!(battle.state_hash(), hash);
    assert_eq!(battle.outcome(), Some(outcome));
    assert_eq!(
        battle.place(UnitKind::Knight, 140, 500, Side::Blue),
        Err(PlacementError::BattleOver)
    );
}

#[test]
fn secondary_tower_leaves_ruin_without_deciding() {
    let mut battle = standard_battle(1, false);
    let princess = battle.entities().find_tower(Side::Red, TowerTier::Princess).unwrap();
    battle.entities_mut().get_mut(princess).unwrap().health.current = 0;

    let events = battle.tick();
    assert!(events.outcome.is_none());
    assert_eq!(events.ruins.len(), 1);
    assert_eq!(events.ruins[0].side, Side::Red);
    assert!(!battle.is_over());
    assert_eq!(battle.frame().ruins.len(), 1);
    assert_eq!(battle.frame().tower_count(Side::Red), 2);
}

#[test]
fn tower_bolts_are_pooled() {
    let mut battle = standard_battle(2, false);
    let princess = battle.entities().find_tower(Side::Blue, TowerTier::Princess).unwrap();
    let giant = battle.spawn_unit(
        UnitKind::Giant,
        Side::Red,
        vec2(140, 440),
        Some(StrategicTarget::Structure(princess)),
    );
    let blue_towers: Vec<EntityId> = battle
        .entities()
        .iter_sorted()
        .filter(|e| e.is_structure() && e.side == Side::Blue)
        .map(|e| e.id)
        .collect();

    let mut bolt_hits = 0u64;
    let mut fell = false;
    for _ in 0..600 {
        let events = battle.tick();
        bolt_hits += events
            .damage
            .iter()
            .filter(|hit| hit.target == giant && blue_towers.contains(&hit.attacker))
            .count() as u64;
        if events.deaths.contains(&giant) {
            fell = true;
            break;
        }
    }
    assert!(fell, "giant survived the towers");
    assert!(bolt_hits >= 9, "only {bolt_hits} bolts landed");

    // Let stragglers fizzle against the removed target.
    for _ in 0..60 {
        battle.tick();
    }
    let pool = battle.projectile_pool();
    assert!(battle.projectiles().is_empty());
    assert!(pool.created() < bolt_hits);
    assert_eq!(pool.free_count(ProjectileKind::TowerBolt) as u64, pool.created());
}

// ============================================================================
// Opponent
// ============================================================================

#[test]
fn opponent_counters_an_invader() {
    let mut battle = standard_battle(4, true);
    let invader = battle.spawn_unit(UnitKind::Knight, Side::Blue, vec2(300, 350), None);
    let start = battle.readout(Side::Red).current;

    let mut spawned = None;
    for _ in 0..60 {
        let events = battle.tick();
        if let Some(&id) = events.spawned.first() {
            spawned = Some(id);
            break;
        }
    }

    let id = spawned.expect("opponent never reacted");
    let counter = battle.entities().get(id).unwrap();
    assert_eq!(counter.side, Side::Red);
    assert_eq!(counter.kind(), Some(UnitKind::Knight));
    let (row, _) = battle.arena().map.cell_of(counter.position).unwrap();
    assert!(battle.arena().landmarks.half_contains(Side::Red, row));
    assert!(battle.entities().contains(invader));
    // Start of five, a Knight costs three, and under two seconds of regen.
    assert!(battle.readout(Side::Red).current < start);
}

#[test]
fn opponent_stays_idle_without_threats_or_surplus() {
    let mut battle = standard_battle(4, true);
    for _ in 0..100 {
        assert!(battle.tick().spawned.is_empty());
    }
    assert_eq!(battle.frame().unit_count(Side::Red), 0);
}
