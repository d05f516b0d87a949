//! Tower targeting and firing.
//!
//! Towers never move. Every tick a tower re-acquires the nearest living
//! enemy in range, units and structures alike, and fires a pooled
//! projectile from its muzzle whenever the cooldown allows.

use crate::behavior::StepContext;
use crate::math::{Fixed, Vec2Fixed};
use crate::projectile::{Projectile, ProjectileKind, ProjectilePool};
use crate::simulation::{Entity, EntityStorage};

/// Advance one tower by a tick.
///
/// `tower` must be detached from `storage`. New shots are pushed onto
/// `in_flight`.
pub fn step_tower(
    tower: &mut Entity,
    storage: &EntityStorage,
    ctx: &StepContext<'_>,
    pool: &mut ProjectilePool,
    in_flight: &mut Vec<Projectile>,
) {
    tower.combat.tick_cooldown(ctx.dt);
    let side = tower.side;
    tower.engaged = ctx
        .index
        .nearest(tower.position, tower.combat.range, |occupant| {
            occupant.side != side && storage.is_alive(occupant.id)
        })
        .map(|occupant| occupant.id);

    let Some(target_id) = tower.engaged else {
        return;
    };
    let Some(target_pos) = storage.get(target_id).map(|t| t.position) else {
        return;
    };
    tower.facing.face(target_pos - tower.position);

    if tower.combat.ready() {
        let muzzle = tower.position - Vec2Fixed::new(Fixed::ZERO, Fixed::from_num(ctx.config.muzzle_offset));
        let mut shot = pool.acquire(ProjectileKind::TowerBolt);
        shot.launch(
            tower.id,
            target_id,
            muzzle,
            Fixed::from_num(ctx.config.projectile_speed),
            tower.combat.attack,
        );
        in_flight.push(shot);
        tower.combat.reset_cooldown();
    }
}
