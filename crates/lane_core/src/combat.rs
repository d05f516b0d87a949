//! Damage application and attack resolution.
//!
//! Attacks are instantaneous for units: when an attack fires, its damage
//! lands on the same tick. Towers fire projectiles instead (see
//! [`crate::projectile`]), which call back into [`apply_hit`] on impact.

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::factions::Side;
use crate::math::{Fixed, Vec2Fixed};
use crate::simulation::EntityStorage;
use crate::spatial::SpatialIndex;
use crate::unit_kind::AttackEffect;

/// One application of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Entity that caused the damage.
    pub attacker: EntityId,
    /// Entity that received it.
    pub target: EntityId,
    /// Health actually removed (after saturation at zero).
    pub amount: u32,
}

/// Everything needed to resolve one swing.
#[derive(Debug, Clone, Copy)]
pub struct Attack {
    /// Attacking entity. It must be detached from storage while resolving.
    pub attacker: EntityId,
    /// Attacker's side.
    pub side: Side,
    /// Attacker's position.
    pub origin: Vec2Fixed,
    /// Damage per hit.
    pub damage: u32,
    /// Hit rule.
    pub effect: AttackEffect,
}

/// Apply `amount` damage to a living entity.
///
/// Returns `None` if the target is gone or already dead.
pub fn apply_hit(
    storage: &mut EntityStorage,
    attacker: EntityId,
    target: EntityId,
    amount: u32,
) -> Option<DamageEvent> {
    let entity = storage.get_mut(target)?;
    if entity.health.is_dead() {
        return None;
    }
    let dealt = entity.health.apply_damage(amount);
    Some(DamageEvent {
        attacker,
        target,
        amount: dealt,
    })
}

/// Resolve one attack on `primary`.
///
/// [`AttackEffect::Area`] ignores `primary` and damages every living
/// opposing entity the index places within the radius of the attacker,
/// so an engaged target outside the radius is not hit. Index positions are
/// from the start of the tick.
pub fn resolve_attack(
    attack: &Attack,
    primary: EntityId,
    storage: &mut EntityStorage,
    index: &SpatialIndex,
    events: &mut Vec<DamageEvent>,
) {
    let AttackEffect::Area { radius } = attack.effect else {
        events.extend(apply_hit(storage, attack.attacker, primary, attack.damage));
        return;
    };

    let mut splash = Vec::new();
    index.for_each_within(attack.origin, Fixed::from_num(radius), |occupant, _| {
        if occupant.side != attack.side {
            splash.push(occupant.id);
        }
    });
    // Bucket order is spatial; damage order follows ids.
    splash.sort_unstable();
    for id in splash {
        events.extend(apply_hit(storage, attack.attacker, id, attack.damage));
    }
}
