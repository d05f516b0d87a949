//! Render-ready copies of battle state.
//!
//! A [`Frame`] is captured while the battle lock is held and then drawn
//! after the lock is released, so presentation never reads live state.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, SpriteDirection, UnitState};
use crate::economy::ResourceReadout;
use crate::factions::Side;
use crate::simulation::{Battle, Outcome, Role};
use crate::unit_kind::{TowerTier, UnitKind};

/// One unit as drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSprite {
    /// Entity id.
    pub id: EntityId,
    /// Owner.
    pub side: Side,
    /// Kind.
    pub kind: UnitKind,
    /// Whole-pixel x.
    pub x: i32,
    /// Whole-pixel y.
    pub y: i32,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// State on the last tick.
    pub state: UnitState,
    /// Drawn direction.
    pub direction: SpriteDirection,
    /// Mirror horizontally.
    pub flipped: bool,
    /// Sprite-sheet row.
    pub row: u8,
}

/// One tower as drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerSprite {
    /// Entity id.
    pub id: EntityId,
    /// Owner.
    pub side: Side,
    /// Tier.
    pub tier: TowerTier,
    /// Whole-pixel x.
    pub x: i32,
    /// Whole-pixel y.
    pub y: i32,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// True while it has a target.
    pub firing: bool,
}

/// A projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotSprite {
    /// Pool serial.
    pub serial: u64,
    /// Whole-pixel x.
    pub x: i32,
    /// Whole-pixel y.
    pub y: i32,
}

/// A destroyed tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuinSprite {
    /// Former owner.
    pub side: Side,
    /// Former tier.
    pub tier: TowerTier,
    /// Whole-pixel x.
    pub x: i32,
    /// Whole-pixel y.
    pub y: i32,
}

/// Everything a presentation pass needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Completed ticks.
    pub tick: u64,
    /// Units in id order.
    pub units: Vec<UnitSprite>,
    /// Towers in id order.
    pub towers: Vec<TowerSprite>,
    /// Projectiles in firing order.
    pub shots: Vec<ShotSprite>,
    /// Ruins in destruction order.
    pub ruins: Vec<RuinSprite>,
    /// Red resource bar.
    pub red: ResourceReadout,
    /// Blue resource bar.
    pub blue: ResourceReadout,
    /// Set once decided.
    pub outcome: Option<Outcome>,
}

impl Frame {
    /// Copy the current battle state.
    #[must_use]
    pub fn capture(battle: &Battle) -> Self {
        let mut units = Vec::new();
        let mut towers = Vec::new();

        for entity in battle.entities().iter_sorted() {
            let (x, y) = entity.position.to_pixels();
            match &entity.role {
                Role::Unit(brain) => {
                    let (direction, flipped) = entity.facing.sprite_direction();
                    let stats = brain.kind.stats();
                    units.push(UnitSprite {
                        id: entity.id,
                        side: entity.side,
                        kind: brain.kind,
                        x,
                        y,
                        health: entity.health.current,
                        max_health: entity.health.max,
                        state: brain.state,
                        direction,
                        flipped,
                        row: stats.rows.row(brain.state, direction),
                    });
                }
                Role::Tower(post) => towers.push(TowerSprite {
                    id: entity.id,
                    side: entity.side,
                    tier: post.tier,
                    x,
                    y,
                    health: entity.health.current,
                    max_health: entity.health.max,
                    firing: entity.engaged.is_some(),
                }),
            }
        }

        let shots = battle
            .projectiles()
            .iter()
            .map(|p| {
                let (x, y) = p.position.to_pixels();
                ShotSprite {
                    serial: p.serial,
                    x,
                    y,
                }
            })
            .collect();
        let ruins = battle
            .ruins()
            .iter()
            .map(|r| {
                let (x, y) = r.position.to_pixels();
                RuinSprite {
                    side: r.side,
                    tier: r.tier,
                    x,
                    y,
                }
            })
            .collect();

        Self {
            tick: battle.current_tick(),
            units,
            towers,
            shots,
            ruins,
            red: battle.readout(Side::Red),
            blue: battle.readout(Side::Blue),
            outcome: battle.outcome(),
        }
    }

    /// Number of living units on a side.
    #[must_use]
    pub fn unit_count(&self, side: Side) -> usize {
        self.units.iter().filter(|u| u.side == side).count()
    }

    /// Number of standing towers on a side.
    #[must_use]
    pub fn tower_count(&self, side: Side) -> usize {
        self.towers.iter().filter(|t| t.side == side).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_towers_and_resources() {
        let battle = Battle::standard(0).unwrap();
        let frame = battle.frame();
        assert_eq!(frame.tick, 0);
        assert_eq!(frame.tower_count(Side::Red), 3);
        assert_eq!(frame.tower_count(Side::Blue), 3);
        assert_eq!(frame.blue, ResourceReadout { current: 5, max: 10 });
        assert!(frame.units.is_empty());
        assert_eq!(frame.outcome, None);
    }

    #[test]
    fn unit_sprite_uses_walk_row_while_marching() {
        let mut battle = Battle::standard(0).unwrap();
        let id = battle.place(UnitKind::Knight, 300, 600, Side::Blue).unwrap();
        let frame = battle.frame();
        let sprite = frame.units.iter().find(|u| u.id == id).unwrap();
        // Default heading is down; Knight walk-down row is 7.
        assert_eq!(sprite.direction, SpriteDirection::Down);
        assert_eq!(sprite.row, 7);
        assert_eq!((sprite.x, sprite.y), (300, 600));
    }

    #[test]
    fn frame_serializes_to_ron() {
        let frame = Battle::standard(0).unwrap().frame();
        let text = ron::to_string(&frame).unwrap();
        let back: Frame = ron::from_str(&text).unwrap();
        assert_eq!(back, frame);
    }
}
