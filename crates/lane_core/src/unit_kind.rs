//! Closed set of unit kinds and tower tiers with their stat tables.
//!
//! Every kind shares one state machine. The two places kinds differ in
//! behaviour, choosing what to attack and what an attack does, are data
//! on the table ([`TargetPolicy`] and [`AttackEffect`]).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::components::{CombatStats, SpriteDirection, UnitState};
use crate::math::{millis, Fixed};
use crate::spatial::Occupant;

/// Broad role of a unit, used by the opponent's counter table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitCategory {
    /// Slow, durable.
    Tank,
    /// Short-reach fighters.
    Melee,
    /// Long-reach, fragile.
    Ranged,
}

/// Which opposing entities a unit will engage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPolicy {
    /// Units and structures.
    AnyOpposing,
    /// Structures only; rank-and-file units are ignored.
    StructuresOnly,
}

impl TargetPolicy {
    /// Returns true if the policy allows engaging this occupant.
    #[must_use]
    pub const fn accepts(self, occupant: &Occupant) -> bool {
        match self {
            Self::AnyOpposing => true,
            Self::StructuresOnly => occupant.is_structure,
        }
    }
}

/// What landing a hit does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackEffect {
    /// Damage the engaged target only.
    Single,
    /// Damage every living enemy within `radius` of the attacker. The
    /// engaged target is hit only when it is inside that radius.
    Area {
        /// Radius in world units.
        radius: u32,
    },
}

/// Sprite-sheet rows for the five drawn directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnimationRows {
    /// Attack rows: up, up-right, right, down-right, down.
    pub attack: [u8; 5],
    /// Walk rows in the same order.
    pub walk: [u8; 5],
}

impl AnimationRows {
    const GENERIC: Self = Self {
        attack: [0, 1, 2, 3, 4],
        walk: [5, 6, 7, 8, 9],
    };

    /// Row to draw for a state and direction.
    #[must_use]
    pub const fn row(&self, state: UnitState, dir: SpriteDirection) -> u8 {
        match state {
            UnitState::Attacking => self.attack[dir.index()],
            UnitState::Marching | UnitState::Pursuing => self.walk[dir.index()],
        }
    }
}

/// Static numbers for one unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitStats {
    /// Starting and maximum health.
    pub max_health: u32,
    /// Damage per hit.
    pub attack: u32,
    /// Pixels per second.
    pub speed: u32,
    /// Attack reach in pixels.
    pub range: u32,
    /// Milliseconds between attacks.
    pub interval_ms: u32,
    /// Acquisition radius in pixels.
    pub aggro_radius: u32,
    /// Resource cost to place.
    pub cost: u32,
    /// Broad role.
    pub category: UnitCategory,
    /// Acquisition rule.
    pub policy: TargetPolicy,
    /// Hit rule.
    pub effect: AttackEffect,
    /// Sprite rows.
    pub rows: AnimationRows,
}

impl UnitStats {
    /// Fresh combat component for a newly spawned unit.
    #[must_use]
    pub fn combat(&self) -> CombatStats {
        CombatStats {
            attack: self.attack,
            range: Fixed::from_num(self.range),
            interval: millis(self.interval_ms),
            cooldown: Fixed::ZERO,
            speed: Fixed::from_num(self.speed),
        }
    }
}

/// Every deployable unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Generic heavy.
    Tank,
    /// Generic fighter.
    Melee,
    /// Generic shooter.
    Ranged,
    /// Heavy that only hits structures.
    Giant,
    /// Heavy hitter with a slow swing.
    Pekka,
    /// Sturdy fighter.
    Knight,
    /// Spinning area attacker.
    Valkyrie,
    /// Pair of shooters.
    Archers,
    /// Fast, long-reach, fragile.
    DartGoblin,
}

impl UnitKind {
    /// All kinds in declaration order.
    pub const ALL: [UnitKind; 9] = [
        Self::Tank,
        Self::Melee,
        Self::Ranged,
        Self::Giant,
        Self::Pekka,
        Self::Knight,
        Self::Valkyrie,
        Self::Archers,
        Self::DartGoblin,
    ];

    /// Stat table lookup.
    #[must_use]
    #[rustfmt::skip]
    pub const fn stats(self) -> UnitStats {
        use AttackEffect::{Area, Single};
        use TargetPolicy::{AnyOpposing, StructuresOnly};
        use UnitCategory::{Melee, Ranged, Tank};

        let generic = AnimationRows::GENERIC;
        let paired = AnimationRows {
            attack: [4, 2, 1, 3, 0],
            walk: [6, 9, 8, 5, 7],
        };

        match self {
            Self::Tank => UnitStats {
                max_health: 300, attack: 20, speed: 30, range: 60, interval_ms: 1500,
                aggro_radius: 180, cost: 4, category: Tank, policy: AnyOpposing,
                effect: Single, rows: generic,
            },
            Self::Melee => UnitStats {
                max_health: 150, attack: 15, speed: 60, range: 60, interval_ms: 1000,
                aggro_radius: 180, cost: 3, category: Melee, policy: AnyOpposing,
                effect: Single, rows: generic,
            },
            Self::Ranged => UnitStats {
                max_health: 60, attack: 10, speed: 70, range: 150, interval_ms: 1000,
                aggro_radius: 200, cost: 2, category: Ranged, policy: AnyOpposing,
                effect: Single, rows: generic,
            },
            Self::Giant => UnitStats {
                max_health: 600, attack: 30, speed: 25, range: 60, interval_ms: 1000,
                aggro_radius: 180, cost: 5, category: Tank, policy: StructuresOnly,
                effect: Single,
                rows: AnimationRows { attack: [1, 4, 3, 0, 2], walk: [9, 7, 6, 8, 5] },
            },
            Self::Pekka => UnitStats {
                max_health: 500, attack: 80, speed: 35, range: 60, interval_ms: 1800,
                aggro_radius: 180, cost: 7, category: Tank, policy: AnyOpposing,
                effect: Single, rows: paired,
            },
            Self::Knight => UnitStats {
                max_health: 200, attack: 20, speed: 50, range: 60, interval_ms: 1000,
                aggro_radius: 180, cost: 3, category: Melee, policy: AnyOpposing,
                effect: Single, rows: paired,
            },
            Self::Valkyrie => UnitStats {
                max_health: 250, attack: 18, speed: 55, range: 60, interval_ms: 1200,
                aggro_radius: 180, cost: 4, category: Melee, policy: AnyOpposing,
                effect: Area { radius: 50 },
                rows: AnimationRows { attack: [4, 2, 1, 3, 0], walk: [8, 6, 9, 5, 7] },
            },
            Self::Archers => UnitStats {
                max_health: 80, attack: 12, speed: 65, range: 150, interval_ms: 1000,
                aggro_radius: 200, cost: 3, category: Ranged, policy: AnyOpposing,
                effect: Single,
                rows: AnimationRows { attack: [4, 2, 1, 3, 0], walk: [9, 6, 8, 5, 7] },
            },
            Self::DartGoblin => UnitStats {
                max_health: 50, attack: 15, speed: 90, range: 200, interval_ms: 500,
                aggro_radius: 240, cost: 3, category: Ranged, policy: AnyOpposing,
                effect: Single, rows: paired,
            },
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tank => "Tank",
            Self::Melee => "Melee",
            Self::Ranged => "Ranged",
            Self::Giant => "Giant",
            Self::Pekka => "Pekka",
            Self::Knight => "Knight",
            Self::Valkyrie => "Valkyrie",
            Self::Archers => "Archers",
            Self::DartGoblin => "DartGoblin",
        }
    }

    /// Single-character map glyph.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Tank => 't',
            Self::Melee => 'm',
            Self::Ranged => 'r',
            Self::Giant => 'g',
            Self::Pekka => 'p',
            Self::Knight => 'k',
            Self::Valkyrie => 'v',
            Self::Archers => 'a',
            Self::DartGoblin => 'd',
        }
    }
}

impl FromStr for UnitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown unit kind '{s}'"))
    }
}

/// Tower tier. Losing the primary tier loses the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TowerTier {
    /// Minor lane tower.
    Princess,
    /// Primary tower.
    King,
}

impl TowerTier {
    /// True for the tier whose destruction ends the battle.
    #[must_use]
    pub const fn is_primary(self) -> bool {
        matches!(self, Self::King)
    }

    /// Fresh combat component and maximum health.
    #[must_use]
    pub fn combat(self) -> (CombatStats, u32) {
        let (health, attack, range, interval_ms) = match self {
            Self::Princess => (1400, 50, 250, 800),
            Self::King => (2400, 70, 280, 1000),
        };
        (
            CombatStats {
                attack,
                range: Fixed::from_num(range),
                interval: millis(interval_ms),
                cooldown: Fixed::ZERO,
                speed: Fixed::ZERO,
            },
            health,
        )
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Princess => "Princess",
            Self::King => "King",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::Side;
    use crate::math::Vec2Fixed;

    #[test]
    fn giant_only_accepts_structures() {
        let unit = Occupant {
            id: 1,
            side: Side::Blue,
            position: Vec2Fixed::ZERO,
            is_structure: false,
        };
        let tower = Occupant {
            is_structure: true,
            ..unit
        };
        let policy = UnitKind::Giant.stats().policy;
        assert!(!policy.accepts(&unit));
        assert!(policy.accepts(&tower));
        assert!(UnitKind::Knight.stats().policy.accepts(&unit));
    }

    #[test]
    fn tank_and_melee_match_reference_numbers() {
        let tank = UnitKind::Tank.stats().combat();
        assert_eq!(UnitKind::Tank.stats().max_health, 300);
        assert_eq!(tank.attack, 20);
        assert_eq!(tank.interval, Fixed::from_num(3) / Fixed::from_num(2));

        let melee = UnitKind::Melee.stats();
        assert_eq!((melee.max_health, melee.attack, melee.interval_ms), (150, 15, 1000));
    }

    #[test]
    fn valkyrie_has_area_effect() {
        assert_eq!(UnitKind::Valkyrie.stats().effect, AttackEffect::Area { radius: 50 });
    }

    #[test]
    fn animation_row_lookup() {
        let rows = UnitKind::Giant.stats().rows;
        assert_eq!(rows.row(UnitState::Attacking, SpriteDirection::Up), 1);
        assert_eq!(rows.row(UnitState::Marching, SpriteDirection::Down), 5);
        assert_eq!(rows.row(UnitState::Pursuing, SpriteDirection::Right), 6);
    }

    #[test]
    fn parse_kind_names() {
        assert_eq!("dartgoblin".parse::<UnitKind>(), Ok(UnitKind::DartGoblin));
        assert_eq!("Knight".parse::<UnitKind>(), Ok(UnitKind::Knight));
        assert!("wizard".parse::<UnitKind>().is_err());
    }

    #[test]
    fn towers() {
        assert!(TowerTier::King.is_primary());
        assert!(!TowerTier::Princess.is_primary());
        let (stats, hp) = TowerTier::Princess.combat();
        assert_eq!(hp, 1400);
        assert_eq!(stats.speed, Fixed::ZERO);
    }
}
