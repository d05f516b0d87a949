//! Component definitions.
//!
//! Components are plain data; the behaviour that reads and writes them
//! lives in [`crate::behavior`], [`crate::tower`] and [`crate::projectile`].

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Unique identifier for entities. Assigned monotonically, never reused.
pub type EntityId = u64;

/// Health component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if entity is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply damage, returning actual damage dealt.
    /// Uses saturating subtraction so health never drops below zero.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let actual = amount.min(self.current);
        self.current -= actual;
        actual
    }

    /// Get health as a percentage (0-100).
    #[must_use]
    pub fn percentage(&self) -> u32 {
        if self.max == 0 {
            0
        } else {
            let pct = u64::from(self.current) * 100 / u64::from(self.max);
            pct as u32
        }
    }
}

/// Attack and movement numbers shared by units and towers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatStats {
    /// Damage per hit.
    pub attack: u32,
    /// Attack reach in world units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Seconds between attacks.
    #[serde(with = "fixed_serde")]
    pub interval: Fixed,
    /// Seconds until the next attack is allowed.
    #[serde(with = "fixed_serde")]
    pub cooldown: Fixed,
    /// Movement speed in world units per second; zero for towers.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
}

impl CombatStats {
    /// Count the cooldown down by one step.
    pub fn tick_cooldown(&mut self, dt: Fixed) {
        if self.cooldown > Fixed::ZERO {
            self.cooldown -= dt;
        }
    }

    /// True when an attack may fire this tick.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.cooldown <= Fixed::ZERO
    }

    /// Restart the cooldown after an attack.
    pub fn reset_cooldown(&mut self) {
        self.cooldown = self.interval;
    }

    /// True if `dist_sq` is within attack range.
    #[must_use]
    pub fn in_range_sq(&self, dist_sq: Fixed) -> bool {
        dist_sq <= self.range * self.range
    }
}

/// One of the five drawn directions; left-facing sprites reuse the
/// right-facing rows with a horizontal flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpriteDirection {
    /// Facing up the screen.
    Up,
    /// Diagonal up.
    UpRight,
    /// Horizontal.
    Right,
    /// Diagonal down.
    DownRight,
    /// Facing down the screen.
    Down,
}

impl SpriteDirection {
    /// Position in per-kind animation row tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Up => 0,
            Self::UpRight => 1,
            Self::Right => 2,
            Self::DownRight => 3,
            Self::Down => 4,
        }
    }
}

/// tan(22.5°) and tan(67.5°) as raw I32F32 bits.
const TAN_22_5: Fixed = Fixed::from_bits(0x6A09_E667);
const TAN_67_5: Fixed = Fixed::from_bits(0x2_6A09_E667);

/// Last non-zero direction the entity moved or attacked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Facing {
    /// Unit-length heading.
    pub dir: Vec2Fixed,
}

impl Default for Facing {
    fn default() -> Self {
        Self {
            dir: Vec2Fixed::new(Fixed::ZERO, Fixed::ONE),
        }
    }
}

impl Facing {
    /// Turn toward `delta`. A zero delta keeps the previous heading.
    pub fn face(&mut self, delta: Vec2Fixed) {
        if !delta.is_zero() {
            let dir = delta.normalize();
            if !dir.is_zero() {
                self.dir = dir;
            }
        }
    }

    /// Sprite direction and horizontal flip for the current heading, using
    /// 45° sectors centred on each direction.
    #[must_use]
    pub fn sprite_direction(&self) -> (SpriteDirection, bool) {
        let Vec2Fixed { x, y } = self.dir;
        let (ax, ay) = (x.abs(), y.abs());
        let flipped = x < Fixed::ZERO;

        if ay < ax * TAN_22_5 {
            (SpriteDirection::Right, flipped)
        } else if ay >= ax * TAN_67_5 {
            if y < Fixed::ZERO {
                (SpriteDirection::Up, false)
            } else {
                (SpriteDirection::Down, false)
            }
        } else if y < Fixed::ZERO {
            (SpriteDirection::UpRight, flipped)
        } else {
            (SpriteDirection::DownRight, flipped)
        }
    }
}

/// Per-tick mode of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UnitState {
    /// No engaged target; walking toward the strategic target.
    #[default]
    Marching,
    /// Engaged target out of reach; closing in.
    Pursuing,
    /// Engaged target in reach.
    Attacking,
}

impl UnitState {
    /// Short label for displays.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Marching => "march",
            Self::Pursuing => "pursue",
            Self::Attacking => "attack",
        }
    }
}

/// Long-term destination of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategicTarget {
    /// An enemy structure, revalidated every tick.
    Structure(EntityId),
    /// A fixed world point.
    Point(Vec2Fixed),
}
