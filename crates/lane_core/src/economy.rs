//! Deployment resources.
//!
//! Each side holds a pool that regenerates continuously at a fixed rate up
//! to a cap. Placing a unit spends from it; a placement the pool cannot
//! cover is rejected without touching the balance.

use serde::{Deserialize, Serialize};

use crate::error::PlacementError;
use crate::factions::Side;
use crate::math::{fixed_serde, Fixed};

/// Whole-unit view of a pool, as shown on a resource bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceReadout {
    /// Balance rounded down.
    pub current: u32,
    /// Cap.
    pub max: u32,
}

/// A regenerating resource pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePool {
    #[serde(with = "fixed_serde")]
    current: Fixed,
    max: u32,
    /// Regeneration per second.
    #[serde(with = "fixed_serde")]
    rate: Fixed,
}

impl ResourcePool {
    /// Create a pool holding `start` (clamped to `max`).
    #[must_use]
    pub fn new(start: u32, max: u32, rate: Fixed) -> Self {
        Self {
            current: Fixed::from_num(start.min(max)),
            max,
            rate,
        }
    }

    /// Regenerate for `dt` seconds, saturating at the cap.
    pub fn accrue(&mut self, dt: Fixed) {
        let cap = Fixed::from_num(self.max);
        self.current = (self.current + self.rate * dt).min(cap);
    }

    /// Spend `cost` if the balance covers it.
    pub fn try_spend(&mut self, cost: u32) -> Result<(), PlacementError> {
        let price = Fixed::from_num(cost);
        if self.current < price {
            return Err(PlacementError::InsufficientResources {
                required: cost,
                available: self.readout().current,
            });
        }
        self.current -= price;
        Ok(())
    }

    /// True if the balance covers `cost`.
    #[must_use]
    pub fn can_afford(&self, cost: u32) -> bool {
        self.current >= Fixed::from_num(cost)
    }

    /// Exact balance.
    #[must_use]
    pub const fn current(&self) -> Fixed {
        self.current
    }

    /// Cap.
    #[must_use]
    pub const fn max(&self) -> u32 {
        self.max
    }

    /// Regeneration per second.
    #[must_use]
    pub const fn rate(&self) -> Fixed {
        self.rate
    }

    /// True once the balance is at or above `percent` of the cap.
    #[must_use]
    pub fn at_least_percent(&self, percent: u32) -> bool {
        self.current * Fixed::from_num(100) >= Fixed::from_num(self.max) * Fixed::from_num(percent)
    }

    /// Whole-unit readout.
    #[must_use]
    pub fn readout(&self) -> ResourceReadout {
        ResourceReadout {
            current: self.current.floor().to_num::<u32>(),
            max: self.max,
        }
    }
}

/// Resource pools for both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Economy {
    red: ResourcePool,
    blue: ResourcePool,
}

impl Economy {
    /// Create from the two pools.
    #[must_use]
    pub const fn new(red: ResourcePool, blue: ResourcePool) -> Self {
        Self { red, blue }
    }

    /// Pool for a side.
    #[must_use]
    pub const fn pool(&self, side: Side) -> &ResourcePool {
        match side {
            Side::Red => &self.red,
            Side::Blue => &self.blue,
        }
    }

    /// Mutable pool for a side.
    pub fn pool_mut(&mut self, side: Side) -> &mut ResourcePool {
        match side {
            Side::Red => &mut self.red,
            Side::Blue => &mut self.blue,
        }
    }

    /// Regenerate both pools.
    pub fn accrue(&mut self, dt: Fixed) {
        self.red.accrue(dt);
        self.blue.accrue(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(start: u32) -> ResourcePool {
        ResourcePool::new(start, 10, Fixed::ONE / Fixed::from_num(2))
    }

    #[test]
    fn accrues_and_caps() {
        let mut p = pool(9);
        p.accrue(Fixed::ONE);
        assert_eq!(p.readout().current, 9);
        p.accrue(Fixed::ONE);
        assert_eq!(p.current(), Fixed::from_num(10));
        p.accrue(Fixed::from_num(100));
        assert_eq!(p.current(), Fixed::from_num(10));
    }

    #[test]
    fn spend_rejects_without_side_effects() {
        let mut p = pool(3);
        assert_eq!(
            p.try_spend(4),
            Err(PlacementError::InsufficientResources {
                required: 4,
                available: 3
            })
        );
        assert_eq!(p.current(), Fixed::from_num(3));
        assert!(p.try_spend(3).is_ok());
        assert_eq!(p.current(), Fixed::ZERO);
    }

    #[test]
    fn readout_floors_fractional_balance() {
        let mut p = pool(2);
        p.accrue(Fixed::from_num(1.9));
        assert_eq!(p.readout(), ResourceReadout { current: 2, max: 10 });
        assert!(!p.can_afford(3));
    }

    #[test]
    fn start_is_clamped_to_max() {
        assert_eq!(ResourcePool::new(50, 10, Fixed::ZERO).readout().current, 10);
    }

    #[test]
    fn overflow_threshold() {
        assert!(!pool(8).at_least_percent(90));
        assert!(pool(9).at_least_percent(90));
        assert!(pool(10).at_least_percent(90));
    }
}
