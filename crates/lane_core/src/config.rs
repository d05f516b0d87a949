//! Battle tunables, loadable from RON.
//!
//! Every value is an integer (pixels, milliseconds, per-mille) so a config
//! file converts to identical fixed-point values on every machine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::math::{millis, per_mille, Fixed};

/// Opponent difficulty preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// Slow income and reactions.
    Easy,
    /// Default.
    #[default]
    Normal,
    /// Fast income and reactions.
    Hard,
}

impl Difficulty {
    /// Opponent resource regeneration in thousandths per second.
    #[must_use]
    pub const fn regen_milli(self) -> u32 {
        match self {
            Self::Easy => 300,
            Self::Normal => 360,
            Self::Hard => 500,
        }
    }

    /// Milliseconds between opponent decisions.
    #[must_use]
    pub const fn reaction_interval_ms(self) -> u32 {
        match self {
            Self::Easy => 2500,
            Self::Normal => 1500,
            Self::Hard => 800,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Normal => "normal",
            Self::Hard => "hard",
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "normal" => Ok(Self::Normal),
            "hard" => Ok(Self::Hard),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// Numeric battle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Engaged targets are kept while within this percentage of aggro radius.
    pub aggro_slack_percent: u32,
    /// Minimum milliseconds between path recomputations.
    pub repath_interval_ms: u32,
    /// Distance at which a waypoint counts as reached.
    pub arrival_threshold: u32,
    /// Projectile speed in pixels per second.
    pub projectile_speed: u32,
    /// Distance at which a projectile hits.
    pub projectile_hit_threshold: u32,
    /// Vertical offset from a tower's centre to its muzzle.
    pub muzzle_offset: u32,
    /// Resource cap for both sides.
    pub resource_max: u32,
    /// Starting resources for both sides.
    pub resource_start: u32,
    /// Player (Blue) regeneration in thousandths per second.
    pub player_regen_milli: u32,
    /// Opponent preset; also sets Red's regeneration.
    pub difficulty: Difficulty,
    /// Percentage of the cap at which an idle opponent spends.
    pub overflow_percent: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            aggro_slack_percent: 150,
            repath_interval_ms: 500,
            arrival_threshold: 5,
            projectile_speed: 300,
            projectile_hit_threshold: 10,
            muzzle_offset: 30,
            resource_max: 10,
            resource_start: 5,
            player_regen_milli: 357,
            difficulty: Difficulty::Normal,
            overflow_percent: 90,
        }
    }
}

impl BattleConfig {
    /// Seconds per tick.
    #[must_use]
    pub fn dt(&self) -> Fixed {
        Fixed::ONE / Fixed::from_num(self.tick_rate.max(1))
    }

    /// Minimum time between path recomputations, in seconds.
    #[must_use]
    pub fn repath_interval(&self) -> Fixed {
        millis(self.repath_interval_ms)
    }

    /// Leash multiplier applied to aggro radius.
    #[must_use]
    pub fn aggro_slack(&self) -> Fixed {
        per_mille(self.aggro_slack_percent * 10)
    }

    /// Regeneration per second for the player side.
    #[must_use]
    pub fn player_regen(&self) -> Fixed {
        per_mille(self.player_regen_milli)
    }

    /// Regeneration per second for the opponent side.
    #[must_use]
    pub fn opponent_regen(&self) -> Fixed {
        per_mille(self.difficulty.regen_milli())
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            problems.push(format!("tick_rate must be in 1..=1000, got {}", self.tick_rate));
        }
        if self.aggro_slack_percent < 100 {
            problems.push(format!(
                "aggro_slack_percent must be at least 100, got {}",
                self.aggro_slack_percent
            ));
        }
        if self.resource_max == 0 {
            problems.push("resource_max must be positive".to_string());
        }
        if self.projectile_speed == 0 {
            problems.push("projectile_speed must be positive".to_string());
        }
        if self.overflow_percent > 100 {
            problems.push(format!(
                "overflow_percent must be at most 100, got {}",
                self.overflow_percent
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(BattleError::InvalidConfig(problems.join("; ")))
        }
    }

    /// Parse and validate a RON document. Missing fields take defaults.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BattleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.aggro_slack(), Fixed::from_num(3) / Fixed::from_num(2));
        assert_eq!(config.repath_interval(), Fixed::ONE / Fixed::from_num(2));
    }

    #[test]
    fn partial_ron_fills_defaults() {
        let config = BattleConfig::from_ron_str("(tick_rate: 30, difficulty: Hard)").unwrap();
        assert_eq!(config.tick_rate, 30);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.resource_max, 10);
        assert_eq!(config.opponent_regen(), Fixed::ONE / Fixed::from_num(2));
    }

    #[test]
    fn invalid_values_are_reported_together() {
        let err = BattleConfig::from_ron_str("(tick_rate: 0, resource_max: 0)").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("tick_rate"));
        assert!(message.contains("resource_max"));
    }

    #[test]
    fn malformed_ron_is_a_parse_error() {
        assert!(matches!(
            BattleConfig::from_ron_str("(tick_rate: \"fast\")"),
            Err(BattleError::ConfigParse(_))
        ));
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("HARD".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("brutal".parse::<Difficulty>().is_err());
    }
}
