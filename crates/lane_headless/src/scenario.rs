//! Scenario loading and configuration.
//!
//! A scenario fixes everything a headless match needs: the opponent preset,
//! the seed, a time limit, optional tunable overrides and a script of
//! timed placements for the Blue side.

use std::path::Path;

use lane_core::config::{BattleConfig, Difficulty};
use lane_core::error::BattleError;
use lane_core::factions::Side;
use lane_core::map::Arena;
use lane_core::simulation::{Battle, BattleSetup, Placement};
use lane_core::unit_kind::UnitKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario's tunables or arena were rejected by the core.
    #[error("Invalid scenario: {0}")]
    Battle(#[from] BattleError),
}

fn default_side() -> Side {
    Side::Blue
}

/// A placement issued at a fixed battle time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedPlacement {
    /// Battle time in milliseconds at which the placement is issued.
    pub at_ms: u32,
    /// Unit to deploy.
    pub kind: UnitKind,
    /// World x in whole pixels.
    pub x: i32,
    /// World y in whole pixels.
    pub y: i32,
    /// Issuing side.
    #[serde(default = "default_side")]
    pub side: Side,
}

impl ScriptedPlacement {
    /// Create a Blue placement.
    #[must_use]
    pub const fn blue(at_ms: u32, kind: UnitKind, x: i32, y: i32) -> Self {
        Self {
            at_ms,
            kind,
            x,
            y,
            side: Side::Blue,
        }
    }

    /// First tick on or after `at_ms`.
    #[must_use]
    pub fn due_tick(&self, tick_rate: u32) -> u64 {
        (u64::from(self.at_ms) * u64::from(tick_rate)).div_ceil(1000)
    }

    /// The command handed to the battle.
    #[must_use]
    pub const fn placement(&self) -> Placement {
        Placement {
            kind: self.kind,
            x: self.x,
            y: self.y,
            side: self.side,
        }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Opponent preset. Overrides the difficulty in `config`.
    pub difficulty: Difficulty,
    /// Seed for the opponent.
    pub seed: u64,
    /// Battle time after which an undecided match stops.
    pub time_limit_secs: u32,
    /// Tunable overrides; defaults when absent.
    pub config: Option<BattleConfig>,
    /// Let the opponent drive Red.
    pub opponent: bool,
    /// Timed placements, in any order.
    pub placements: Vec<ScriptedPlacement>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::skirmish()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.battle_config().validate()?;
        Ok(scenario)
    }

    /// The built-in match: a Knight and Archers on the left lane, a Giant
    /// push on the right, against a normal opponent for three minutes.
    #[must_use]
    pub fn skirmish() -> Self {
        Self {
            name: "Standard Skirmish".to_string(),
            description: "Scripted two-lane push against the reactive opponent".to_string(),
            difficulty: Difficulty::Normal,
            seed: 0,
            time_limit_secs: 180,
            config: None,
            opponent: true,
            placements: vec![
                ScriptedPlacement::blue(500, UnitKind::Knight, 140, 500),
                ScriptedPlacement::blue(9_000, UnitKind::Archers, 180, 560),
                ScriptedPlacement::blue(20_000, UnitKind::Giant, 460, 460),
                ScriptedPlacement::blue(26_000, UnitKind::Valkyrie, 460, 540),
                ScriptedPlacement::blue(40_000, UnitKind::Pekka, 140, 460),
                ScriptedPlacement::blue(60_000, UnitKind::DartGoblin, 300, 600),
            ],
        }
    }

    /// Same scenario with another seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Tunables with the scenario's difficulty applied.
    #[must_use]
    pub fn battle_config(&self) -> BattleConfig {
        BattleConfig {
            difficulty: self.difficulty,
            ..self.config.clone().unwrap_or_default()
        }
    }

    /// Construction options for the battle.
    #[must_use]
    pub const fn setup(&self) -> BattleSetup {
        BattleSetup {
            seed: self.seed,
            spawn_towers: true,
            opponent: self.opponent,
        }
    }

    /// Tick count at which the match is stopped if still undecided.
    #[must_use]
    pub fn time_limit_ticks(&self) -> u64 {
        u64::from(self.time_limit_secs) * u64::from(self.battle_config().tick_rate)
    }

    /// Build the standard arena battle this scenario describes.
    pub fn build_battle(&self) -> Result<Battle, ScenarioError> {
        Ok(Battle::new(Arena::standard()?, self.battle_config(), self.setup())?)
    }

    /// Placement script ordered for playback.
    #[must_use]
    pub fn script(&self) -> Script {
        Script::new(&self.placements, self.battle_config().tick_rate)
    }
}

/// Scripted placements in due order, consumed as the battle advances.
#[derive(Debug, Clone)]
pub struct Script {
    pending: Vec<(u64, Placement)>,
    cursor: usize,
}

impl Script {
    /// Order `placements` by due tick, keeping file order for ties.
    #[must_use]
    pub fn new(placements: &[ScriptedPlacement], tick_rate: u32) -> Self {
        let mut pending: Vec<(u64, Placement)> = placements
            .iter()
            .map(|p| (p.due_tick(tick_rate), p.placement()))
            .collect();
        pending.sort_by_key(|(tick, _)| *tick);
        Self { pending, cursor: 0 }
    }

    /// Placements due at or before `tick` that have not been taken yet.
    pub fn take_due(&mut self, tick: u64) -> Vec<Placement> {
        let start = self.cursor;
        while self.pending.get(self.cursor).is_some_and(|(due, _)| *due <= tick) {
            self.cursor += 1;
        }
        self.pending[start..self.cursor].iter().map(|(_, p)| *p).collect()
    }

    /// Placements not yet taken.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len() - self.cursor
    }
}
