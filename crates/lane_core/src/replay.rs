//! Recording and playing back battles.
//!
//! A battle is fully determined by its arena, tunables, setup (including the
//! opponent seed) and the placement commands applied between ticks. A
//! replay stores exactly those, plus the final tick and state hash so
//! playback can be verified.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::BattleConfig;
use crate::error::{BattleError, Result};
use crate::map::Arena;
use crate::simulation::{Battle, BattleSetup, Placement};

/// A placement applied just before the given tick ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCommand {
    /// Value of [`Battle::current_tick`] when the placement was applied.
    pub tick: u64,
    /// The placement.
    pub placement: Placement,
}

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Terrain and landmarks.
    pub arena: Arena,
    /// Tunables.
    pub config: BattleConfig,
    /// Seed and spawn options.
    pub setup: BattleSetup,
    /// Placements in application order.
    pub commands: Vec<ReplayCommand>,
    /// Tick count when recording stopped.
    pub final_tick: u64,
    /// State hash when recording stopped.
    pub final_hash: u64,
}

impl Replay {
    /// Start an empty recording for a battle about to be built from these
    /// inputs.
    pub fn new(
        scenario_id: impl Into<String>,
        arena: Arena,
        config: BattleConfig,
        setup: BattleSetup,
    ) -> Self {
        Self {
            version: REPLAY_VERSION,
            scenario_id: scenario_id.into(),
            arena,
            config,
            setup,
            commands: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Start a recording that matches an existing, untouched battle.
    pub fn for_battle(scenario_id: impl Into<String>, battle: &Battle, setup: BattleSetup) -> Self {
        Self::new(scenario_id, battle.arena().clone(), battle.config().clone(), setup)
    }

    /// Record a placement applied at `tick`.
    pub fn record(&mut self, tick: u64, placement: Placement) {
        self.commands.push(ReplayCommand { tick, placement });
    }

    /// Finalize the replay with end-of-battle state.
    pub fn finalize(&mut self, battle: &Battle) {
        self.final_tick = battle.current_tick();
        self.final_hash = battle.state_hash();
    }

    /// Build a fresh battle from the recorded inputs.
    pub fn build_battle(&self) -> Result<Battle> {
        Battle::new(self.arena.clone(), self.config.clone(), self.setup)
    }

    /// Encode as bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| BattleError::Replay(format!("Failed to serialize replay: {e}")))
    }

    /// Decode from bincode, checking the format version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| BattleError::Replay(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(BattleError::Replay(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }
        Ok(replay)
    }

    /// Save the replay to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_bytes()?)?;
        Ok(())
    }

    /// Load a replay from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes)
    }

    /// Commands recorded for a specific tick.
    pub fn commands_at_tick(&self, tick: u64) -> impl Iterator<Item = &ReplayCommand> + '_ {
        self.commands.iter().filter(move |cmd| cmd.tick == tick)
    }

    /// Get the total duration of the replay in ticks.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_tick
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    battle: Battle,
    command_index: usize,
}

impl ReplayPlayer {
    /// Create a player positioned at tick zero.
    pub fn new(replay: Replay) -> Result<Self> {
        let battle = replay.build_battle()?;
        Ok(Self {
            replay,
            battle,
            command_index: 0,
        })
    }

    fn apply_due_commands(&mut self) {
        let now = self.battle.current_tick();
        while let Some(cmd) = self.replay.commands.get(self.command_index) {
            if cmd.tick > now {
                break;
            }
            if let Err(err) = self.battle.apply_placement(&cmd.placement) {
                // A recording only holds accepted placements, so this means
                // the replay and the engine have diverged.
                warn!(tick = cmd.tick, %err, "recorded placement rejected during playback");
            }
            self.command_index += 1;
        }
    }

    /// Apply the commands due now and run one tick.
    ///
    /// Returns true while there are more ticks to play.
    pub fn advance(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.apply_due_commands();
        self.battle.tick();
        !self.is_finished()
    }

    /// Restart from tick zero and play forward to `target_tick`.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        self.battle = self.replay.build_battle()?;
        self.command_index = 0;
        let target = target_tick.min(self.replay.final_tick);
        while self.battle.current_tick() < target {
            self.apply_due_commands();
            self.battle.tick();
        }
        debug!(tick = self.battle.current_tick(), "replay seek complete");
        Ok(())
    }

    /// Get the current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.battle.current_tick()
    }

    /// Battle state at the current tick.
    #[must_use]
    pub const fn battle(&self) -> &Battle {
        &self.battle
    }

    /// Get the replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Check if the replay has finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.battle.current_tick() >= self.replay.final_tick
    }

    /// Play the whole replay from the start and compare the final hash.
    pub fn verify(&mut self) -> Result<bool> {
        self.seek(self.replay.final_tick)?;
        let actual = self.battle.state_hash();
        if actual != self.replay.final_hash {
            warn!(expected = self.replay.final_hash, actual, "replay hash mismatch");
        }
        Ok(actual == self.replay.final_hash)
    }

    /// Progress as a percentage (0-100).
    #[must_use]
    pub fn progress_percent(&self) -> u32 {
        if self.replay.final_tick == 0 {
            return 100;
        }
        let pct = self.battle.current_tick().saturating_mul(100) / self.replay.final_tick;
        u32::try_from(pct.min(100)).unwrap_or(100)
    }
}
