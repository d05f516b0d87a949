//! Batch match runner for balance testing.
//!
//! Fast-forwards one scenario across many opponent seeds in parallel using
//! rayon and aggregates the resulting summaries.

use crate::metrics::{BatchSummary, MatchSummary};
use crate::runner::fast_forward;
use crate::scenario::Scenario;
use lane_core::factions::Side;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario to run; its own seed is replaced per game
    pub scenario: Scenario,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Starting seed for deterministic runs
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: Scenario::skirmish(),
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: Scenario, game_count: u32) -> Self {
        Self {
            scenario,
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Seed used for game `index`.
    #[must_use]
    pub fn seed_for(&self, index: u32) -> u64 {
        self.seed_start.wrapping_add(u64::from(index))
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual match summaries, in seed order
    pub games: Vec<MatchSummary>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Live counters shared by the rayon workers.
#[derive(Debug)]
pub struct BatchProgress {
    total: u32,
    completed: AtomicU32,
    red_wins: AtomicU32,
    blue_wins: AtomicU32,
    started: Instant,
}

impl BatchProgress {
    /// Tracker for `total` games.
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            red_wins: AtomicU32::new(0),
            blue_wins: AtomicU32::new(0),
            started: Instant::now(),
        }
    }

    /// Count a finished game; returns how many have finished so far.
    pub fn finish(&self, winner: Option<Side>) -> u32 {
        match winner {
            Some(Side::Red) => self.red_wins.fetch_add(1, Ordering::Relaxed),
            Some(Side::Blue) => self.blue_wins.fetch_add(1, Ordering::Relaxed),
            None => 0,
        };
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Finished games.
    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Share of finished games won by `side`.
    pub fn win_rate(&self, side: Side) -> f64 {
        let wins = match side {
            Side::Red => &self.red_wins,
            Side::Blue => &self.blue_wins,
        };
        f64::from(wins.load(Ordering::Relaxed)) / f64::from(self.completed().max(1))
    }

    /// Remaining wall time at the current pace.
    pub fn eta(&self) -> Duration {
        let done = self.completed();
        if done == 0 {
            return Duration::ZERO;
        }
        self.started.elapsed() / done * self.total.saturating_sub(done)
    }

    fn log(&self) {
        info!(
            completed = self.completed(),
            total = self.total,
            red = format_args!("{:.1}%", self.win_rate(Side::Red) * 100.0),
            blue = format_args!("{:.1}%", self.win_rate(Side::Blue) * 100.0),
            eta_secs = self.eta().as_secs(),
            "batch progress"
        );
    }
}

/// Fast-forward every seed of the batch and aggregate the summaries.
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let progress = BatchProgress::new(config.game_count);
    info!(games = config.game_count, scenario = %config.scenario.name, "starting batch");

    // A global pool can only be installed once per process.
    if config.parallel_games > 0 {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
        {
            debug!("keeping existing thread pool: {e}");
        }
    }

    let outcomes: Vec<(u32, Result<MatchSummary, String>)> = (0..config.game_count)
        .into_par_iter()
        .map(|index| {
            let seed = config.seed_for(index);
            let scenario = config.scenario.clone().with_seed(seed);
            let outcome = fast_forward(&scenario, &format!("game_{seed}"))
                .map(|result| result.summary)
                .map_err(|e| e.to_string());

            let winner = outcome.as_ref().ok().and_then(|summary| summary.winner);
            if progress.finish(winner) % 100 == 0 {
                progress.log();
            }
            (index, outcome)
        })
        .collect();

    let mut games = Vec::with_capacity(outcomes.len());
    let mut errors = Vec::new();
    for (game_index, outcome) in outcomes {
        match outcome {
            Ok(summary) => games.push(summary),
            Err(message) => {
                let seed = config.seed_for(game_index);
                warn!(game_index, seed, %message, "game failed");
                errors.push(BatchError {
                    game_index,
                    seed,
                    message,
                });
            }
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        games = games.len(),
        secs = format_args!("{duration_seconds:.1}"),
        "batch complete"
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Verify determinism by running the same seed multiple times and comparing
/// final state hashes.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> bool {
    let scenario = scenario.clone().with_seed(seed);
    let hashes: Vec<Option<u64>> = (0..runs)
        .into_par_iter()
        .map(|run| {
            fast_forward(&scenario, &format!("determinism_{run}"))
                .map(|result| result.summary.final_state_hash)
                .ok()
        })
        .collect();

    match hashes.first() {
        Some(Some(first)) => hashes.iter().all(|h| *h == Some(*first)),
        _ => false,
    }
}
