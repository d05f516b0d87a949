//! Match runners.
//!
//! [`run_realtime`] plays a scenario the way a client would: the battle
//! ticks on its own simulation thread while a `lane-present` thread applies
//! scripted placements and draws frames. [`fast_forward`] runs the same
//! scenario on the calling thread without sleeping, for batches and tests.

use std::io::{self, Write};
use std::thread;
use std::time::{Duration, Instant};

use lane_core::error::BattleError;
use lane_core::map::Arena;
use lane_core::replay::Replay;
use lane_core::runtime::{lock_battle, share, SimulationThread, StopReason, ThreadOptions};
use lane_core::simulation::Battle;
use lane_core::snapshot::Frame;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ascii_visualizer::{render_frame, AsciiConfig};
use crate::metrics::{EndCondition, MatchSummary, MetricsCollector};
use crate::scenario::{Scenario, ScenarioError, Script};

/// Error type for match runs.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Scenario could not be turned into a battle.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// Core failure (thread spawn, replay encoding).
    #[error(transparent)]
    Battle(#[from] BattleError),
    /// Presentation output failed.
    #[error("Presentation failed: {0}")]
    Io(#[from] io::Error),
    /// The presentation thread could not be started or panicked.
    #[error("Presentation thread: {0}")]
    Thread(String),
}

/// Result alias for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

/// Realtime run options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Identifier written into the summary.
    pub game_id: String,
    /// Presentation passes per second.
    pub frame_rate: u32,
    /// Multiplier on the scenario tick rate for the simulation thread.
    pub speed: f64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            game_id: "match".to_string(),
            frame_rate: 10,
            speed: 1.0,
        }
    }
}

impl RunOptions {
    fn thread_tick_rate(&self, tick_rate: u32) -> u32 {
        let scaled = (f64::from(tick_rate) * self.speed).round();
        if scaled.is_finite() && scaled >= 1.0 {
            scaled.min(f64::from(u32::MAX)) as u32
        } else {
            1
        }
    }
}

/// Draws frames captured by the presentation thread.
///
/// `present` runs after the battle lock has been released.
pub trait Presenter: Send {
    /// Draw one frame.
    fn present(&mut self, frame: &Frame, arena: &Arena) -> io::Result<()>;
}

/// Writes each frame as ASCII art.
pub struct AsciiPresenter<W> {
    out: W,
    config: AsciiConfig,
    clear: bool,
}

impl<W: Write + Send> AsciiPresenter<W> {
    /// Presenter writing to `out`. With `clear`, each frame starts by
    /// clearing the terminal.
    pub fn new(out: W, config: AsciiConfig, clear: bool) -> Self {
        Self { out, config, clear }
    }
}

impl<W: Write + Send> Presenter for AsciiPresenter<W> {
    fn present(&mut self, frame: &Frame, arena: &Arena) -> io::Result<()> {
        if self.clear {
            write!(self.out, "\x1b[2J\x1b[H")?;
        }
        write!(self.out, "{}", render_frame(frame, arena, &self.config))?;
        self.out.flush()
    }
}

/// Discards frames, keeping only a count and the last tick seen.
#[derive(Debug, Default)]
pub struct NullPresenter {
    /// Frames presented.
    pub frames: u64,
    /// Tick of the latest frame.
    pub last_tick: u64,
}

impl Presenter for NullPresenter {
    fn present(&mut self, frame: &Frame, _arena: &Arena) -> io::Result<()> {
        self.frames += 1;
        self.last_tick = frame.tick;
        Ok(())
    }
}

/// Summary and recording of one match.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Match metrics.
    pub summary: MatchSummary,
    /// Every accepted placement, replayable to the same final hash.
    pub replay: Replay,
}

/// Apply scripted placements that are due at the battle's current tick.
fn apply_due(battle: &mut Battle, script: &mut Script, replay: &mut Replay, metrics: &mut MetricsCollector) {
    let tick = battle.current_tick();
    for placement in script.take_due(tick) {
        match battle.apply_placement(&placement) {
            Ok(id) => {
                debug!(tick, id, kind = placement.kind.name(), side = %placement.side, "scripted placement");
                replay.record(tick, placement);
                metrics.on_placement(placement.side, placement.kind);
            }
            Err(err) => {
                warn!(tick, kind = placement.kind.name(), x = placement.x, y = placement.y, %err, "scripted placement rejected");
                metrics.on_rejected();
            }
        }
    }
}

const fn end_condition(reason: StopReason) -> EndCondition {
    match reason {
        StopReason::BattleOver => EndCondition::KingDestroyed,
        StopReason::TickLimit => EndCondition::TimeLimit,
        StopReason::Requested => EndCondition::Stopped,
    }
}

/// Run a scenario on the calling thread as fast as possible.
pub fn fast_forward(scenario: &Scenario, game_id: &str) -> Result<MatchResult> {
    let mut battle = scenario.build_battle()?;
    let mut replay = Replay::for_battle(scenario.name.clone(), &battle, scenario.setup());
    let mut script = scenario.script();
    let mut metrics = MetricsCollector::new(game_id, &scenario.name, scenario.seed);
    let limit = scenario.time_limit_ticks();

    while !battle.is_over() && battle.current_tick() < limit {
        apply_due(&mut battle, &mut script, &mut replay, &mut metrics);
        metrics.track(&battle);
        let events = battle.tick();
        metrics.record(&battle, &events);
    }

    let end = if battle.is_over() {
        EndCondition::KingDestroyed
    } else {
        EndCondition::TimeLimit
    };
    replay.finalize(&battle);
    let summary = metrics.finalize(&battle, end);
    debug!(game_id, winner = ?summary.winner, ticks = summary.duration_ticks, "fast-forward finished");
    Ok(MatchResult { summary, replay })
}

/// Play a scenario with a simulation thread and a presentation thread.
///
/// Returns once the battle is decided or the time limit is reached. Per-tick
/// events are not observed, so the summary carries end-state fields only.
pub fn run_realtime(scenario: &Scenario, options: &RunOptions, presenter: &mut dyn Presenter) -> Result<MatchResult> {
    let mut battle = scenario.build_battle()?;
    let arena = battle.arena().clone();
    let mut replay = Replay::for_battle(scenario.name.clone(), &battle, scenario.setup());
    let mut script = scenario.script();
    let mut metrics = MetricsCollector::new(&options.game_id, &scenario.name, scenario.seed);

    // Placements at time zero land before the first tick.
    apply_due(&mut battle, &mut script, &mut replay, &mut metrics);

    let tick_rate = scenario.battle_config().tick_rate;
    let thread_options = ThreadOptions {
        tick_rate: options.thread_tick_rate(tick_rate),
        max_ticks: Some(scenario.time_limit_ticks()),
        stop_when_over: true,
    };
    info!(
        scenario = %scenario.name,
        seed = scenario.seed,
        tick_rate = thread_options.tick_rate,
        "starting realtime match"
    );

    let shared = share(battle);
    let sim = SimulationThread::spawn(shared.clone(), thread_options)?;
    let pass_budget = Duration::from_secs(1) / options.frame_rate.max(1);

    let presented: Result<()> = thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name("lane-present".into())
            .spawn_scoped(scope, || -> Result<()> {
                loop {
                    let finished = sim.is_finished();
                    let pass_start = Instant::now();
                    let frame = {
                        let mut battle = lock_battle(&shared);
                        apply_due(&mut battle, &mut script, &mut replay, &mut metrics);
                        battle.frame()
                    };
                    presenter.present(&frame, &arena)?;

                    // The pass after the simulation stops draws the final state.
                    if finished {
                        return Ok(());
                    }
                    if let Some(remaining) = pass_budget.checked_sub(pass_start.elapsed()) {
                        thread::sleep(remaining);
                    }
                }
            })
            .map_err(|e| RunnerError::Thread(e.to_string()))?;
        handle
            .join()
            .map_err(|_| RunnerError::Thread("presentation thread panicked".into()))?
    });

    let report = match presented {
        Ok(()) => sim.join()?,
        Err(err) => {
            sim.shutdown()?;
            return Err(err);
        }
    };

    let battle = lock_battle(&shared);
    replay.finalize(&battle);
    let summary = metrics.finalize(&battle, end_condition(report.stop_reason));
    info!(
        ticks = report.ticks_run,
        mean_tick_us = report.mean_tick_time.as_micros() as u64,
        result = %summary.headline(),
        "realtime match finished"
    );
    drop(battle);

    Ok(MatchResult { summary, replay })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScriptedPlacement;
    use lane_core::replay::ReplayPlayer;
    use lane_core::unit_kind::UnitKind;

    fn short_scenario() -> Scenario {
        Scenario {
            name: "short".to_string(),
            time_limit_secs: 3,
            placements: vec![
                ScriptedPlacement::blue(0, UnitKind::Knight, 140, 500),
                ScriptedPlacement::blue(1000, UnitKind::Ranged, 460, 540),
                // Red half; always refused.
                ScriptedPlacement::blue(1500, UnitKind::Knight, 140, 100),
            ],
            ..Scenario::skirmish()
        }
    }

    #[test]
    fn test_fast_forward_hits_time_limit() {
        let result = fast_forward(&short_scenario(), "ff").unwrap();
        let summary = &result.summary;
        assert_eq!(summary.end, EndCondition::TimeLimit);
        assert_eq!(summary.duration_ticks, 60);
        assert_eq!(summary.placements_rejected, 1);
        assert_eq!(summary.side(lane_core::factions::Side::Blue).unwrap().units_deployed["Knight"], 1);
        assert_eq!(result.replay.commands.len(), 2);
        assert_eq!(result.replay.commands[1].tick, 20);

        let mut player = ReplayPlayer::new(result.replay).unwrap();
        assert!(player.verify().unwrap());
    }

    #[test]
    fn test_fast_forward_is_repeatable() {
        let a = fast_forward(&short_scenario(), "a").unwrap();
        let b = fast_forward(&short_scenario(), "b").unwrap();
        assert_eq!(a.summary.final_state_hash, b.summary.final_state_hash);
        assert_eq!(a.replay.commands, b.replay.commands);
    }

    #[test]
    fn test_realtime_run_replays_exactly() {
        let options = RunOptions {
            game_id: "rt".to_string(),
            frame_rate: 500,
            speed: 50.0,
        };
        let mut presenter = NullPresenter::default();
        let result = run_realtime(&short_scenario(), &options, &mut presenter).unwrap();

        assert_eq!(result.summary.end, EndCondition::TimeLimit);
        assert_eq!(result.summary.duration_ticks, 60);
        assert!(!result.summary.detailed);
        assert!(presenter.frames >= 1);
        assert_eq!(presenter.last_tick, 60);
        // The time-zero placement is applied before the threads start.
        assert_eq!(result.replay.commands[0].tick, 0);

        let mut player = ReplayPlayer::new(result.replay).unwrap();
        assert!(player.verify().unwrap());
    }

    #[test]
    fn test_ascii_presenter_writes_frames() {
        let battle = Scenario::skirmish().build_battle().unwrap();
        let mut presenter = AsciiPresenter::new(Vec::new(), AsciiConfig::default(), false);
        presenter.present(&battle.frame(), battle.arena()).unwrap();
        let text = String::from_utf8(presenter.out).unwrap();
        assert!(text.starts_with("Tick"));
    }

    #[test]
    fn test_speed_scales_tick_rate() {
        let options = RunOptions {
            speed: 2.5,
            ..RunOptions::default()
        };
        assert_eq!(options.thread_tick_rate(20), 50);
        let stalled = RunOptions {
            speed: 0.0,
            ..RunOptions::default()
        };
        assert_eq!(stalled.thread_tick_rate(20), 1);
    }
}
