//! Fixed-rate simulation thread.
//!
//! The battle lives behind a single mutex shared with whatever presents it.
//! The simulation thread holds the lock for exactly one tick, then releases
//! it and sleeps off whatever is left of the tick budget. Presentation takes
//! the same lock for one pass to copy a [`crate::snapshot::Frame`] and apply
//! pending placements.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::{BattleError, Result};
use crate::simulation::Battle;

/// A battle shared between the simulation and presentation threads.
pub type SharedBattle = Arc<Mutex<Battle>>;

/// Wrap a battle for sharing.
#[must_use]
pub fn share(battle: Battle) -> SharedBattle {
    Arc::new(Mutex::new(battle))
}

/// Lock the battle, recovering the state if another thread panicked while
/// holding the lock.
pub fn lock_battle(shared: &SharedBattle) -> MutexGuard<'_, Battle> {
    shared.lock().unwrap_or_else(|poisoned| {
        warn!("battle lock was poisoned; continuing with last state");
        poisoned.into_inner()
    })
}

/// How the simulation thread runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadOptions {
    /// Ticks per second.
    pub tick_rate: u32,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
    /// Stop on the tick the battle is decided.
    pub stop_when_over: bool,
}

impl Default for ThreadOptions {
    fn default() -> Self {
        Self {
            tick_rate: 20,
            max_ticks: None,
            stop_when_over: true,
        }
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// [`SimulationThread::request_stop`] or drop.
    Requested,
    /// `max_ticks` reached.
    TickLimit,
    /// A primary tower fell.
    BattleOver,
}

/// Summary returned when the thread is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationReport {
    /// Ticks executed by this thread.
    pub ticks_run: u64,
    /// Why it stopped.
    pub stop_reason: StopReason,
    /// Mean wall time per tick, excluding sleep.
    pub mean_tick_time: Duration,
}

/// Handle to a running simulation thread.
///
/// Dropping the handle stops and joins the thread.
#[derive(Debug)]
pub struct SimulationThread {
    shutdown: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    handle: Option<JoinHandle<SimulationReport>>,
}

impl SimulationThread {
    /// Start ticking `shared` on a new thread named `lane-sim`.
    pub fn spawn(shared: SharedBattle, options: ThreadOptions) -> Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let loop_state = TickLoop {
            shared,
            shutdown: Arc::clone(&shutdown),
            finished: Arc::clone(&finished),
            budget: Duration::from_secs(1) / options.tick_rate.max(1),
            options,
        };

        let handle = thread::Builder::new()
            .name("lane-sim".into())
            .spawn(move || loop_state.run())
            .map_err(|e| BattleError::Thread(e.to_string()))?;

        Ok(Self {
            shutdown,
            finished,
            handle: Some(handle),
        })
    }

    /// Ask the loop to stop at the top of its next iteration.
    pub fn request_stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    /// True once the loop has exited on its own or after a stop request.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Wait for the loop to end on its own (tick limit or battle over).
    pub fn join(mut self) -> Result<SimulationReport> {
        self.take_report()
    }

    /// Stop the loop and wait for it.
    pub fn shutdown(mut self) -> Result<SimulationReport> {
        self.request_stop();
        self.take_report()
    }

    fn take_report(&mut self) -> Result<SimulationReport> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| BattleError::Thread("simulation thread already joined".into()))?;
        handle
            .join()
            .map_err(|_| BattleError::Thread("simulation thread panicked".into()))
    }
}

impl Drop for SimulationThread {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.request_stop();
            if handle.join().is_err() {
                warn!("simulation thread panicked during shutdown");
            }
        }
    }
}

struct TickLoop {
    shared: SharedBattle,
    shutdown: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    budget: Duration,
    options: ThreadOptions,
}

impl TickLoop {
    fn run(self) -> SimulationReport {
        let mut ticks_run = 0u64;
        let mut busy = Duration::ZERO;

        let stop_reason = loop {
            if self.shutdown.load(Ordering::Acquire) {
                break StopReason::Requested;
            }
            if self.options.max_ticks.is_some_and(|limit| ticks_run >= limit) {
                break StopReason::TickLimit;
            }

            let tick_start = Instant::now();
            let over = {
                let mut battle = lock_battle(&self.shared);
                battle.tick();
                battle.is_over()
            };
            ticks_run += 1;
            let elapsed = tick_start.elapsed();
            busy += elapsed;

            if over && self.options.stop_when_over {
                break StopReason::BattleOver;
            }
            if let Some(remaining) = self.budget.checked_sub(elapsed) {
                thread::sleep(remaining);
            }
        };

        self.finished.store(true, Ordering::Release);
        let mean_tick_time = u32::try_from(ticks_run)
            .ok()
            .filter(|&n| n > 0)
            .map_or(Duration::ZERO, |n| busy / n);
        info!(ticks_run, ?stop_reason, ?mean_tick_time, "simulation thread stopped");

        SimulationReport {
            ticks_run,
            stop_reason,
            mean_tick_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BattleConfig;
    use crate::map::Arena;
    use crate::simulation::BattleSetup;

    fn sandbox() -> SharedBattle {
        share(
            Battle::new(
                Arena::open(10, 10, 40).unwrap(),
                BattleConfig::default(),
                BattleSetup {
                    seed: 0,
                    spawn_towers: false,
                    opponent: false,
                },
            )
            .unwrap(),
        )
    }

    #[test]
    fn runs_to_tick_limit() {
        let shared = sandbox();
        let thread = SimulationThread::spawn(
            Arc::clone(&shared),
            ThreadOptions {
                tick_rate: 1000,
                max_ticks: Some(5),
                stop_when_over: true,
            },
        )
        .unwrap();
        let report = thread.join().unwrap();
        assert_eq!(report.ticks_run, 5);
        assert_eq!(report.stop_reason, StopReason::TickLimit);
        assert_eq!(lock_battle(&shared).current_tick(), 5);
    }

    #[test]
    fn stops_on_request() {
        let shared = sandbox();
        let thread = SimulationThread::spawn(
            Arc::clone(&shared),
            ThreadOptions {
                tick_rate: 500,
                ..ThreadOptions::default()
            },
        )
        .unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(!thread.is_finished());
        let report = thread.shutdown().unwrap();
        assert_eq!(report.stop_reason, StopReason::Requested);
        assert_eq!(lock_battle(&shared).current_tick(), report.ticks_run);
    }

    #[test]
    fn drop_joins_thread() {
        let shared = sandbox();
        {
            let _thread = SimulationThread::spawn(Arc::clone(&shared), ThreadOptions::default()).unwrap();
        }
        // Only the test's handle remains once the thread has exited.
        assert_eq!(Arc::strong_count(&shared), 1);
    }
}
