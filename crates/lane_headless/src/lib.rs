//! Headless runner for lane battles.
//!
//! This crate drives `lane_core` battles without a graphical client:
//!
//! - **Realtime runs**: a simulation thread ticks the battle at its fixed
//!   rate while a presentation thread applies scripted placements and draws
//!   ASCII frames ([`runner::run_realtime`])
//! - **Batches**: many opponent seeds fast-forwarded in parallel for balance
//!   numbers ([`batch::run_batch`])
//! - **Replays**: every run records its accepted placements so the final
//!   state hash can be reproduced later
//!
//! Scenarios are RON files; see [`scenario::Scenario`] for the format.
//!
//! # Example
//!
//! ```bash
//! # Watch the built-in skirmish
//! cargo run -p lane_headless -- run
//!
//! # Balance batch
//! cargo run -p lane_headless -- batch --count 200 --output results/batch.json
//!
//! # Verify a replay
//! cargo run -p lane_headless -- replay --file match.replay --verify
//! ```

pub mod ascii_visualizer;
pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use ascii_visualizer::{render_frame, render_map, AsciiConfig};
pub use batch::{run_batch, BatchConfig, BatchResults};
pub use metrics::{BatchSummary, EndCondition, MatchSummary, MetricsCollector, SideMetrics};
pub use runner::{fast_forward, run_realtime, MatchResult, Presenter, RunOptions, RunnerError};
pub use scenario::{Scenario, ScenarioError, ScriptedPlacement};
