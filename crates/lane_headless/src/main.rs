//! Headless lane-battle runner.
//!
//! Plays scenarios in the terminal, runs seed batches for balance checks and
//! verifies replays.
//!
//! # Usage
//!
//! ```bash
//! # Watch the built-in skirmish in the terminal
//! cargo run -p lane_headless -- run
//!
//! # Run a scenario file at 4x speed, record it, print only the summary
//! cargo run -p lane_headless -- run --scenario skirmish.ron --speed 4 --quiet --record match.replay
//!
//! # Balance batch over 500 opponent seeds
//! cargo run -p lane_headless -- batch --count 500 --output results/batch.json
//!
//! # Verify a recorded match
//! cargo run -p lane_headless -- replay --file match.replay --verify
//! ```
//!
//! Logs go to stderr (`RUST_LOG` overrides the level); summaries go to stdout
//! as JSON.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lane_core::config::Difficulty;
use lane_core::map::Arena;
use lane_core::replay::{Replay, ReplayPlayer};
use lane_headless::{
    ascii_visualizer::{render_frame, render_map, AsciiConfig},
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{run_realtime, AsciiPresenter, NullPresenter, Presenter, RunOptions},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "lane_headless")]
#[command(about = "Headless lane-battle runner with terminal frames, batches and replays")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play one match with simulation and presentation threads
    Run {
        /// Scenario file to load (built-in skirmish when absent)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the opponent preset (easy, normal, hard)
        #[arg(long, value_parser = Difficulty::from_str)]
        difficulty: Option<Difficulty>,

        /// Simulation speed multiplier
        #[arg(long, default_value = "1.0")]
        speed: f64,

        /// Presentation passes per second
        #[arg(long, default_value = "10")]
        fps: u32,

        /// Do not draw frames
        #[arg(short, long)]
        quiet: bool,

        /// Use ANSI colors and clear the screen between frames
        #[arg(long)]
        color: bool,

        /// Save a replay of the match
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Fast-forward a scenario over many seeds
    Batch {
        /// Scenario file to load (built-in skirmish when absent)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Write full results as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Scenario file to load (built-in skirmish when absent)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },

    /// Replay a recorded match
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Verify replay produces identical hash
        #[arg(long)]
        verify: bool,

        /// Print the final frame
        #[arg(long)]
        show: bool,
    },

    /// Print the standard arena
    Map,
}

fn main() {
    let cli = Cli::parse();

    // Logs to stderr; stdout carries summaries
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match cli.command.unwrap_or(Commands::Run {
        scenario: None,
        seed: None,
        difficulty: None,
        speed: 1.0,
        fps: 10,
        quiet: false,
        color: false,
        record: None,
    }) {
        Commands::Run {
            scenario,
            seed,
            difficulty,
            speed,
            fps,
            quiet,
            color,
            record,
        } => cmd_run(scenario, seed, difficulty, speed, fps, quiet, color, record),
        Commands::Batch {
            scenario,
            count,
            parallel,
            seed,
            output,
        } => cmd_batch(scenario, count, parallel, seed, output),
        Commands::Verify {
            scenario,
            seed,
            runs,
        } => cmd_verify(scenario, seed, runs),
        Commands::Replay { file, verify, show } => cmd_replay(file, verify, show),
        Commands::Map => cmd_map(),
    }
}

fn load_scenario(path: Option<PathBuf>) -> Scenario {
    match path {
        Some(path) => match Scenario::load(&path) {
            Ok(scenario) => {
                tracing::info!("Loaded scenario '{}' from {}", scenario.name, path.display());
                scenario
            }
            Err(e) => {
                eprintln!("Failed to load scenario: {}", e);
                std::process::exit(1);
            }
        },
        None => Scenario::skirmish(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

/// Play one match in real time
fn cmd_run(
    scenario: Option<PathBuf>,
    seed: Option<u64>,
    difficulty: Option<Difficulty>,
    speed: f64,
    fps: u32,
    quiet: bool,
    color: bool,
    record: Option<PathBuf>,
) {
    let mut scenario = load_scenario(scenario);
    if let Some(seed) = seed {
        scenario.seed = seed;
    }
    if let Some(difficulty) = difficulty {
        scenario.difficulty = difficulty;
    }

    let options = RunOptions {
        game_id: format!("{}_{}", scenario.name.replace(' ', "_").to_lowercase(), scenario.seed),
        frame_rate: fps,
        speed,
    };

    let mut ascii;
    let mut null = NullPresenter::default();
    let presenter: &mut dyn Presenter = if quiet {
        &mut null
    } else {
        let config = AsciiConfig {
            use_color: color,
            ..AsciiConfig::default()
        };
        ascii = AsciiPresenter::new(std::io::stdout(), config, color);
        &mut ascii
    };

    let result = match run_realtime(&scenario, &options, presenter) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Match failed: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("{}", result.summary.headline());
    print_json(&result.summary);

    if let Some(path) = record {
        match result.replay.save(&path) {
            Ok(()) => eprintln!("Replay saved to {}", path.display()),
            Err(e) => {
                eprintln!("Failed to save replay: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Run a batch of fast-forwarded games
fn cmd_batch(scenario: Option<PathBuf>, count: u32, parallel: u32, seed: u64, output: Option<PathBuf>) {
    let config = BatchConfig {
        scenario: load_scenario(scenario),
        game_count: count,
        parallel_games: parallel,
        seed_start: seed,
    };

    let results = run_batch(config);

    let summary = &results.summary;
    eprintln!();
    eprintln!("=== Batch Summary ===");
    eprintln!("Games:    {}", summary.total_games);
    for (side, rate) in &summary.win_rates {
        eprintln!("{:<9} {:.1}% wins", format!("{side}:"), rate * 100.0);
    }
    eprintln!("Draws:    {}", summary.draws);
    eprintln!(
        "Duration: avg {:.0} ticks (min {}, max {})",
        summary.avg_duration_ticks, summary.min_duration_ticks, summary.max_duration_ticks
    );
    if !results.errors.is_empty() {
        eprintln!("Errors:   {}", results.errors.len());
    }

    match output {
        Some(path) => match results.save(&path) {
            Ok(()) => eprintln!("Results saved to {}", path.display()),
            Err(e) => {
                eprintln!("Failed to save results: {}", e);
                std::process::exit(1);
            }
        },
        None => print_json(summary),
    }
}

/// Verify determinism
fn cmd_verify(scenario: Option<PathBuf>, seed: u64, runs: u32) {
    let scenario = load_scenario(scenario);
    eprintln!("Verifying determinism: '{}' seed {} x{}", scenario.name, seed, runs);

    if verify_determinism(&scenario, seed, runs) {
        eprintln!("PASS: all {} runs produced the same final hash", runs);
    } else {
        eprintln!("FAIL: runs diverged");
        std::process::exit(1);
    }
}

/// Replay a recorded match
fn cmd_replay(file: PathBuf, verify: bool, show: bool) {
    let replay = match Replay::load(&file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load replay: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("Loaded replay:");
    eprintln!("  Scenario: {}", replay.scenario_id);
    eprintln!("  Seed: {}", replay.setup.seed);
    eprintln!("  Commands: {}", replay.commands.len());
    eprintln!("  Duration: {} ticks", replay.duration());

    let mut player = match ReplayPlayer::new(replay) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to create replay player: {}", e);
            std::process::exit(1);
        }
    };

    if verify {
        eprintln!("Verifying replay...");
        match player.verify() {
            Ok(true) => {
                eprintln!("PASS: Replay verification successful");
                eprintln!("  Hash: {:016x}", player.replay().final_hash);
            }
            Ok(false) => {
                eprintln!("FAIL: Replay produced different hash!");
                eprintln!("  Expected: {:016x}", player.replay().final_hash);
                eprintln!("  Actual:   {:016x}", player.battle().state_hash());
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("FAIL: Error during verification: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        let mut last_percent = 0;
        while player.advance() {
            let percent = player.progress_percent();
            if percent > last_percent && percent % 10 == 0 {
                eprintln!("Progress: {}%", percent);
                last_percent = percent;
            }
        }
        eprintln!("Replay complete at tick {}", player.current_tick());
        eprintln!("Final state hash: {:016x}", player.battle().state_hash());
    }

    if show {
        let battle = player.battle();
        print!("{}", render_frame(&battle.frame(), battle.arena(), &AsciiConfig::default()));
    }
}

/// Print the standard arena
fn cmd_map() {
    match Arena::standard() {
        Ok(arena) => print!("{}", render_map(&arena)),
        Err(e) => {
            eprintln!("Failed to build arena: {}", e);
            std::process::exit(1);
        }
    }
}
