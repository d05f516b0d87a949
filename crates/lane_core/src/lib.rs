//! # Lane Core
//!
//! Deterministic simulation core for a two-sided lane battle.
//!
//! This crate contains **only** battle logic:
//! - No rendering
//! - No file formats beyond config and replay loading
//! - No system randomness (the opponent uses a seeded generator)
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless runs and batch balance sweeps
//! - Replay recording and verification
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`map`] - Terrain grid, landmarks and the standard arena
//! - [`pathfinding`] - A* over the terrain grid
//! - [`spatial`] - Per-tick bucketed neighbour queries
//! - [`unit_kind`] - Unit and tower stat tables
//! - [`behavior`] / [`tower`] - Per-tick unit and tower state machines
//! - [`projectile`] - Homing shots and their pool
//! - [`opponent`] - Seeded reactive opponent
//! - [`simulation`] - Battle state and the tick pipeline
//! - [`runtime`] - Fixed-rate simulation thread
//! - [`replay`] - Recording and verified playback

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod behavior;
pub mod combat;
pub mod components;
pub mod config;
pub mod economy;
pub mod error;
pub mod factions;
pub mod map;
pub mod math;
pub mod opponent;
pub mod pathfinding;
pub mod projectile;
pub mod replay;
pub mod runtime;
pub mod simulation;
pub mod snapshot;
pub mod spatial;
pub mod tower;
pub mod unit_kind;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::{BattleConfig, Difficulty};
    pub use crate::economy::{ResourcePool, ResourceReadout};
    pub use crate::error::{BattleError, PlacementError, Result};
    pub use crate::factions::Side;
    pub use crate::map::{Arena, Cell, GridMap, Landmarks, TerrainKind};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::runtime::{SharedBattle, SimulationThread, ThreadOptions};
    pub use crate::simulation::{
        Battle, BattleSetup, Entity, EntityStorage, Outcome, Placement, TickEvents,
    };
    pub use crate::snapshot::Frame;
    pub use crate::unit_kind::{TowerTier, UnitKind};
}
