//! Error types for the battle simulation.

use thiserror::Error;

use crate::components::EntityId;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Why a placement command was refused.
///
/// Placement is validated in full before anything is mutated, so a
/// rejected command never leaves a partial effect behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The point lies outside the grid.
    #[error("placement at ({x}, {y}) is outside the arena")]
    OutOfBounds {
        /// Requested x in whole pixels.
        x: i32,
        /// Requested y in whole pixels.
        y: i32,
    },

    /// The target cell cannot be walked on.
    #[error("cell ({row}, {col}) is impassable")]
    Impassable {
        /// Grid row.
        row: usize,
        /// Grid column.
        col: usize,
    },

    /// The point lies on the other side's half of the arena.
    #[error("cell ({row}, {col}) is not on the issuing side's half")]
    WrongSide {
        /// Grid row.
        row: usize,
        /// Grid column.
        col: usize,
    },

    /// The side cannot afford the unit.
    #[error("insufficient resources: need {required}, have {available}")]
    InsufficientResources {
        /// Cost of the unit.
        required: u32,
        /// Whole resource points available.
        available: u32,
    },

    /// The battle already has a winner.
    #[error("the battle is over")]
    BattleOver,
}

/// Top-level error type for the battle core.
#[derive(Debug, Error)]
pub enum BattleError {
    /// Terrain data could not be turned into a grid.
    #[error("Invalid map: {0}")]
    InvalidMap(String),

    /// A configuration value is out of range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Failed to parse a RON document.
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A placement command was rejected.
    #[error("Placement rejected: {0}")]
    Placement(#[from] PlacementError),

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Replay encoding, decoding or verification failed.
    #[error("Replay error: {0}")]
    Replay(String),

    /// The simulation thread could not be started or joined.
    #[error("Simulation thread error: {0}")]
    Thread(String),
}
