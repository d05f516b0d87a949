//! Reactive computer opponent.
//!
//! The controller wakes once per reaction interval. If an enemy unit has
//! crossed the river toward its side, it answers the most advanced one with
//! a counter unit placed just in front of it. With no threat and a nearly
//! full resource pool, it pushes a random offensive unit onto one of the
//! lanes instead. All choices come from a seeded generator, so a battle's
//! opponent behaves identically for the same seed and inputs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::components::EntityId;
use crate::config::Difficulty;
use crate::economy::ResourcePool;
use crate::factions::Side;
use crate::map::{Arena, Cell};
use crate::math::{millis, Fixed, Vec2Fixed};
use crate::simulation::EntityStorage;
use crate::unit_kind::{TowerTier, UnitCategory, UnitKind};

/// Units the controller pushes when it has resources to spare.
pub const OFFENSIVE_ROSTER: [UnitKind; 4] = [
    UnitKind::Giant,
    UnitKind::Knight,
    UnitKind::Archers,
    UnitKind::Valkyrie,
];

/// Unit sent to answer a threat of the given kind.
#[must_use]
pub const fn counter_for(threat: UnitKind) -> UnitKind {
    match threat.stats().category {
        UnitCategory::Tank => UnitKind::Pekka,
        UnitCategory::Ranged => UnitKind::Valkyrie,
        UnitCategory::Melee => UnitKind::Knight,
    }
}

/// Why a unit is being placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motive {
    /// Answering an enemy unit past the river.
    Counter {
        /// The threatening unit.
        threat: EntityId,
    },
    /// Spending a nearly full pool.
    Overflow,
}

/// A placement the controller wants to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnOrder {
    /// Unit to place.
    pub kind: UnitKind,
    /// Where to place it.
    pub position: Vec2Fixed,
    /// Why.
    pub motive: Motive,
}

/// What the controller may look at when deciding.
#[derive(Debug, Clone, Copy)]
pub struct OpponentView<'a> {
    /// All entities.
    pub storage: &'a EntityStorage,
    /// Terrain and landmarks.
    pub arena: &'a Arena,
    /// The controller's own resource pool.
    pub pool: &'a ResourcePool,
    /// Percentage of the cap that counts as nearly full.
    pub overflow_percent: u32,
}

/// Seeded decision maker for one side.
#[derive(Debug, Clone)]
pub struct OpponentController {
    side: Side,
    difficulty: Difficulty,
    rng: ChaCha8Rng,
    reaction_timer: Fixed,
}

impl OpponentController {
    /// Create a controller. The first decision comes after one full
    /// reaction interval.
    #[must_use]
    pub fn new(side: Side, difficulty: Difficulty, seed: u64) -> Self {
        Self {
            side,
            difficulty,
            rng: ChaCha8Rng::seed_from_u64(seed),
            reaction_timer: millis(difficulty.reaction_interval_ms()),
        }
    }

    /// Side this controller plays.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.side
    }

    /// Active preset.
    #[must_use]
    pub const fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Count down the reaction timer and decide when it expires.
    pub fn update(&mut self, dt: Fixed, view: &OpponentView<'_>) -> Option<SpawnOrder> {
        self.reaction_timer -= dt;
        if self.reaction_timer > Fixed::ZERO {
            return None;
        }
        self.reaction_timer = millis(self.difficulty.reaction_interval_ms());
        self.decide(view)
    }

    /// Make one decision immediately, ignoring the timer.
    pub fn decide(&mut self, view: &OpponentView<'_>) -> Option<SpawnOrder> {
        if let Some((threat, kind, position)) = self.primary_threat(view) {
            let counter = counter_for(kind);
            let cost = counter.stats().cost;
            if !view.pool.can_afford(cost) {
                debug!(side = %self.side, threat, cost, "threat seen, saving up");
                return None;
            }
            let spot = counter_spot(view.arena, self.side, position)?;
            debug!(
                side = %self.side,
                threat,
                threat_kind = kind.name(),
                counter = counter.name(),
                "countering threat"
            );
            return Some(SpawnOrder {
                kind: counter,
                position: spot,
                motive: Motive::Counter { threat },
            });
        }

        if !view.pool.at_least_percent(view.overflow_percent) {
            return None;
        }
        let columns = view.arena.landmarks.crossing_columns();
        if columns.is_empty() {
            return None;
        }
        let kind = OFFENSIVE_ROSTER[self.rng.gen_range(0..OFFENSIVE_ROSTER.len())];
        let col = columns[self.rng.gen_range(0..columns.len())];
        if !view.pool.can_afford(kind.stats().cost) {
            return None;
        }
        let row = view.arena.landmarks.lane_row(self.side);
        debug!(side = %self.side, kind = kind.name(), row, col, "pushing lane");
        Some(SpawnOrder {
            kind,
            position: view.arena.map.cell_center((row, col)),
            motive: Motive::Overflow,
        })
    }

    /// Living enemy unit past the defensive line closest to this side's
    /// primary tower; ties go to the lower id.
    fn primary_threat(&self, view: &OpponentView<'_>) -> Option<(EntityId, UnitKind, Vec2Fixed)> {
        let king = view
            .storage
            .find_tower(self.side, TowerTier::King)
            .and_then(|id| view.storage.get(id))?
            .position;
        let tile = view.arena.map.tile_size();

        view.storage
            .iter_sorted()
            .filter(|e| e.side != self.side && !e.health.is_dead())
            .filter(|e| view.arena.landmarks.is_threat_to(self.side, e.position, tile))
            .filter_map(|e| e.kind().map(|kind| (e.id, kind, e.position)))
            .min_by_key(|&(id, _, position)| (position.distance_squared(king), id))
    }
}

/// One tile from `threat` toward `side`, or the closest valid cell on
/// `side`'s half if that tile is unusable.
fn counter_spot(arena: &Arena, side: Side, threat: Vec2Fixed) -> Option<Vec2Fixed> {
    let map = &arena.map;
    let landmarks = &arena.landmarks;
    let usable = |(row, col): Cell| map.is_passable(row, col) && landmarks.half_contains(side, row);

    let (row, col) = map.cell_of(threat)?;
    let ahead = match side {
        Side::Red => row.checked_sub(1),
        Side::Blue => Some(row + 1),
    };
    if let Some(ahead) = ahead.map(|r| (r, col)).filter(|&cell| usable(cell)) {
        return Some(map.cell_center(ahead));
    }

    (0..map.rows())
        .flat_map(|r| (0..map.cols()).map(move |c| (r, c)))
        .filter(|&cell| usable(cell))
        .min_by_key(|&cell| map.cell_center(cell).distance_squared(threat))
        .map(|cell| map.cell_center(cell))
}
