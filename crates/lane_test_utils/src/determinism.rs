//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a battle produces identical results
//! given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and batch runs only mean something if the same inputs always
//! produce the same battle. Sources of non-determinism include:
//!
//! - **Floating-point math**: We use fixed-point arithmetic via
//!   [`lane_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Entities are stepped and hashed in sorted
//!   id order.
//!
//! - **System randomness**: The opponent draws from a generator seeded by
//!   the battle setup.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual behaviours (movement, combat, projectiles)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full battles are reproducible and replayable
//! 4. **Parallel tests**: Running N battles on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use lane_core::replay::{Replay, ReplayPlayer};
use lane_core::simulation::{Battle, BattleSetup, Placement};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs agreed, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel battle runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each battle.
    pub hashes: Vec<u64>,
    /// Number of ticks each battle ran.
    pub ticks: u64,
    /// Number of battles run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all battles produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all battles matched.
    ///
    /// # Panics
    ///
    /// Panics if battles produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel battles diverged!\n\
                 Battles: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run any stepped state multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use lane_core::simulation::Battle;
/// use lane_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     3,
///     50,
///     || Battle::standard(7).unwrap(),
///     |battle| { battle.tick(); },
///     Battle::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a battle twice with identical setup and compare final hashes.
pub fn verify_battle_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Battle,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |battle| {
            battle.tick();
        },
        Battle::state_hash,
    );
    result.is_deterministic
}

/// Run N battles on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_parallel_battles_scoped<F>(
    setup_fn: F,
    num_sims: usize,
    num_ticks: u64,
) -> ParallelSimResult
where
    F: Fn() -> Battle + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut battle = setup_fn();
                    for _ in 0..num_ticks {
                        battle.tick();
                    }
                    battle.state_hash()
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two battle runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs agree, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Battle,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.tick();
        b.tick();

        if a.state_hash() != b.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Record a battle with scripted placements, push the replay through its
/// byte encoding and check that playback lands on the same hash.
///
/// `script` pairs a tick with the placement applied just before it runs.
/// Rejected placements are left out of the recording.
pub fn verify_replay_round_trip(
    setup: BattleSetup,
    build: impl Fn(BattleSetup) -> Battle,
    script: &[(u64, Placement)],
    num_ticks: u64,
) -> bool {
    let mut battle = build(setup);
    let mut replay = Replay::for_battle("determinism", &battle, setup);

    for _ in 0..num_ticks {
        let now = battle.current_tick();
        for (_, placement) in script.iter().filter(|(at, _)| *at == now) {
            if battle.apply_placement(placement).is_ok() {
                replay.record(now, *placement);
            }
        }
        battle.tick();
    }
    replay.finalize(&battle);

    let Ok(bytes) = replay.to_bytes() else {
        return false;
    };
    let Ok(restored) = Replay::from_bytes(&bytes) else {
        return false;
    };
    ReplayPlayer::new(restored)
        .and_then(|mut player| player.verify())
        .unwrap_or(false)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle inputs.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use lane_core::factions::Side;
    use lane_core::map::{Cell, TerrainKind};
    use lane_core::math::Vec2Fixed;
    use lane_core::simulation::Placement;
    use lane_core::unit_kind::UnitKind;
    use proptest::prelude::*;

    /// Terrain codes for a `rows` x `cols` grid, mostly open with some rock
    /// and water.
    pub fn arb_terrain_codes(rows: usize, cols: usize) -> impl Strategy<Value = Vec<u8>> {
        let tile = prop_oneof![
            6 => Just(TerrainKind::Open.code()),
            2 => Just(TerrainKind::Obstacle.code()),
            1 => Just(TerrainKind::Water.code()),
        ];
        proptest::collection::vec(tile, rows * cols)
    }

    /// Any cell of a `rows` x `cols` grid.
    pub fn arb_cell(rows: usize, cols: usize) -> impl Strategy<Value = Cell> {
        (0..rows, 0..cols)
    }

    /// A world position inside a `width` x `height` pixel area.
    pub fn arb_position(width: i32, height: i32) -> impl Strategy<Value = Vec2Fixed> {
        (0..width, 0..height).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
    }

    /// Generate health values (1-5000).
    pub fn arb_health() -> impl Strategy<Value = u32> {
        1u32..5000u32
    }

    /// Generate damage values (0-1000).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        0u32..1000u32
    }

    /// A sequence of hits.
    pub fn arb_damage_sequence(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
        proptest::collection::vec(arb_damage(), 0..max_len)
    }

    /// Any deployable unit.
    pub fn arb_unit_kind() -> impl Strategy<Value = UnitKind> {
        proptest::sample::select(UnitKind::ALL.to_vec())
    }

    /// Either side.
    pub fn arb_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Red), Just(Side::Blue)]
    }

    /// A placement anywhere inside (and a little outside) the area.
    pub fn arb_placement(width: i32, height: i32) -> impl Strategy<Value = Placement> {
        (arb_unit_kind(), -20..width + 20, -20..height + 20, arb_side())
            .prop_map(|(kind, x, y, side)| Placement { kind, x, y, side })
    }

    /// Tick-stamped placements for scripted battles.
    pub fn arb_script(
        max_len: usize,
        max_tick: u64,
        width: i32,
        height: i32,
    ) -> impl Strategy<Value = Vec<(u64, Placement)>> {
        proptest::collection::vec((0..max_tick, arb_placement(width, height)), 0..max_len)
    }
}
