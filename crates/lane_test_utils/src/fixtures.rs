//! Test fixtures and helpers.
//!
//! Pre-built arenas and battles for consistent testing.

use fixed::types::I32F32;
use lane_core::config::BattleConfig;
use lane_core::map::{Arena, Cell, GridMap, Landmarks, TerrainKind};
use lane_core::math::Vec2Fixed;
use lane_core::simulation::{Battle, BattleSetup, TickEvents};

/// Tile size used by every fixture arena.
pub const TILE: u32 = 40;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Whole-pixel world position.
#[must_use]
pub fn vec2(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// All-open arena split in half, with no towers.
///
/// # Panics
///
/// Panics on a zero dimension.
#[must_use]
pub fn open_arena(rows: usize, cols: usize) -> Arena {
    Arena::open(rows, cols, TILE).expect("fixture arena dimensions are valid")
}

/// Grid drawn as text, one string per row.
///
/// `.` open, `#` rock, `~` water, `=` crossing, `B` Blue base, `R` Red base.
///
/// # Panics
///
/// Panics on ragged rows or unknown characters.
#[must_use]
pub fn grid_from_ascii(rows: &[&str]) -> GridMap {
    let cols = rows.first().map_or(0, |r| r.len());
    let codes: Vec<u8> = rows
        .iter()
        .flat_map(|row| {
            assert_eq!(row.len(), cols, "ragged fixture row {row:?}");
            row.chars().map(|ch| {
                let kind = match ch {
                    '.' => TerrainKind::Open,
                    '#' => TerrainKind::Obstacle,
                    '~' => TerrainKind::Water,
                    '=' => TerrainKind::Crossing,
                    'B' => TerrainKind::FriendlyBase,
                    'R' => TerrainKind::EnemyBase,
                    other => panic!("unknown fixture terrain {other:?}"),
                };
                kind.code()
            })
        })
        .collect();
    GridMap::from_codes(rows.len(), cols, TILE, &codes).expect("fixture grid is valid")
}

/// Open arena with rock on the given cells.
#[must_use]
pub fn walled_arena(rows: usize, cols: usize, walls: &[Cell]) -> Arena {
    let mut codes = vec![TerrainKind::Open.code(); rows * cols];
    for &(row, col) in walls {
        codes[row * cols + col] = TerrainKind::Obstacle.code();
    }
    Arena {
        map: GridMap::from_codes(rows, cols, TILE, &codes).expect("fixture grid is valid"),
        landmarks: Landmarks::split(rows),
    }
}

/// Battle with no towers and no opponent.
#[must_use]
pub fn sandbox(arena: Arena) -> Battle {
    sandbox_with(arena, BattleConfig::default())
}

/// [`sandbox`] with custom tunables.
#[must_use]
pub fn sandbox_with(arena: Arena, config: BattleConfig) -> Battle {
    Battle::new(
        arena,
        config,
        BattleSetup {
            seed: 0,
            spawn_towers: false,
            opponent: false,
        },
    )
    .expect("fixture config is valid")
}

/// Standard arena with towers, optionally driven by the opponent.
#[must_use]
pub fn standard_battle(seed: u64, opponent: bool) -> Battle {
    Battle::new(
        Arena::standard().expect("standard arena is valid"),
        BattleConfig::default(),
        BattleSetup {
            seed,
            spawn_towers: true,
            opponent,
        },
    )
    .expect("default config is valid")
}

/// Run `n` ticks, collecting every tick's events.
pub fn run_ticks(battle: &mut Battle, n: u64) -> Vec<TickEvents> {
    (0..n).map(|_| battle.tick()).collect()
}

/// Tick until `done` holds or `max_ticks` pass. Returns the tick count at
/// which `done` first held.
pub fn run_until<F>(battle: &mut Battle, max_ticks: u64, mut done: F) -> Option<u64>
where
    F: FnMut(&Battle) -> bool,
{
    for _ in 0..max_ticks {
        if done(battle) {
            return Some(battle.current_tick());
        }
        battle.tick();
    }
    done(battle).then(|| battle.current_tick())
}
