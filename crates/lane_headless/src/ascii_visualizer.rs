//! ASCII battle visualizer.
//!
//! Draws a [`Frame`] onto the arena grid, one character per tile, for
//! quick terminal review of a running or finished match.

use std::fmt::Write as _;

use lane_core::factions::Side;
use lane_core::map::{Arena, TerrainKind};
use lane_core::snapshot::Frame;
use lane_core::unit_kind::TowerTier;

/// ASCII visualization configuration.
#[derive(Debug, Clone)]
pub struct AsciiConfig {
    /// Show the per-side health table under the grid.
    pub show_health: bool,
    /// Show unit counts legend.
    pub show_legend: bool,
    /// Use colored output (ANSI).
    pub use_color: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_health: true,
            show_legend: true,
            use_color: false,
        }
    }
}

/// ANSI color codes.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const BLUE: &str = "\x1b[34m";
    pub const RED: &str = "\x1b[31m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

const fn side_color(side: Side) -> &'static str {
    match side {
        Side::Red => colors::RED,
        Side::Blue => colors::BLUE,
    }
}

/// Terrain character.
const fn terrain_char(kind: TerrainKind) -> char {
    match kind {
        TerrainKind::Open => '.',
        TerrainKind::Water => '~',
        TerrainKind::Crossing => '=',
        TerrainKind::Obstacle => '#',
        TerrainKind::FriendlyBase | TerrainKind::EnemyBase => '_',
    }
}

/// Unit glyphs are uppercase for Blue and lowercase for Red.
fn side_case(ch: char, side: Side) -> char {
    match side {
        Side::Red => ch.to_ascii_lowercase(),
        Side::Blue => ch.to_ascii_uppercase(),
    }
}

const fn tower_char(tier: TowerTier) -> char {
    match tier {
        TowerTier::King => 'K',
        TowerTier::Princess => 'P',
    }
}

#[derive(Clone)]
struct Tile {
    ch: char,
    color: &'static str,
}

fn terrain_grid(arena: &Arena) -> Vec<Vec<Tile>> {
    let map = &arena.map;
    (0..map.rows())
        .map(|row| {
            (0..map.cols())
                .map(|col| {
                    let kind = map.classify(row, col);
                    let color = match kind {
                        TerrainKind::Water | TerrainKind::Crossing => colors::CYAN,
                        _ => colors::GRAY,
                    };
                    Tile {
                        ch: terrain_char(kind),
                        color,
                    }
                })
                .collect()
        })
        .collect()
}

fn tile_of(arena: &Arena, x: i32, y: i32) -> Option<(usize, usize)> {
    let tile = arena.map.tile_size().to_num::<i32>().max(1);
    if x < 0 || y < 0 {
        return None;
    }
    let (row, col) = ((y / tile) as usize, (x / tile) as usize);
    arena.map.in_bounds(row, col).then_some((row, col))
}

fn push_grid(output: &mut String, grid: &[Vec<Tile>], use_color: bool) {
    let width = grid.first().map_or(0, Vec::len);
    output.push('+');
    output.push_str(&"-".repeat(width));
    output.push_str("+\n");
    for row in grid {
        output.push('|');
        for tile in row {
            if use_color {
                output.push_str(tile.color);
                output.push(tile.ch);
                output.push_str(colors::RESET);
            } else {
                output.push(tile.ch);
            }
        }
        output.push_str("|\n");
    }
    output.push('+');
    output.push_str(&"-".repeat(width));
    output.push_str("+\n");
}

/// Render the bare arena: terrain plus tower sites.
#[must_use]
pub fn render_map(arena: &Arena) -> String {
    let mut grid = terrain_grid(arena);
    for site in &arena.landmarks.tower_sites {
        let (row, col) = site.cell;
        if let Some(tile) = grid.get_mut(row).and_then(|r| r.get_mut(col)) {
            tile.ch = side_case(tower_char(site.tier), site.side);
        }
    }

    let mut output = format!(
        "{} x {} tiles of {}px, Red above row {}\n",
        arena.map.rows(),
        arena.map.cols(),
        arena.map.tile_size(),
        arena.landmarks.boundary_row
    );
    push_grid(&mut output, &grid, false);
    output.push_str(". open  ~ water  = crossing  # rock  _ base  K/P Blue towers  k/p Red towers\n");
    output
}

/// Render a frame over the arena.
///
/// Ruins are drawn as `x`, then towers, then units; a later layer
/// overwrites an earlier one on the same tile, and within a layer the
/// higher id wins.
#[must_use]
pub fn render_frame(frame: &Frame, arena: &Arena, config: &AsciiConfig) -> String {
    let mut grid = terrain_grid(arena);
    let mut place = |x: i32, y: i32, ch: char, color: &'static str| {
        if let Some((row, col)) = tile_of(arena, x, y) {
            grid[row][col] = Tile { ch, color };
        }
    };

    for ruin in &frame.ruins {
        place(ruin.x, ruin.y, 'x', colors::GRAY);
    }
    for tower in &frame.towers {
        place(tower.x, tower.y, side_case(tower_char(tower.tier), tower.side), colors::BOLD);
    }
    for unit in &frame.units {
        place(unit.x, unit.y, side_case(unit.kind.glyph(), unit.side), side_color(unit.side));
    }

    let mut output = String::new();
    let status = match frame.outcome {
        Some(outcome) => format!("{} wins (tick {})", outcome.winner, outcome.tick),
        None => "in progress".to_string(),
    };
    let _ = writeln!(
        output,
        "Tick {:>5} | Red {:>2}/{} | Blue {:>2}/{} | {}",
        frame.tick, frame.red.current, frame.red.max, frame.blue.current, frame.blue.max, status
    );
    push_grid(&mut output, &grid, config.use_color);

    if config.show_health {
        for side in Side::BOTH {
            let towers: Vec<String> = frame
                .towers
                .iter()
                .filter(|t| t.side == side)
                .map(|t| format!("{}:{}/{}", t.tier.name(), t.health, t.max_health))
                .collect();
            let _ = writeln!(output, "{side:<4} towers {}", towers.join(" "));
        }
    }

    if config.show_legend {
        let _ = writeln!(
            output,
            "Units: Red {} Blue {} | shots {} | ruins {}",
            frame.unit_count(Side::Red),
            frame.unit_count(Side::Blue),
            frame.shots.len(),
            frame.ruins.len()
        );
        output.push_str(
            "t tank  m melee  r ranged  g giant  p pekka  k knight  v valkyrie  a archers  d dart goblin (UPPER=Blue)\n",
        );
    }

    output
}
