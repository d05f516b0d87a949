//! Static terrain grid and named arena landmarks.
//!
//! The grid is built once at battle start and never mutated. Destroyed
//! towers leave ruins in the battle state, not in the terrain.

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::factions::Side;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::unit_kind::TowerTier;

/// A grid cell as `(row, col)`.
pub type Cell = (usize, usize);

/// Terrain classification for one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TerrainKind {
    /// Walkable ground.
    #[default]
    Open,
    /// River; blocks movement.
    Water,
    /// Bridge over the river.
    Crossing,
    /// Mountain or rock; blocks movement.
    Obstacle,
    /// Base tile of the bottom (Blue) side.
    FriendlyBase,
    /// Base tile of the top (Red) side.
    EnemyBase,
}

impl TerrainKind {
    /// Returns true if units may stand on and path through this terrain.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        !matches!(self, Self::Water | Self::Obstacle)
    }

    /// Numeric code used in terrain layouts.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Water => 1,
            Self::Crossing => 2,
            Self::Obstacle => 3,
            Self::FriendlyBase => 4,
            Self::EnemyBase => 5,
        }
    }

    /// Parses a layout code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Open),
            1 => Some(Self::Water),
            2 => Some(Self::Crossing),
            3 => Some(Self::Obstacle),
            4 => Some(Self::FriendlyBase),
            5 => Some(Self::EnemyBase),
            _ => None,
        }
    }
}

/// Immutable rows x cols terrain grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridMap {
    rows: usize,
    cols: usize,
    #[serde(with = "fixed_serde")]
    tile_size: Fixed,
    /// Row-major terrain.
    cells: Vec<TerrainKind>,
}

impl GridMap {
    /// Creates a grid where every cell is open ground.
    pub fn open(rows: usize, cols: usize, tile_size: u32) -> Result<Self> {
        Self::from_codes(rows, cols, tile_size, &vec![0; rows * cols])
    }

    /// Builds a grid from row-major terrain codes.
    pub fn from_codes(rows: usize, cols: usize, tile_size: u32, codes: &[u8]) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(BattleError::InvalidMap(format!(
                "grid must be non-empty, got {rows}x{cols}"
            )));
        }
        if tile_size == 0 {
            return Err(BattleError::InvalidMap("tile size must be positive".into()));
        }
        if codes.len() != rows * cols {
            return Err(BattleError::InvalidMap(format!(
                "expected {} terrain codes, got {}",
                rows * cols,
                codes.len()
            )));
        }

        let cells = codes
            .iter()
            .enumerate()
            .map(|(i, &code)| {
                TerrainKind::from_code(code).ok_or_else(|| {
                    BattleError::InvalidMap(format!(
                        "unknown terrain code {code} at ({}, {})",
                        i / cols,
                        i % cols
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rows,
            cols,
            tile_size: Fixed::from_num(tile_size),
            cells,
        })
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Edge length of one cell in world units.
    #[must_use]
    pub const fn tile_size(&self) -> Fixed {
        self.tile_size
    }

    /// Check if a cell lies inside the grid.
    #[must_use]
    pub const fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Terrain at a cell; out-of-bounds cells read as [`TerrainKind::Obstacle`].
    #[must_use]
    pub fn classify(&self, row: usize, col: usize) -> TerrainKind {
        if self.in_bounds(row, col) {
            self.cells[row * self.cols + col]
        } else {
            TerrainKind::Obstacle
        }
    }

    /// False for out-of-bounds and blocked cells.
    #[must_use]
    pub fn is_passable(&self, row: usize, col: usize) -> bool {
        self.in_bounds(row, col) && self.classify(row, col).is_passable()
    }

    /// Row-major cell index.
    #[must_use]
    pub const fn index_of(&self, cell: Cell) -> usize {
        cell.0 * self.cols + cell.1
    }

    /// Cell containing a world point, or `None` outside the grid.
    #[must_use]
    pub fn cell_of(&self, point: Vec2Fixed) -> Option<Cell> {
        if point.x < Fixed::ZERO || point.y < Fixed::ZERO {
            return None;
        }
        let col = (point.x / self.tile_size).floor().to_num::<i64>();
        let row = (point.y / self.tile_size).floor().to_num::<i64>();
        let row = usize::try_from(row).ok()?;
        let col = usize::try_from(col).ok()?;
        self.in_bounds(row, col).then_some((row, col))
    }

    /// World position of a cell's centre.
    #[must_use]
    pub fn cell_center(&self, cell: Cell) -> Vec2Fixed {
        let half = self.tile_size / Fixed::from_num(2);
        Vec2Fixed::new(
            Fixed::from_num(cell.1) * self.tile_size + half,
            Fixed::from_num(cell.0) * self.tile_size + half,
        )
    }

    /// Terrain codes in row-major order.
    #[must_use]
    pub fn codes(&self) -> Vec<u8> {
        self.cells.iter().map(|kind| kind.code()).collect()
    }
}

/// A tower slot named by the arena layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TowerSite {
    /// Owning side.
    pub side: Side,
    /// Minor or primary tower.
    pub tier: TowerTier,
    /// Cell the tower stands on.
    pub cell: Cell,
}

/// Named coordinates consumed once at battle setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmarks {
    /// Lane crossing cells over the river.
    pub crossings: Vec<Cell>,
    /// Tower slots for both sides.
    pub tower_sites: Vec<TowerSite>,
    /// First row of the Blue half. Rows above belong to Red.
    pub boundary_row: usize,
    /// Inclusive row span of the river, if the arena has one.
    pub river_rows: Option<(usize, usize)>,
}

impl Landmarks {
    /// Landmarks for an arena split in half with no river or towers.
    #[must_use]
    pub fn split(rows: usize) -> Self {
        Self {
            crossings: Vec::new(),
            tower_sites: Vec::new(),
            boundary_row: rows / 2,
            river_rows: None,
        }
    }

    /// Returns true if `row` lies on `side`'s half.
    #[must_use]
    pub const fn half_contains(&self, side: Side, row: usize) -> bool {
        match side {
            Side::Red => row < self.boundary_row,
            Side::Blue => row >= self.boundary_row,
        }
    }

    /// Returns true once a point held by `side`'s enemy has pushed past the
    /// far bank of the river as seen from `side`.
    #[must_use]
    pub fn is_threat_to(&self, side: Side, point: Vec2Fixed, tile_size: Fixed) -> bool {
        let (first, last) = self
            .river_rows
            .unwrap_or((self.boundary_row, self.boundary_row.saturating_sub(1)));
        match side {
            Side::Red => point.y < Fixed::from_num(last + 1) * tile_size,
            Side::Blue => point.y >= Fixed::from_num(first) * tile_size,
        }
    }

    /// Row just on `side`'s bank of the river, used for lane pushes.
    #[must_use]
    pub fn lane_row(&self, side: Side) -> usize {
        match (side, self.river_rows) {
            (Side::Red, Some((first, _))) => first.saturating_sub(1),
            (Side::Blue, Some((_, last))) => last + 1,
            (Side::Red, None) => self.boundary_row.saturating_sub(1),
            (Side::Blue, None) => self.boundary_row,
        }
    }

    /// Distinct crossing columns in ascending order.
    #[must_use]
    pub fn crossing_columns(&self) -> Vec<usize> {
        let mut cols: Vec<usize> = self.crossings.iter().map(|&(_, col)| col).collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }
}

/// A terrain grid together with its landmarks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arena {
    /// Terrain.
    pub map: GridMap,
    /// Named coordinates.
    pub landmarks: Landmarks,
}

/// Rows in the standard arena.
pub const STANDARD_ROWS: usize = 20;
/// Columns in the standard arena.
pub const STANDARD_COLS: usize = 15;
/// Tile edge in the standard arena.
pub const STANDARD_TILE: u32 = 40;

impl Arena {
    /// The standard two-lane arena: a 20x15 grid of 40px tiles with a river
    /// on rows 9-10, bridges on columns 3 and 11, a base tile for each side
    /// and four rock outcrops.
    pub fn standard() -> Result<Self> {
        let (rows, cols) = (STANDARD_ROWS, STANDARD_COLS);
        let mut codes = vec![TerrainKind::Open.code(); rows * cols];
        let mut set = |row: usize, col: usize, kind: TerrainKind| codes[row * cols + col] = kind.code();

        for col in 0..cols {
            set(9, col, TerrainKind::Water);
            set(10, col, TerrainKind::Water);
        }
        for col in [3, 11] {
            set(9, col, TerrainKind::Crossing);
            set(10, col, TerrainKind::Crossing);
        }
        set(1, cols / 2, TerrainKind::EnemyBase);
        set(rows - 2, cols / 2, TerrainKind::FriendlyBase);
        for (row, col) in [(5, 3), (5, 11), (14, 5), (14, 9)] {
            set(row, col, TerrainKind::Obstacle);
        }

        let map = GridMap::from_codes(rows, cols, STANDARD_TILE, &codes)?;
        let landmarks = Landmarks {
            crossings: vec![(9, 3), (10, 3), (9, 11), (10, 11)],
            tower_sites: vec![
                TowerSite { side: Side::Red, tier: TowerTier::King, cell: (1, cols / 2) },
                TowerSite { side: Side::Red, tier: TowerTier::Princess, cell: (3, 3) },
                TowerSite { side: Side::Red, tier: TowerTier::Princess, cell: (3, 11) },
                TowerSite { side: Side::Blue, tier: TowerTier::King, cell: (rows - 2, cols / 2) },
                TowerSite { side: Side::Blue, tier: TowerTier::Princess, cell: (16, 3) },
                TowerSite { side: Side::Blue, tier: TowerTier::Princess, cell: (16, 11) },
            ],
            boundary_row: rows / 2,
            river_rows: Some((9, 10)),
        };

        Ok(Self { map, landmarks })
    }

    /// An all-open arena split in half, with no towers.
    pub fn open(rows: usize, cols: usize, tile_size: u32) -> Result<Self> {
        Ok(Self {
            map: GridMap::open(rows, cols, tile_size)?,
            landmarks: Landmarks::split(rows),
        })
    }
}
