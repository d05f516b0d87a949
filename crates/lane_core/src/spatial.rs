//! Per-tick uniform-grid bucketing of live entities.
//!
//! The index is rebuilt from scratch at the start of every tick and holds
//! no ownership: each bucket entry is a copy of the entity's id, side and
//! position at rebuild time. Neighbour queries only visit the cells that
//! cover the query radius, so their cost scales with local density rather
//! than total entity count.

use crate::components::EntityId;
use crate::factions::Side;
use crate::map::{Cell, GridMap};
use crate::math::{Fixed, Vec2Fixed};

/// A non-owning index entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    /// Entity id in the master storage.
    pub id: EntityId,
    /// Owning side.
    pub side: Side,
    /// Position at rebuild time.
    pub position: Vec2Fixed,
    /// True for towers.
    pub is_structure: bool,
}

/// Bucketed spatial index aligned with the terrain grid.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    rows: usize,
    cols: usize,
    cell_size: Fixed,
    buckets: Vec<Vec<Occupant>>,
    len: usize,
}

impl SpatialIndex {
    /// Create an empty index with one bucket per map cell.
    #[must_use]
    pub fn for_map(map: &GridMap) -> Self {
        Self {
            rows: map.rows(),
            cols: map.cols(),
            cell_size: map.tile_size(),
            buckets: vec![Vec::new(); map.rows() * map.cols()],
            len: 0,
        }
    }

    /// Empty every bucket, keeping allocations.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }

    /// Bucket containing a point, or `None` outside the grid.
    #[must_use]
    pub fn cell_of(&self, point: Vec2Fixed) -> Option<Cell> {
        if point.x < Fixed::ZERO || point.y < Fixed::ZERO {
            return None;
        }
        let col = usize::try_from((point.x / self.cell_size).floor().to_num::<i64>()).ok()?;
        let row = usize::try_from((point.y / self.cell_size).floor().to_num::<i64>()).ok()?;
        (row < self.rows && col < self.cols).then_some((row, col))
    }

    /// Add an occupant. Returns false (and drops it) when it lies outside
    /// the grid.
    pub fn insert(&mut self, occupant: Occupant) -> bool {
        let Some((row, col)) = self.cell_of(occupant.position) else {
            return false;
        };
        self.buckets[row * self.cols + col].push(occupant);
        self.len += 1;
        true
    }

    /// Clear and refill from the given occupants.
    ///
    /// Callers pass occupants in sorted id order so bucket contents are
    /// deterministic.
    pub fn rebuild<I>(&mut self, occupants: I)
    where
        I: IntoIterator<Item = Occupant>,
    {
        self.clear();
        for occupant in occupants {
            self.insert(occupant);
        }
    }

    /// Number of indexed occupants.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if nothing is indexed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Contents of one bucket; empty for out-of-range cells.
    #[must_use]
    pub fn bucket(&self, cell: Cell) -> &[Occupant] {
        if cell.0 < self.rows && cell.1 < self.cols {
            &self.buckets[cell.0 * self.cols + cell.1]
        } else {
            &[]
        }
    }

    /// Inclusive cell span covering `[center - radius, center + radius]`
    /// on one axis, clamped to the grid.
    fn span(&self, center: Fixed, radius: Fixed, limit: usize) -> Option<(usize, usize)> {
        let lo = ((center - radius) / self.cell_size).floor().to_num::<i64>();
        let hi = ((center + radius) / self.cell_size).floor().to_num::<i64>();
        let max = i64::try_from(limit).ok()? - 1;
        if hi < 0 || lo > max {
            return None;
        }
        let lo = usize::try_from(lo.max(0)).ok()?;
        let hi = usize::try_from(hi.min(max)).ok()?;
        Some((lo, hi))
    }

    /// Visit every occupant within `radius` of `point`, in row-major
    /// bucket order.
    pub fn for_each_within<F>(&self, point: Vec2Fixed, radius: Fixed, mut visit: F)
    where
        F: FnMut(&Occupant, Fixed),
    {
        let Some((row_lo, row_hi)) = self.span(point.y, radius, self.rows) else {
            return;
        };
        let Some((col_lo, col_hi)) = self.span(point.x, radius, self.cols) else {
            return;
        };
        let radius_sq = radius * radius;

        for row in row_lo..=row_hi {
            for col in col_lo..=col_hi {
                for occupant in &self.buckets[row * self.cols + col] {
                    let dist_sq = occupant.position.distance_squared(point);
                    if dist_sq <= radius_sq {
                        visit(occupant, dist_sq);
                    }
                }
            }
        }
    }

    /// All occupants within `radius` of `point`.
    #[must_use]
    pub fn neighbors_within(&self, point: Vec2Fixed, radius: Fixed) -> Vec<Occupant> {
        let mut found = Vec::new();
        self.for_each_within(point, radius, |occupant, _| found.push(*occupant));
        found
    }

    /// Closest accepted occupant within `radius`; ties go to the lower id.
    pub fn nearest<F>(&self, point: Vec2Fixed, radius: Fixed, mut accept: F) -> Option<Occupant>
    where
        F: FnMut(&Occupant) -> bool,
    {
        let mut best: Option<(Fixed, Occupant)> = None;
        self.for_each_within(point, radius, |occupant, dist_sq| {
            let better = match &best {
                None => true,
                Some((best_sq, best_occ)) => {
                    dist_sq < *best_sq || (dist_sq == *best_sq && occupant.id < best_occ.id)
                }
            };
            if better && accept(occupant) {
                best = Some((dist_sq, *occupant));
            }
        });
        best.map(|(_, occupant)| occupant)
    }
}
