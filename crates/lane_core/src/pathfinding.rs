//! Shortest paths over the terrain grid.
//!
//! Movement is 4-connected with a uniform step cost of 1. The search is
//! A* with a Manhattan heuristic, which is admissible and consistent on
//! such a grid, so the first time the goal is popped its path is optimal.
//! Equal-priority frontier nodes pop in discovery order, which keeps the
//! returned path stable across runs and platforms.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use crate::map::{Cell, GridMap};
use crate::math::Vec2Fixed;

/// Neighbour order: up, right, down, left.
const DIRECTIONS: [(isize, isize); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    cell: Cell,
    /// g + h.
    f_score: u32,
    /// Discovery sequence number.
    seq: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse both keys for min-first.
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
fn manhattan(a: Cell, b: Cell) -> u32 {
    (a.0.abs_diff(b.0) + a.1.abs_diff(b.1)) as u32
}

fn neighbours(map: &GridMap, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
    DIRECTIONS.iter().filter_map(move |&(dr, dc)| {
        let row = cell.0.checked_add_signed(dr)?;
        let col = cell.1.checked_add_signed(dc)?;
        map.is_passable(row, col).then_some((row, col))
    })
}

fn endpoints_valid(map: &GridMap, start: Cell, goal: Cell) -> bool {
    map.is_passable(start.0, start.1) && map.is_passable(goal.0, goal.1) && start != goal
}

/// Find a shortest path from `start` to `goal`.
///
/// Returns the cells to visit, excluding `start` and including `goal`.
/// An empty path means the goal is unreachable, either endpoint is
/// invalid, or `start == goal`.
#[must_use]
pub fn find_path(map: &GridMap, start: Cell, goal: Cell) -> Vec<Cell> {
    if !endpoints_valid(map, start, goal) {
        return Vec::new();
    }

    let cell_count = map.rows() * map.cols();
    let mut g_score = vec![u32::MAX; cell_count];
    let mut came_from: Vec<Option<Cell>> = vec![None; cell_count];
    let mut open_set = BinaryHeap::new();
    let mut seq = 0u64;

    g_score[map.index_of(start)] = 0;
    open_set.push(AStarNode {
        cell: start,
        f_score: manhattan(start, goal),
        seq,
    });

    while let Some(current) = open_set.pop() {
        if current.cell == goal {
            return reconstruct_path(map, &came_from, start, goal);
        }

        let current_g = g_score[map.index_of(current.cell)];
        // Stale heap entry for a node already settled with a lower cost.
        if current.f_score > current_g.saturating_add(manhattan(current.cell, goal)) {
            continue;
        }

        for next in neighbours(map, current.cell) {
            let tentative_g = current_g + 1;
            let idx = map.index_of(next);
            if tentative_g < g_score[idx] {
                g_score[idx] = tentative_g;
                came_from[idx] = Some(current.cell);
                seq += 1;
                open_set.push(AStarNode {
                    cell: next,
                    f_score: tentative_g + manhattan(next, goal),
                    seq,
                });
            }
        }
    }

    Vec::new()
}

/// Breadth-first shortest path with the same contract as [`find_path`].
///
/// Expands more nodes than A*; kept as an uninformed reference search.
#[must_use]
pub fn find_path_bfs(map: &GridMap, start: Cell, goal: Cell) -> Vec<Cell> {
    if !endpoints_valid(map, start, goal) {
        return Vec::new();
    }

    let mut came_from: Vec<Option<Cell>> = vec![None; map.rows() * map.cols()];
    let mut visited = vec![false; map.rows() * map.cols()];
    let mut frontier = VecDeque::from([start]);
    visited[map.index_of(start)] = true;

    while let Some(cell) = frontier.pop_front() {
        if cell == goal {
            return reconstruct_path(map, &came_from, start, goal);
        }
        for next in neighbours(map, cell) {
            let idx = map.index_of(next);
            if !visited[idx] {
                visited[idx] = true;
                came_from[idx] = Some(cell);
                frontier.push_back(next);
            }
        }
    }

    Vec::new()
}

/// Walk `came_from` back from the goal, dropping the start cell.
fn reconstruct_path(map: &GridMap, came_from: &[Option<Cell>], start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(prev) = came_from[map.index_of(current)] {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}

/// Convert grid cells into world-space cell centres, ready for a unit's
/// waypoint queue.
#[must_use]
pub fn path_to_waypoints(map: &GridMap, cells: &[Cell]) -> VecDeque<Vec2Fixed> {
    cells.iter().map(|&cell| map.cell_center(cell)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize, blocked: &[Cell]) -> GridMap {
        let mut codes = vec![0u8; rows * cols];
        for &(r, c) in blocked {
            codes[r * cols + c] = 3;
        }
        GridMap::from_codes(rows, cols, 10, &codes).unwrap()
    }

    fn assert_valid(map: &GridMap, start: Cell, path: &[Cell]) {
        let mut prev = start;
        for &cell in path {
            assert!(map.is_passable(cell.0, cell.1), "{cell:?} is blocked");
            assert_eq!(manhattan(prev, cell), 1, "{prev:?} -> {cell:?} is not a single step");
            prev = cell;
        }
    }

    #[test]
    fn straight_line_path() {
        let map = grid(5, 5, &[]);
        let path = find_path(&map, (0, 0), (0, 4));
        assert_eq!(path, vec![(0, 1), (0, 2), (0, 3), (0, 4)]);
    }

    #[test]
    fn path_excludes_start_and_includes_goal() {
        let map = grid(5, 5, &[]);
        let path = find_path(&map, (2, 2), (4, 4));
        assert_eq!(path.len(), 4);
        assert_ne!(path[0], (2, 2));
        assert_eq!(*path.last().unwrap(), (4, 4));
        assert_valid(&map, (2, 2), &path);
    }

    #[test]
    fn path_around_wall() {
        let blocked: Vec<Cell> = (0..4).map(|r| (r, 2)).collect();
        let map = grid(5, 5, &blocked);
        let path = find_path(&map, (0, 0), (0, 4));
        assert_valid(&map, (0, 0), &path);
        // Down four rows, across four columns, up four rows.
        assert_eq!(path.len(), 12);
    }

    #[test]
    fn unreachable_goal_returns_empty() {
        let blocked: Vec<Cell> = (0..5).map(|r| (r, 2)).collect();
        let map = grid(5, 5, &blocked);
        assert!(find_path(&map, (0, 0), (0, 4)).is_empty());
        assert!(find_path_bfs(&map, (0, 0), (0, 4)).is_empty());
    }

    #[test]
    fn invalid_endpoints_return_empty() {
        let map = grid(5, 5, &[(1, 1)]);
        assert!(find_path(&map, (1, 1), (4, 4)).is_empty());
        assert!(find_path(&map, (0, 0), (1, 1)).is_empty());
        assert!(find_path(&map, (0, 0), (9, 9)).is_empty());
        assert!(find_path(&map, (3, 3), (3, 3)).is_empty());
    }

    #[test]
    fn astar_matches_bfs_length() {
        let map = grid(8, 8, &[(1, 1), (1, 2), (1, 3), (3, 5), (4, 5), (5, 5), (6, 2)]);
        for goal in [(7, 7), (0, 7), (7, 0), (2, 2)] {
            let a = find_path(&map, (0, 0), goal);
            let b = find_path_bfs(&map, (0, 0), goal);
            assert_eq!(a.len(), b.len(), "goal {goal:?}");
            assert_valid(&map, (0, 0), &a);
        }
    }

    #[test]
    fn deterministic_results() {
        let map = grid(12, 12, &[(5, 4), (5, 5), (5, 6), (5, 7)]);
        let first = find_path(&map, (0, 5), (11, 5));
        for _ in 0..5 {
            assert_eq!(find_path(&map, (0, 5), (11, 5)), first);
        }
    }

    #[test]
    fn waypoints_are_cell_centres() {
        let map = grid(3, 3, &[]);
        let waypoints = path_to_waypoints(&map, &[(0, 1), (1, 1)]);
        assert_eq!(waypoints[0], Vec2Fixed::from_ints(15, 5));
        assert_eq!(waypoints[1], Vec2Fixed::from_ints(15, 15));
    }
}
