//! Property tests for grid search and neighbour queries.

use lane_core::factions::Side;
use lane_core::map::{Cell, GridMap};
use lane_core::math::Fixed;
use lane_core::pathfinding::{find_path, find_path_bfs, path_to_waypoints};
use lane_core::spatial::{Occupant, SpatialIndex};
use lane_test_utils::determinism::strategies::{arb_cell, arb_position, arb_terrain_codes};
use lane_test_utils::fixtures::{grid_from_ascii, TILE};
use proptest::prelude::*;

const ROWS: usize = 12;
const COLS: usize = 10;

fn is_valid_walk(map: &GridMap, start: Cell, path: &[Cell]) -> bool {
    let mut previous = start;
    for &cell in path {
        let step = previous.0.abs_diff(cell.0) + previous.1.abs_diff(cell.1);
        if step != 1 || !map.is_passable(cell.0, cell.1) {
            return false;
        }
        previous = cell;
    }
    true
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A* must agree with breadth-first search on path length and produce a
    /// legal 4-connected walk ending at the goal.
    #[test]
    fn astar_is_optimal(
        codes in arb_terrain_codes(ROWS, COLS),
        start in arb_cell(ROWS, COLS),
        goal in arb_cell(ROWS, COLS),
    ) {
        let map = GridMap::from_codes(ROWS, COLS, TILE, &codes).unwrap();
        let astar = find_path(&map, start, goal);
        let bfs = find_path_bfs(&map, start, goal);

        prop_assert_eq!(astar.len(), bfs.len());
        if !astar.is_empty() {
            prop_assert_eq!(astar.last().copied(), Some(goal));
            prop_assert!(is_valid_walk(&map, start, &astar));
            prop_assert!(!astar.contains(&start));
        }
    }

    /// Same inputs, same path, every time.
    #[test]
    fn astar_is_stable(
        codes in arb_terrain_codes(ROWS, COLS),
        start in arb_cell(ROWS, COLS),
        goal in arb_cell(ROWS, COLS),
    ) {
        let map = GridMap::from_codes(ROWS, COLS, TILE, &codes).unwrap();
        prop_assert_eq!(find_path(&map, start, goal), find_path(&map, start, goal));
    }

    /// The bucketed query returns exactly what a brute-force scan does.
    #[test]
    fn spatial_query_is_complete(
        points in proptest::collection::vec(arb_position(400, 480), 1..40),
        centre in arb_position(400, 480),
        radius in 1i32..200,
    ) {
        let map = GridMap::open(ROWS, COLS, TILE).unwrap();
        let occupants: Vec<Occupant> = points
            .iter()
            .enumerate()
            .map(|(i, &position)| Occupant {
                id: i as u64,
                side: if i % 2 == 0 { Side::Red } else { Side::Blue },
                position,
                is_structure: false,
            })
            .collect();

        let mut index = SpatialIndex::for_map(&map);
        index.rebuild(occupants.clone());

        let radius = Fixed::from_num(radius);
        let mut found: Vec<u64> = index
            .neighbors_within(centre, radius)
            .iter()
            .map(|o| o.id)
            .collect();
        found.sort_unstable();

        let expected: Vec<u64> = occupants
            .iter()
            .filter(|o| o.position.distance_squared(centre) <= radius * radius)
            .map(|o| o.id)
            .collect();

        prop_assert_eq!(found, expected);
    }
}

#[test]
fn walled_off_goal_is_unreachable() {
    let map = grid_from_ascii(&[
        ".....",
        "####.",
        ".....",
        ".####",
        "..#..",
    ]);
    assert!(find_path(&map, (0, 0), (4, 4)).is_empty());
    assert!(find_path_bfs(&map, (0, 0), (4, 4)).is_empty());
    assert_eq!(find_path(&map, (0, 0), (4, 0)).len(), 12);
}

#[test]
fn river_forces_a_bridge() {
    let map = grid_from_ascii(&[
        ".....",
        ".....",
        "~~=~~",
        ".....",
        ".....",
    ]);
    let path = find_path(&map, (0, 0), (4, 0));
    assert!(path.contains(&(2, 2)));
    assert_eq!(path.len(), 8);

    let waypoints = path_to_waypoints(&map, &path);
    assert_eq!(waypoints.len(), path.len());
    assert_eq!(waypoints.back().copied(), Some(map.cell_center((4, 0))));
}
