//! Simulation benchmarks for lane_core.
//!
//! Run with: `cargo bench -p lane_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lane_core::map::Arena;
use lane_core::pathfinding::{find_path, find_path_bfs};
use lane_core::prelude::*;

fn crowded_battle() -> Battle {
    let mut battle = Battle::standard(5).unwrap();
    let kinds = [UnitKind::Knight, UnitKind::Archers, UnitKind::Giant, UnitKind::Valkyrie];
    for (i, kind) in kinds.iter().cycle().take(24).enumerate() {
        let col = i32::try_from(i % 12).unwrap();
        let x = 60 + col * 40;
        battle.spawn_unit(*kind, Side::Blue, Vec2Fixed::from_ints(x, 560), None);
        battle.spawn_unit(*kind, Side::Red, Vec2Fixed::from_ints(x, 240), None);
    }
    battle
}

/// Path queries across the standard arena.
pub fn pathfinding_benchmark(c: &mut Criterion) {
    let arena = Arena::standard().unwrap();
    c.bench_function("astar_base_to_base", |b| {
        b.iter(|| black_box(find_path(&arena.map, black_box((18, 7)), black_box((1, 7)))))
    });
    c.bench_function("bfs_base_to_base", |b| {
        b.iter(|| black_box(find_path_bfs(&arena.map, black_box((18, 7)), black_box((1, 7)))))
    });
}

/// Full ticks with a few dozen units fighting.
pub fn tick_benchmark(c: &mut Criterion) {
    let battle = crowded_battle();
    c.bench_function("tick_48_units", |b| {
        b.iter_batched(
            || battle.clone(),
            |mut battle| {
                for _ in 0..20 {
                    black_box(battle.tick());
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, pathfinding_benchmark, tick_benchmark);
criterion_main!(benches);
