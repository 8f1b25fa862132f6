//! Benchmarks for capacity mesh generation.
//!
//! Measures full solves at several obstacle counts, plus the rectangle
//! subtraction primitive the carving pass leans on.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use capmesh_rectdiff::{
    subtract_rect_2d, Board, Bounds, Obstacle, Rect, RectDiffSolver, Solver, SolverOptions,
};

fn scattered_board(obstacle_count: usize) -> Board {
    let mut board = Board::new(Bounds::new(0.0, 200.0, 0.0, 150.0), 4, 0.15);
    for i in 0..obstacle_count {
        let x = (i as f64 * 37.0) % 180.0;
        let y = (i as f64 * 23.0) % 130.0;
        let w = 4.0 + (i as f64 * 3.0) % 12.0;
        let h = 3.0 + (i as f64 * 5.0) % 10.0;
        let z = match i % 3 {
            0 => vec![0, 1, 2, 3],
            1 => vec![0, 1],
            _ => vec![2, 3],
        };
        board = board.with_obstacle(Obstacle::on_z_layers(Rect::new(x, y, w, h), z));
    }
    board
}

fn bench_full_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("rectdiff_solve");
    group.sample_size(10);

    for &n in &[0, 10, 40] {
        group.bench_with_input(BenchmarkId::new("obstacles", n), &n, |b, &n| {
            b.iter(|| {
                let board = scattered_board(n);
                let mut solver =
                    RectDiffSolver::new(black_box(board), SolverOptions::default()).unwrap();
                solver.solve().unwrap();
                black_box(solver.output())
            })
        });
    }
    group.finish();
}

fn bench_subtract_rect(c: &mut Criterion) {
    let a = Rect::new(0.0, 0.0, 100.0, 80.0);
    let b = Rect::new(30.0, 20.0, 25.0, 25.0);
    c.bench_function("subtract_rect_2d", |bench| {
        bench.iter(|| subtract_rect_2d(black_box(&a), black_box(&b)))
    });
}

criterion_group!(benches, bench_full_solve, bench_subtract_rect);
criterion_main!(benches);
