//! Integration tests for capmesh-rectdiff.

use capmesh_rectdiff::{
    Board, Bounds, CapacityMeshNode, Obstacle, Rect, RectDiffSolver, Solver, SolverOptions,
};

fn solve(board: Board, options: SolverOptions) -> (RectDiffSolver, Vec<CapacityMeshNode>) {
    let mut solver = RectDiffSolver::new(board, options).unwrap();
    solver.solve().unwrap();
    let nodes = solver.output().mesh_nodes;
    (solver, nodes)
}

fn node_rect(node: &CapacityMeshNode) -> Rect {
    Rect::new(
        node.center[0] - node.width / 2.0,
        node.center[1] - node.height / 2.0,
        node.width,
        node.height,
    )
}

/// Overlap check with a tolerance band, so abutting edges do not count.
fn rects_overlap(a: &Rect, b: &Rect, tol: f64) -> bool {
    a.x + tol < b.x + b.width
        && b.x + tol < a.x + a.width
        && a.y + tol < b.y + b.height
        && b.y + tol < a.y + a.height
}

fn shares_layer(a: &[usize], b: &[usize]) -> bool {
    a.iter().any(|z| b.contains(z))
}

mod empty_board_tests {
    use super::*;

    #[test]
    fn test_empty_board_produces_nodes() {
        let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 3, 0.1);
        let (solver, nodes) = solve(board, SolverOptions::default());

        assert!(solver.solved());
        assert!(!nodes.is_empty(), "an empty board must yield mesh nodes");

        // With nothing blocking, multi-layer placements should dominate.
        assert!(
            nodes.iter().any(|n| n.available_z.len() >= 2),
            "expected at least one multi-layer node on an empty 3-layer board"
        );
    }

    #[test]
    fn test_single_layer_preference_respected() {
        let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 3, 0.1);
        let options = SolverOptions::default().with_prefer_multi_layer(false);
        let (_, nodes) = solve(board, options);

        assert!(!nodes.is_empty());
        assert!(nodes.iter().all(|n| n.available_z.len() == 1));
    }

    #[test]
    fn test_node_ids_are_stable_and_unique() {
        let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 2, 0.1);
        let (_, nodes) = solve(board, SolverOptions::default());

        for (i, node) in nodes.iter().enumerate() {
            assert_eq!(node.id, format!("cmn_{i}"));
        }
    }
}

mod multi_layer_tests {
    use super::*;

    #[test]
    fn test_single_layer_obstacle_does_not_suppress_multi_layer_nodes() {
        // The sole coarse seed lands on a tiny layer-0 obstacle and covers
        // the whole board with a single-layer rect on layer 1. The finer
        // grid must still produce full-stack nodes by carving that cover,
        // not end up tiling layer 0 alone.
        let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 2, 0.1).with_obstacle(
            Obstacle::on_z_layers(Rect::new(4.5, 4.5, 1.0, 1.0), vec![0]),
        );
        let options = SolverOptions::default().with_grid_sizes(vec![5.0, 2.5]);
        let (solver, nodes) = solve(board, options);

        assert!(solver.solved());
        assert!(
            nodes.iter().any(|n| n.available_z == vec![0, 1]),
            "expected full-stack nodes away from the layer-0 obstacle"
        );
        assert!(solver.store().invariants_hold());
    }
}

mod invariant_tests {
    use super::*;

    #[test]
    fn test_no_same_layer_overlap() {
        let board = Board::new(Bounds::new(0.0, 50.0, 0.0, 40.0), 4, 0.2)
            .with_obstacle(Obstacle::on_z_layers(
                Rect::new(10.0, 10.0, 8.0, 6.0),
                vec![0, 1],
            ))
            .with_obstacle(Obstacle::on_z_layers(
                Rect::new(30.0, 20.0, 6.0, 10.0),
                vec![2, 3],
            ));
        let (_, nodes) = solve(board, SolverOptions::default());

        for (i, a) in nodes.iter().enumerate() {
            for b in nodes.iter().skip(i + 1) {
                if shares_layer(&a.available_z, &b.available_z) {
                    assert!(
                        !rects_overlap(&node_rect(a), &node_rect(b), 1e-6),
                        "nodes {} and {} overlap on a shared layer",
                        a.id,
                        b.id
                    );
                }
            }
        }
    }

    #[test]
    fn test_nodes_avoid_obstacles() {
        let board = Board::new(Bounds::new(0.0, 100.0, 0.0, 100.0), 2, 0.2).with_obstacle(
            Obstacle::on_z_layers(Rect::new(40.0, 40.0, 20.0, 20.0), vec![0, 1]),
        );
        let obstacle = Rect::new(40.0, 40.0, 20.0, 20.0);
        let (_, nodes) = solve(board, SolverOptions::default());

        assert!(!nodes.is_empty());
        for node in &nodes {
            assert!(
                !rects_overlap(&node_rect(node), &obstacle, 0.001),
                "node {} intrudes into the obstacle",
                node.id
            );
        }
    }

    #[test]
    fn test_nodes_stay_within_bounds() {
        let board = Board::new(Bounds::new(-5.0, 25.0, -10.0, 10.0), 2, 0.1);
        let (_, nodes) = solve(board, SolverOptions::default());

        for node in &nodes {
            let r = node_rect(node);
            assert!(r.x >= -5.0 - 1e-6);
            assert!(r.y >= -10.0 - 1e-6);
            assert!(r.max_x() <= 25.0 + 1e-6);
            assert!(r.max_y() <= 10.0 + 1e-6);
        }
    }

    #[test]
    fn test_available_z_sorted_and_in_range() {
        let board = Board::new(Bounds::new(0.0, 30.0, 0.0, 30.0), 5, 0.15).with_obstacle(
            Obstacle::on_z_layers(Rect::new(5.0, 5.0, 10.0, 3.0), vec![1, 2]),
        );
        let (_, nodes) = solve(board, SolverOptions::default());

        for node in &nodes {
            assert!(!node.available_z.is_empty());
            assert!(node.available_z.windows(2).all(|w| w[0] < w[1]));
            assert!(node.available_z.iter().all(|&z| z < 5));
        }
    }

    // Gap-fill slivers are intentionally allowed below the floors, so the
    // floor property is checked with gap fill off.
    #[test]
    fn test_size_floors_respected() {
        let board = Board::new(Bounds::new(0.0, 40.0, 0.0, 40.0), 3, 0.25);
        let options = SolverOptions::default()
            .with_min_single(1.0)
            .with_min_multi(2, 2.0)
            .with_gap_fill_passes(0);
        let (_, nodes) = solve(board, options);

        for node in &nodes {
            let floor = if node.available_z.len() >= 2 { 2.0 } else { 1.0 };
            assert!(
                node.width >= floor - 1e-6 && node.height >= floor - 1e-6,
                "node {} ({} x {}) under the {} floor",
                node.id,
                node.width,
                node.height,
                floor
            );
        }
    }
}

mod gap_fill_tests {
    use super::*;

    // Two tall obstacles leave a central corridor that grid seeding tends
    // to tile loosely; gap fill must close the remaining slivers enough
    // that coverage stays high.
    #[test]
    fn test_corridor_between_obstacles_is_covered() {
        let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 2, 0.1)
            .with_obstacle(Obstacle::on_z_layers(
                Rect::new(2.0, 1.0, 2.0, 8.0),
                vec![0, 1],
            ))
            .with_obstacle(Obstacle::on_z_layers(
                Rect::new(8.0, 1.0, 2.0, 8.0),
                vec![0, 1],
            ));
        let (solver, nodes) = solve(board, SolverOptions::default());

        assert!(!nodes.is_empty());

        // Some node must land inside the corridor between the obstacles.
        assert!(
            nodes.iter().any(|n| {
                let r = node_rect(n);
                r.x >= 4.0 - 1e-6 && r.max_x() <= 8.0 + 1e-6 && r.width > 0.5
            }),
            "no node covers the corridor between the obstacles"
        );

        // Free area per layer: 100 - 16 - 4 (x < 2 strip is free; obstacles
        // cover 2x8 twice). Coverage of the free area should be substantial.
        let output = solver.output();
        let free_area = 2.0 * (100.0 - 32.0);
        assert!(
            output.covered_area / free_area > 0.5,
            "coverage too low: {:.3}",
            output.covered_area / free_area
        );
    }

    #[test]
    fn test_gap_fill_can_be_disabled() {
        let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 1, 0.1);
        let options = SolverOptions::default().with_gap_fill_passes(0);
        let (solver, nodes) = solve(board, options);

        assert!(solver.solved());
        assert!(!nodes.is_empty());
    }
}

mod stepping_tests {
    use super::*;

    #[test]
    fn test_terminates_within_step_budget() {
        // Coordinates with messy fractional parts; the solver must still
        // converge in a bounded number of steps.
        let board = Board::new(Bounds::new(0.127, 33.419, -7.003, 21.771), 3, 0.201)
            .with_obstacle(Obstacle::on_z_layers(
                Rect::new(5.551, 2.003, 7.777, 3.333),
                vec![0],
            ))
            .with_obstacle(Obstacle::on_z_layers(
                Rect::new(20.101, -3.909, 4.444, 9.099),
                vec![1, 2],
            ));
        let mut solver = RectDiffSolver::new(board, SolverOptions::default()).unwrap();
        solver
            .solve_with_limit(50_000)
            .expect("solver exceeded its step budget");
        assert!(solver.solved());
    }

    #[test]
    fn test_progress_monotone_and_bounded() {
        let board = Board::new(Bounds::new(0.0, 20.0, 0.0, 20.0), 2, 0.1).with_obstacle(
            Obstacle::on_z_layers(Rect::new(8.0, 8.0, 4.0, 4.0), vec![0, 1]),
        );
        let mut solver = RectDiffSolver::new(board, SolverOptions::default()).unwrap();

        let mut last = solver.progress();
        while !solver.solved() {
            solver.step();
            let p = solver.progress();
            assert!((0.0..=1.0).contains(&p));
            assert!(p >= last, "progress went backwards: {p} < {last}");
            last = p;
        }
        assert_eq!(solver.progress(), 1.0);
    }

    #[test]
    fn test_output_idempotent_after_done() {
        let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 2, 0.1);
        let mut solver = RectDiffSolver::new(board, SolverOptions::default()).unwrap();
        solver.solve().unwrap();

        let first = solver.output();
        solver.step();
        solver.step();
        let second = solver.output();

        assert_eq!(first.mesh_nodes, second.mesh_nodes);
        assert_eq!(first.steps, second.steps);
        assert!(second.solved);
    }

    #[test]
    fn test_partial_output_is_a_preview() {
        let board = Board::new(Bounds::new(0.0, 20.0, 0.0, 20.0), 2, 0.1);
        let mut solver = RectDiffSolver::new(board, SolverOptions::default()).unwrap();

        for _ in 0..5 {
            solver.step();
        }
        let preview = solver.output();
        assert!(!preview.solved);
        assert!(preview.steps == 5);
    }
}

mod outline_tests {
    use super::*;

    #[test]
    fn test_outline_restricts_seeding() {
        // Triangular outline inside square bounds; candidates outside the
        // triangle are rejected at seeding time, so the triangle interior
        // must end up covered.
        let board = Board::new(Bounds::new(0.0, 20.0, 0.0, 20.0), 1, 0.1)
            .with_outline(vec![(0.0, 0.0), (20.0, 0.0), (10.0, 20.0)]);
        let (solver, nodes) = solve(board, SolverOptions::default());

        assert!(solver.solved());
        assert!(!nodes.is_empty());
        assert!(
            nodes
                .iter()
                .any(|n| node_rect(n).contains_point(10.0, 5.0)),
            "triangle interior left uncovered"
        );
    }
}

mod layer_name_tests {
    use super::*;

    #[test]
    fn test_named_obstacle_layers_resolve_canonically() {
        let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 4, 0.1)
            .with_obstacle(Obstacle::on_layers(
                Rect::new(1.0, 1.0, 8.0, 8.0),
                vec!["bottom"],
            ));
        let (_, nodes) = solve(board, SolverOptions::default());

        // The large obstacle covers most of the bottom layer (index 3);
        // nodes on that layer must avoid it.
        let obstacle = Rect::new(1.0, 1.0, 8.0, 8.0);
        for node in nodes.iter().filter(|n| n.available_z.contains(&3)) {
            assert!(!rects_overlap(&node_rect(node), &obstacle, 1e-6));
        }
    }

    #[test]
    fn test_layer_labels_in_output() {
        let board = Board::new(Bounds::new(0.0, 10.0, 0.0, 10.0), 3, 0.1);
        let (_, nodes) = solve(board, SolverOptions::default());

        for node in &nodes {
            let z = node.available_z[0];
            let expected = match z {
                0 => "top".to_owned(),
                2 => "bottom".to_owned(),
                n => format!("inner{n}"),
            };
            assert_eq!(node.layer, expected);
        }
    }
}
