// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use jacobi_relax::core::GridData;
use jacobi_relax::partition::make_blocks;
use jacobi_relax::scheduler::{threshold_for, RelaxSolver};
use jacobi_relax::RelaxError;

/// Plain single-buffer Jacobi iteration with the same stopping rule, used as
/// an independent reference. Returns the grid and the number of sweeps.
fn reference_jacobi(n: usize, threshold: f64) -> (Vec<f64>, u64) {
    let mut grid = vec![0.0_f64; n * n];
    for i in 0..n {
        grid[i] = 1.0;
        grid[i * n] = 1.0;
    }

    let mut sweeps = 0;
    loop {
        sweeps += 1;
        let mut next = grid.clone();
        let mut changed = false;
        for r in 1..n - 1 {
            for c in 1..n - 1 {
                let i = r * n + c;
                let v = (grid[i - n] + grid[i + 1] + grid[i + n] + grid[i - 1]) / 4.0;
                if (v - grid[i]).abs() > threshold {
                    changed = true;
                }
                next[i] = v;
            }
        }
        if !changed {
            return (grid, sweeps);
        }
        grid = next;
    }
}

/// Test 1: Small grid against its fixed point.
/// N=4, p=2. By symmetry the interior fixed point is
/// (1,1)=0.75, (1,2)=(2,1)=0.5, (2,2)=0.25.
#[test]
fn small_grid_reaches_fixed_point() {
    let solver = RelaxSolver::new(4, 2, 2).unwrap();
    let report = solver.solve(None).unwrap();
    assert!(report.cycles < 50, "took {} cycles", report.cycles);
    assert_eq!(report.commits + 1, report.cycles);

    let arr = solver.grid().to_array();
    let expected = [
        ([1, 1], 0.75),
        ([1, 2], 0.5),
        ([2, 1], 0.5),
        ([2, 2], 0.25),
    ];
    for (idx, want) in expected {
        let got = arr[idx];
        assert!(
            (got - want).abs() < 0.05,
            "cell {:?} = {} (expected ~{})",
            idx,
            got,
            want
        );
    }
}

/// Test 2: Minimum grid.
/// N=3, W=1: one block [3, 5]; index 4 is the only relaxable cell. Its
/// neighbours never change, so it settles on 0.5 in the first compute phase,
/// is committed once, and the second compute phase sees no change.
#[test]
fn minimum_grid_single_worker() {
    let blocks = make_blocks(3, 1).unwrap();
    assert_eq!(blocks[0].start(), 3);
    assert_eq!(blocks[0].end(), Some(5));

    let solver = RelaxSolver::new(3, 8, 1).unwrap();
    let report = solver.solve(None).unwrap();
    assert_eq!(report.commits, 1);
    assert_eq!(report.cycles, 2);
    assert_eq!(
        solver.grid().to_vec(),
        vec![1.0, 1.0, 1.0, 1.0, 0.5, 0.0, 1.0, 0.0, 0.0]
    );
}

/// Test 3: Boundary invariance.
/// Stop the run after 1..=6 cycles and check that the first row and column
/// still hold 1.0 and the last column and last row still hold their
/// initial values.
#[test]
fn boundary_cells_never_change() {
    let n = 9;
    for limit in 1..=6 {
        let solver = RelaxSolver::new(n, 6, 3)
            .unwrap()
            .with_max_cycles(limit)
            .unwrap();
        assert!(matches!(
            solver.solve(None),
            Err(RelaxError::MaxCyclesExceeded { .. })
        ));

        let grid = solver.grid();
        for i in 0..n {
            assert_eq!(grid.get(i), 1.0, "top row, col {}", i);
            assert_eq!(grid.get(i * n), 1.0, "left column, row {}", i);
        }
        for i in 1..n {
            assert_eq!(grid.get(i * n + n - 1), 0.0, "right column, row {}", i);
            assert_eq!(grid.get((n - 1) * n + i), 0.0, "bottom row, col {}", i);
        }
    }
}

/// Test 4: Determinism across worker counts.
/// Every cell is computed from the same committed grid whatever the block
/// layout, so all worker counts produce bit-identical results.
#[test]
fn result_independent_of_worker_count() {
    let n = 20;
    let p = 4;

    let baseline = RelaxSolver::new(n, p, 1).unwrap();
    let base_report = baseline.solve_sequential(None).unwrap();
    let expected = baseline.grid().to_vec();

    for workers in [1, 2, 3, 5, 8, 13, 64] {
        let solver = RelaxSolver::new(n, p, workers).unwrap();
        let report = solver.solve(None).unwrap();
        assert_eq!(report.cycles, base_report.cycles, "workers={}", workers);
        assert_eq!(solver.grid().to_vec(), expected, "workers={}", workers);
    }
}

/// Test 5: Agreement with a plain Jacobi sweep.
#[test]
fn matches_reference_jacobi() {
    for (n, p) in [(5, 3), (10, 4), (16, 3)] {
        let (reference, sweeps) = reference_jacobi(n, threshold_for(p));
        let solver = RelaxSolver::new(n, p, 4).unwrap();
        let report = solver.solve(None).unwrap();
        assert_eq!(report.cycles, sweeps, "n={} p={}", n, p);

        let got = solver.grid().to_vec();
        let max_diff = got
            .iter()
            .zip(&reference)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        assert!(max_diff < 1e-12, "n={} p={} max diff {}", n, p, max_diff);
    }
}

/// Test 6: Idempotence at the fixed point.
/// One more sweep over the converged grid moves no cell beyond the threshold,
/// and every value stays within the boundary range [0, 1].
#[test]
fn converged_grid_is_stable() {
    let n = 24;
    let p = 5;
    let threshold = threshold_for(p);
    let solver = RelaxSolver::new(n, p, 6).unwrap();
    solver.solve(None).unwrap();

    let grid = solver.grid();
    for r in 1..n - 1 {
        for c in 1..n - 1 {
            let i = r * n + c;
            let avg = (grid.get(i - n) + grid.get(i + 1) + grid.get(i + n) + grid.get(i - 1)) / 4.0;
            assert!(
                (avg - grid.get(i)).abs() <= threshold,
                "cell ({}, {}) still moving",
                r,
                c
            );
            assert!((0.0..=1.0).contains(&grid.get(i)));
        }
    }
}

/// Test 7: Degenerate configurations fail up front.
#[test]
fn invalid_configuration() {
    let too_small = RelaxSolver::new(2, 3, 4);
    assert!(matches!(
        too_small,
        Err(RelaxError::InvalidConfiguration {
            parameter: "grid size",
            value: 2,
            ..
        })
    ));

    let no_workers = RelaxSolver::new(10, 3, 0);
    assert!(matches!(
        no_workers,
        Err(RelaxError::InvalidConfiguration {
            parameter: "worker count",
            value: 0,
            ..
        })
    ));

    assert!(matches!(
        make_blocks(2, 1),
        Err(RelaxError::InvalidConfiguration { .. })
    ));
}
