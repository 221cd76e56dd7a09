mod common;

use common::{compare, dense_solve, max_diff, random_spd, solve_distributed};
use xxt::gallery::{block_owner, GlobalMatrix};
use xxt::FactorConfig;

#[test]
fn test_laplacian_1d_on_power_of_two_clusters() {
    let n = 32;
    let matrix = GlobalMatrix::laplacian_1d(n);
    let b: Vec<f64> = (0..n).map(|i| 1.0 + (i % 5) as f64).collect();

    for processes in [1, 2, 4, 8] {
        let error = compare(&matrix, processes, block_owner(n, processes), b.clone());
        assert!(error < 1e-10, "P={processes}: error {error}");
    }
}

#[test]
fn test_one_unknown_per_process() {
    for processes in [2, 4, 8] {
        let matrix = GlobalMatrix::laplacian_1d(processes);
        let b = vec![1.0; processes];
        let error = compare(&matrix, processes, block_owner(processes, processes), b);
        assert!(error < 1e-12, "P={processes}: error {error}");
    }
}

#[test]
fn test_laplacian_2d_strips() {
    let (nx, ny) = (8, 8);
    let matrix = GlobalMatrix::laplacian_2d(nx, ny);
    let b: Vec<f64> = (0..nx * ny).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();

    for processes in [1, 2, 4, 8] {
        let error = compare(&matrix, processes, block_owner(nx * ny, processes), b.clone());
        assert!(error < 1e-10, "P={processes}: error {error}");
    }
}

#[test]
fn test_laplacian_2d_interleaved_owners() {
    // Columns dealt round-robin: every process borders every other one
    let (nx, ny) = (8, 6);
    let matrix = GlobalMatrix::laplacian_2d(nx, ny);
    let b = vec![1.0; nx * ny];
    let owner = move |gid: u64| (gid as usize % nx) % 4;

    let error = compare(&matrix, 4, owner, b);
    assert!(error < 1e-10, "error {error}");
}

#[test]
fn test_random_spd() {
    for (seed, processes) in [(7, 2), (11, 4), (23, 8)] {
        let n = 40;
        let matrix = random_spd(n, 4, seed);
        let b: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();
        let error = compare(&matrix, processes, block_owner(n, processes), b);
        assert!(error < 1e-9, "seed {seed}, P={processes}: error {error}");
    }
}

#[test]
fn test_linearity_without_refactoring() {
    let n = 24;
    let matrix = GlobalMatrix::laplacian_1d(n);
    let b1: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let b2: Vec<f64> = (0..n).map(|i| ((i * 3) % 7) as f64).collect();
    let (alpha, beta) = (2.5, -0.75);
    let combined: Vec<f64> = b1.iter().zip(&b2).map(|(x, y)| alpha * x + beta * y).collect();

    let solutions = solve_distributed(
        &matrix,
        4,
        block_owner(n, 4),
        FactorConfig::default(),
        &[b1, b2, combined],
    )
    .unwrap();

    let expected: Vec<f64> = solutions[0]
        .iter()
        .zip(&solutions[1])
        .map(|(x, y)| alpha * x + beta * y)
        .collect();
    assert!(max_diff(&solutions[2], &expected) < 1e-10);
}

#[test]
fn test_repeated_solves_are_bit_identical() {
    let n = 30;
    let matrix = random_spd(n, 3, 5);
    let b: Vec<f64> = (0..n).map(|i| 1.0 / (1.0 + i as f64)).collect();

    let solutions = solve_distributed(
        &matrix,
        4,
        block_owner(n, 4),
        FactorConfig::default(),
        &[b.clone(), b.clone(), b],
    )
    .unwrap();

    assert_eq!(solutions[0], solutions[1]);
    assert_eq!(solutions[1], solutions[2]);
}

#[test]
fn test_small_initial_capacity_gives_same_answer() {
    let n = 20;
    let matrix = GlobalMatrix::laplacian_1d(n);
    let b = vec![1.0; n];

    let grown = solve_distributed(
        &matrix,
        2,
        block_owner(n, 2),
        FactorConfig::default().with_initial_capacity(1),
        &[b.clone()],
    )
    .unwrap();
    let expected = dense_solve(matrix.to_dense(), b);
    assert!(max_diff(&grown[0], &expected) < 1e-10);
}
