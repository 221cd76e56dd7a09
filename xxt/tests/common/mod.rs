#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xxt::gallery::GlobalMatrix;
use xxt::{FactorConfig, HandleRegistry, Hypercube, MatrixAction, ThreadCluster, XxtError};

/// Dense local block, rows by local columns
pub struct DenseAction(pub Vec<Vec<f64>>);

impl MatrixAction for DenseAction {
    fn apply(&self, v: &[f64], out: &mut [f64]) {
        for (o, row) in out.iter_mut().zip(&self.0) {
            *o = row.iter().zip(v).map(|(a, b)| a * b).sum();
        }
    }
}

/// Solve `A·x = b` by Gaussian elimination (A is SPD, no pivoting needed)
pub fn dense_solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Vec<f64> {
    let n = b.len();
    for k in 0..n {
        for i in k + 1..n {
            let factor = a[i][k] / a[k][k];
            for j in k..n {
                a[i][j] -= factor * a[k][j];
            }
            b[i] -= factor * b[k];
        }
    }
    let mut x = vec![0.0; n];
    for k in (0..n).rev() {
        let tail: f64 = (k + 1..n).map(|j| a[k][j] * x[j]).sum();
        x[k] = (b[k] - tail) / a[k][k];
    }
    x
}

/// Random sparse SPD matrix: symmetric band pattern, diagonally dominant
pub fn random_spd(n: usize, bandwidth: usize, seed: u64) -> GlobalMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows: Vec<Vec<(u64, f64)>> = vec![Vec::new(); n];
    let mut diagonal = vec![1.0; n];

    for i in 0..n {
        for j in i + 1..(i + 1 + bandwidth).min(n) {
            if rng.gen_bool(0.6) {
                let value: f64 = rng.gen_range(-1.0..1.0);
                rows[i].push((j as u64, value));
                rows[j].push((i as u64, value));
                diagonal[i] += value.abs();
                diagonal[j] += value.abs();
            }
        }
    }
    for (i, row) in rows.iter_mut().enumerate() {
        row.push((i as u64, diagonal[i]));
        row.sort_by_key(|&(col, _)| col);
    }
    GlobalMatrix::from_rows(rows)
}

/// Largest entry-wise difference
pub fn max_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Factor `matrix` on `processes` ranks and solve for every right-hand side
///
/// Returns one assembled global solution per right-hand side.
pub fn solve_distributed(
    matrix: &GlobalMatrix,
    processes: usize,
    owner: impl Fn(u64) -> usize + Sync,
    config: FactorConfig,
    rhs: &[Vec<f64>],
) -> Result<Vec<Vec<f64>>, XxtError> {
    let pieces = ThreadCluster::new(processes).run(|comm| {
        let problem = matrix.distribute(&owner, comm.rank());
        let registry = HandleRegistry::new();
        let mut solver = registry.create(comm).with_config(config.clone());
        let m = problem.m();
        solver.factor(&problem.local2global, problem.n, m, problem.matrix.clone())?;

        let mut solutions = Vec::with_capacity(rhs.len());
        for b in rhs {
            let mut x = vec![0.0; problem.n];
            solver.solve(&problem.restrict(b), &mut x)?;
            solutions.push(x);
        }
        solver.destroy()?;
        Ok::<_, XxtError>((problem.local2global[..problem.n].to_vec(), solutions))
    })?;

    let mut global = vec![vec![0.0; matrix.size()]; rhs.len()];
    for piece in pieces {
        let (owned, solutions) = piece?;
        for (x, local) in global.iter_mut().zip(solutions) {
            for (&gid, value) in owned.iter().zip(local) {
                x[gid as usize] = value;
            }
        }
    }
    Ok(global)
}

/// Reference solution and distributed solution of `matrix·x = b`
pub fn compare(
    matrix: &GlobalMatrix,
    processes: usize,
    owner: impl Fn(u64) -> usize + Sync,
    b: Vec<f64>,
) -> f64 {
    let expected = dense_solve(matrix.to_dense(), b.clone());
    let solved = solve_distributed(matrix, processes, owner, FactorConfig::default(), &[b])
        .expect("distributed solve failed");
    max_diff(&solved[0], &expected)
}
