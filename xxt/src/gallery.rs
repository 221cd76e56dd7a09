//! Distributed test operators
//!
//! Small sparse SPD matrices held globally and cut into per-process pieces
//! in the layout the solver expects: owned dofs first in ascending global
//! order, then the ghosts referenced by the owned rows.

use hashbrown::HashMap;
use xxt_core::MatrixAction;

/// Process-local CSR block: owned rows by local columns
#[derive(Debug, Clone, PartialEq)]
pub struct LocalCsr {
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl LocalCsr {
    /// Number of rows
    pub fn rows(&self) -> usize {
        self.row_ptr.len().saturating_sub(1)
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

impl MatrixAction for LocalCsr {
    fn apply(&self, v: &[f64], out: &mut [f64]) {
        for (row, o) in out.iter_mut().enumerate() {
            let range = self.row_ptr[row]..self.row_ptr[row + 1];
            *o = self.col_idx[range.clone()]
                .iter()
                .zip(&self.values[range])
                .map(|(&col, a)| a * v[col])
                .sum();
        }
    }
}

/// The identity on owned dofs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl MatrixAction for Identity {
    fn apply(&self, v: &[f64], out: &mut [f64]) {
        out.copy_from_slice(&v[..out.len()]);
    }
}

/// One process's piece of a distributed operator
#[derive(Debug, Clone, PartialEq)]
pub struct DistributedProblem {
    /// Owned dofs, then ghosts
    pub local2global: Vec<u64>,
    /// Number of owned dofs
    pub n: usize,
    /// Owned rows in local column numbering
    pub matrix: LocalCsr,
}

impl DistributedProblem {
    /// Number of local dofs
    pub fn m(&self) -> usize {
        self.local2global.len()
    }

    /// Owned entries of a global vector
    pub fn restrict(&self, global: &[f64]) -> Vec<f64> {
        self.local2global[..self.n]
            .iter()
            .map(|&gid| global[gid as usize])
            .collect()
    }
}

/// Contiguous balanced blocks of `n_global` dofs over `processes` owners
pub fn block_owner(n_global: usize, processes: usize) -> impl Fn(u64) -> usize + Copy {
    move |gid| (gid as usize * processes) / n_global.max(1)
}

/// Sparse matrix with every row available, used to build test problems
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalMatrix {
    rows: Vec<Vec<(u64, f64)>>,
}

impl GlobalMatrix {
    /// Matrix from its rows as `(column, value)` lists
    pub fn from_rows(rows: Vec<Vec<(u64, f64)>>) -> Self {
        Self { rows }
    }

    /// `tridiag(-1, 2, -1)` of size `n`
    pub fn laplacian_1d(n: usize) -> Self {
        let rows = (0..n as u64)
            .map(|i| {
                let mut row = Vec::with_capacity(3);
                if i > 0 {
                    row.push((i - 1, -1.0));
                }
                row.push((i, 2.0));
                if i + 1 < n as u64 {
                    row.push((i + 1, -1.0));
                }
                row
            })
            .collect();
        Self { rows }
    }

    /// Five-point Laplacian on an `nx × ny` grid, row-major numbering
    pub fn laplacian_2d(nx: usize, ny: usize) -> Self {
        let (nx, ny) = (nx as u64, ny as u64);
        let mut rows = Vec::with_capacity((nx * ny) as usize);
        for y in 0..ny {
            for x in 0..nx {
                let id = y * nx + x;
                let mut row = Vec::with_capacity(5);
                if y > 0 {
                    row.push((id - nx, -1.0));
                }
                if x > 0 {
                    row.push((id - 1, -1.0));
                }
                row.push((id, 4.0));
                if x + 1 < nx {
                    row.push((id + 1, -1.0));
                }
                if y + 1 < ny {
                    row.push((id + nx, -1.0));
                }
                rows.push(row);
            }
        }
        Self { rows }
    }

    /// Number of rows
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Entries of row `i`
    pub fn row(&self, i: usize) -> &[(u64, f64)] {
        &self.rows[i]
    }

    /// `A·x`
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|&(col, a)| a * x[col as usize]).sum())
            .collect()
    }

    /// Dense copy, row-major
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| {
                let mut dense = vec![0.0; self.size()];
                for &(col, a) in row {
                    dense[col as usize] += a;
                }
                dense
            })
            .collect()
    }

    /// Piece of the matrix owned by `rank` under `owner`
    pub fn distribute(&self, owner: impl Fn(u64) -> usize, rank: usize) -> DistributedProblem {
        let owned: Vec<u64> = (0..self.size() as u64)
            .filter(|&gid| owner(gid) == rank)
            .collect();

        let mut ghosts: Vec<u64> = owned
            .iter()
            .flat_map(|&gid| self.rows[gid as usize].iter().map(|&(col, _)| col))
            .filter(|&col| owner(col) != rank)
            .collect();
        ghosts.sort_unstable();
        ghosts.dedup();

        let n = owned.len();
        let mut local2global = owned;
        local2global.extend(ghosts);
        let lookup: HashMap<u64, usize> = local2global
            .iter()
            .enumerate()
            .map(|(index, &gid)| (gid, index))
            .collect();

        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for &gid in &local2global[..n] {
            for &(col, a) in &self.rows[gid as usize] {
                if let Some(&local) = lookup.get(&col) {
                    col_idx.push(local);
                    values.push(a);
                }
            }
            row_ptr.push(col_idx.len());
        }

        DistributedProblem {
            local2global,
            n,
            matrix: LocalCsr {
                row_ptr,
                col_idx,
                values,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_owner() {
        let owner = block_owner(6, 4);
        let owners: Vec<usize> = (0..6).map(owner).collect();
        assert_eq!(owners, vec![0, 0, 1, 2, 2, 3]);
    }

    #[test]
    fn test_distribute_1d() {
        let matrix = GlobalMatrix::laplacian_1d(6);
        let problem = matrix.distribute(block_owner(6, 2), 1);
        assert_eq!(problem.local2global, vec![3, 4, 5, 2]);
        assert_eq!(problem.n, 3);
        assert_eq!(problem.matrix.rows(), 3);
        assert_eq!(problem.matrix.nnz(), 8);

        let mut out = [0.0; 3];
        problem.matrix.apply(&[1.0, 2.0, 3.0, 10.0], &mut out);
        assert_eq!(out, [2.0 - 10.0 - 2.0, -1.0 + 4.0 - 3.0, -2.0 + 6.0]);
    }

    #[test]
    fn test_laplacian_2d() {
        let matrix = GlobalMatrix::laplacian_2d(3, 2);
        assert_eq!(matrix.size(), 6);
        assert_eq!(matrix.row(0), &[(0, 4.0), (1, -1.0), (3, -1.0)]);
        assert_eq!(matrix.apply(&[1.0; 6]), vec![2.0, 1.0, 2.0, 2.0, 1.0, 2.0]);

        let dense = matrix.to_dense();
        for (i, row) in dense.iter().enumerate() {
            for (j, a) in row.iter().enumerate() {
                assert_eq!(*a, dense[j][i]);
            }
        }
    }

    #[test]
    fn test_restrict_and_identity() {
        let matrix = GlobalMatrix::laplacian_1d(4);
        let problem = matrix.distribute(block_owner(4, 2), 1);
        assert_eq!(problem.restrict(&[0.0, 1.0, 2.0, 3.0]), vec![2.0, 3.0]);

        let mut out = [0.0; 2];
        Identity.apply(&[5.0, 6.0, 7.0], &mut out);
        assert_eq!(out, [5.0, 6.0]);
    }
}
