//! Factor generation
//!
//! Builds the columns of X one at a time by A-orthogonal Gram–Schmidt in
//! separator order. Column `i` starts as the unit vector of the dof elected
//! for it, is projected against all earlier columns and normalised so that
//! `Xᵗ·A·X = I`. While the column counter stays inside level `l`, every
//! collective runs over SubCube(l) only.

use xxt_core::{
    GatherScatter, Hypercube, ReduceOp, Result, SeparatorInfo, SubCube, XxtError, FactorStore,
};

use crate::binding::MatvecBinding;
use crate::config::FactorConfig;

/// Generate the local slice of X for `binding` under the ordering `seps`
///
/// Collective over the full cube. Fails on every process of the affected
/// sub-cube when a pivot falls below the configured tolerance.
pub fn generate<C: Hypercube>(
    comm: &C,
    binding: &MatvecBinding,
    seps: &SeparatorInfo,
    config: &FactorConfig,
) -> Result<FactorStore> {
    let n = binding.n();
    let m = binding.m();
    let level = seps.level();
    let top = level as usize;
    let columns = seps.column_count();
    let segs = seps.column_segments();
    let lnsep = seps.lnsep();
    let fo = seps.firing_order();

    let capacity = config.capacity_for(
        binding.n_global(),
        n,
        columns,
        seps.replicated_count(),
        comm.size(),
    );
    let mut store = FactorStore::new(n, columns, capacity)?;

    // Ghost synchronisation is collective, so every process must agree on it
    let mut ghosts = [(m - n) as u64];
    comm.reduce(&mut ghosts, ReduceOp::Max, SubCube::new(level))?;
    let has_ghosts = ghosts[0] > 0;

    let mut stages = vec![0; top + 1];
    let mut dim = 0;
    let mut start = 0;
    let mut end = lnsep.first().copied().unwrap_or(0);
    let mut fired = 0;

    let mut v = vec![0.0; m];
    let mut u = vec![0.0; n];
    let mut z = vec![0.0; n];
    let mut uu = vec![0.0; columns];

    for i in 0..columns {
        while i == segs[dim] {
            if dim == top {
                return Err(XxtError::LevelOverflow { level });
            }
            stages[dim] = i;
            dim += 1;
            end += lnsep[dim];
        }
        stages[dim] = i;
        let cube = SubCube::new(dim as u32);

        let proposal = if start < end { fo[start] } else { u64::MAX };
        let mut elected = [proposal];
        comm.reduce(&mut elected, ReduceOp::Min, cube)?;
        let col = elected[0];

        if col == u64::MAX {
            log::warn!(
                "rank {}: no dof left to elect for column {} at dimension {}",
                comm.rank(),
                i,
                dim
            );
            store.push_empty();
            continue;
        }

        v.fill(0.0);
        if start < end && fo[start] == col {
            start += 1;
            fired += 1;
            let index = binding
                .owned_index(col)
                .ok_or(XxtError::MissingDof { global: col })?;
            v[index] = 1.0;
        } else if let Some(index) = binding.local_index(col) {
            v[index] = 1.0;
        }

        // Project out the earlier columns: v -= X·(Xᵗ·A·v)
        binding.apply(&v, &mut u)?;
        let coeffs = &mut uu[..i];
        store.project(&u, coeffs)?;
        comm.segmented_sum(coeffs, &stages, cube)?;

        z.fill(0.0);
        store.accumulate(coeffs, &mut z)?;
        v[n..].fill(0.0);
        for (vi, zi) in v.iter_mut().zip(&z) {
            *vi -= zi;
        }
        if has_ghosts {
            binding.gs().sum(comm, &mut v, cube)?;
        }

        binding.apply(&v, &mut u)?;
        let mut alpha = [v.iter().zip(&u).map(|(a, b)| a * b).sum::<f64>()];
        comm.reduce(&mut alpha, ReduceOp::Sum, cube)?;
        let alpha = alpha[0];

        // Also rejects negative and NaN pivots
        if !(alpha >= config.pivot_tolerance) {
            return Err(XxtError::BadPivot {
                column: i,
                pivot: alpha,
            });
        }

        let scale = 1.0 / alpha.sqrt();
        for vi in &mut v[..n] {
            *vi *= scale;
        }

        let doublings = store.doublings();
        store.push_column(&v[..n])?;
        if store.doublings() > doublings {
            log::debug!(
                "rank {}: factor buffer grown to {} values at column {}",
                comm.rank(),
                store.capacity(),
                i
            );
        }
    }

    stages[dim] = columns;
    while dim < top {
        dim += 1;
        stages[dim] = columns;
        log::warn!(
            "rank {}: disconnected sub-cube, dimension {} closed with no separator",
            comm.rank(),
            dim
        );
    }
    store.set_stages(stages);

    if fired != n {
        log::warn!(
            "rank {}: {} of {} owned dofs were never elected",
            comm.rank(),
            n - fired,
            n
        );
    }
    log::info!(
        "rank {}: generated {} columns, {} stored values (capacity {})",
        comm.rank(),
        columns,
        store.nnz(),
        store.capacity()
    );

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{SelfComm, ThreadCluster};
    use crate::gallery::{block_owner, GlobalMatrix};
    use crate::separators::determine_separators;
    use xxt_core::MatrixAction;

    fn dense(rows: Vec<Vec<f64>>) -> Box<dyn MatrixAction + Send> {
        Box::new(move |v: &[f64], out: &mut [f64]| {
            for (o, row) in out.iter_mut().zip(&rows) {
                *o = row.iter().zip(v).map(|(a, b)| a * b).sum();
            }
        })
    }

    fn factor_local(rows: Vec<Vec<f64>>, config: &FactorConfig) -> Result<FactorStore> {
        let n = rows.len();
        let map: Vec<u64> = (0..n as u64).collect();
        let mut binding = MatvecBinding::new(&map, n, n, dense(rows))?;
        let seps = determine_separators(&SelfComm, &mut binding, 0)?;
        generate(&SelfComm, &binding, &seps, config)
    }

    fn to_dense(store: &FactorStore) -> Vec<Vec<f64>> {
        let mut x = vec![vec![0.0; store.num_columns()]; store.rows()];
        for (k, (window, values)) in store.columns().enumerate() {
            for (row, value) in window.rows().zip(values) {
                x[row][k] = *value;
            }
        }
        x
    }

    #[test]
    fn test_xxt_is_inverse() {
        let store = factor_local(
            vec![vec![4.0, 1.0], vec![1.0, 3.0]],
            &FactorConfig::default(),
        )
        .unwrap();
        let x = to_dense(&store);

        let inverse = [[3.0 / 11.0, -1.0 / 11.0], [-1.0 / 11.0, 4.0 / 11.0]];
        for i in 0..2 {
            for j in 0..2 {
                let xxt: f64 = (0..2).map(|k| x[i][k] * x[j][k]).sum();
                assert!((xxt - inverse[i][j]).abs() < 1e-14);
            }
        }
        assert_eq!(store.stages(), &[2]);
        assert_eq!(store.column(0).unwrap().1, &[0.5]);
    }

    #[test]
    fn test_zero_operator_is_bad_pivot() {
        let result = factor_local(vec![vec![0.0; 2]; 2], &FactorConfig::default());
        assert_eq!(
            result,
            Err(XxtError::BadPivot {
                column: 0,
                pivot: 0.0
            })
        );
    }

    #[test]
    fn test_negative_pivot_is_rejected() {
        let result = factor_local(vec![vec![-1.0]], &FactorConfig::default());
        assert_eq!(
            result,
            Err(XxtError::BadPivot {
                column: 0,
                pivot: -1.0
            })
        );
    }

    #[test]
    fn test_small_capacity_grows() {
        let config = FactorConfig::default().with_initial_capacity(1);
        let rows = vec![
            vec![2.0, -1.0, 0.0],
            vec![-1.0, 2.0, -1.0],
            vec![0.0, -1.0, 2.0],
        ];
        let store = factor_local(rows, &config).unwrap();
        assert_eq!(store.num_columns(), 3);
        assert!(store.doublings() > 0);
        assert!(store.capacity() >= store.nnz());
    }

    #[test]
    fn test_two_process_stages_and_first_column() {
        let matrix = GlobalMatrix::laplacian_1d(6);
        let owner = block_owner(6, 2);
        let results = ThreadCluster::new(2)
            .run(|comm| {
                let problem = matrix.distribute(&owner, comm.rank());
                let m = problem.m();
                let mut binding = MatvecBinding::new(
                    &problem.local2global,
                    problem.n,
                    m,
                    Box::new(problem.matrix),
                )?;
                let seps = determine_separators(&comm, &mut binding, 1)?;
                generate(&comm, &binding, &seps, &FactorConfig::default())
            })
            .unwrap();

        let rank0 = results[0].as_ref().unwrap();
        let rank1 = results[1].as_ref().unwrap();
        assert_eq!(rank0.stages(), &[2, 3]);
        assert_eq!(rank1.stages(), &[3, 4]);
        assert_eq!(rank0.message_size(), 1);

        // The first column is e0 scaled by 1/sqrt(A00)
        let (window, values) = rank0.column(0).unwrap();
        assert_eq!(window.offset, 0);
        assert_eq!(window.len, 1);
        assert!((values[0] - 1.0 / 2.0_f64.sqrt()).abs() < 1e-15);
    }
}
