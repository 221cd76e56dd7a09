//! Applying the factorization
//!
//! `x = X·(Xᵗ·b)`: local window dots, a segmented sum that widens by one
//! hypercube dimension per separator level, then a local accumulation.

use xxt_core::{validate_vector_len, FactorStore, Hypercube, Result, SubCube};

/// Overwrite `x` (holding b on entry) with `X·Xᵗ·b`
///
/// `uu` is scratch space with one entry per stored column. Collective over
/// `cube`, which must be the cube the factor was generated on.
pub fn solve_in_place<C: Hypercube>(
    comm: &C,
    store: &FactorStore,
    cube: SubCube,
    uu: &mut [f64],
    x: &mut [f64],
) -> Result<()> {
    validate_vector_len(store.rows(), x.len())?;
    validate_vector_len(store.num_columns(), uu.len())?;

    store.project(x, uu)?;
    if cube.dim() > 0 {
        comm.segmented_sum(uu, store.stages(), cube)?;
    }

    x.fill(0.0);
    store.accumulate(uu, x)
}
