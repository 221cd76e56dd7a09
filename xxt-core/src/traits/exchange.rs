//! Gather-scatter interface
//!
//! A gather-scatter handle is built from a process's `local2global` map and
//! combines, for every global id, the values held by all processes of a
//! sub-cube that reference that id. Each participant receives the combined
//! value in every local slot mapped to the id.

use super::comm::{Hypercube, ReduceOp, SubCube};
use crate::Result;

/// Reduce-by-shared-global-id over a sub-cube
pub trait GatherScatter {
    /// Number of local entries the handle was built for
    fn len(&self) -> usize;

    /// Whether the handle covers no local entries
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combine `vals` across every process of `cube` sharing a global id
    fn gop<C: Hypercube>(&self, comm: &C, vals: &mut [f64], op: ReduceOp, cube: SubCube)
        -> Result<()>;

    /// Sum shared entries over `cube`
    fn sum<C: Hypercube>(&self, comm: &C, vals: &mut [f64], cube: SubCube) -> Result<()> {
        self.gop(comm, vals, ReduceOp::Sum, cube)
    }
}
