//! Client operator interface
//!
//! The solver never sees a concrete matrix type. It only needs the action of
//! the locally owned rows of A on a vector covering owned and ghost dofs.

/// Local matrix-vector product supplied by the client
pub trait MatrixAction {
    /// Compute the owned rows of `A·v`
    ///
    /// `v` has one entry per local dof (owned dofs first, then ghosts) and
    /// ghost entries already hold their owners' values. `out` has one entry
    /// per owned row and must be fully overwritten.
    fn apply(&self, v: &[f64], out: &mut [f64]);
}

impl<F> MatrixAction for F
where
    F: Fn(&[f64], &mut [f64]),
{
    fn apply(&self, v: &[f64], out: &mut [f64]) {
        self(v, out)
    }
}
