//! Matrix-vector binding
//!
//! Couples the client's `MatrixAction` with the process's dof map, so that the
//! factor loop can address dofs by global id and synchronise ghost values.

use hashbrown::HashMap;
use xxt_core::{validate_dof_map, validate_vector_len, Hypercube, MatrixAction, Result, SubCube};

use crate::gather_scatter::GsHandle;

/// Client operator bound to a `local2global` map
pub struct MatvecBinding {
    n: usize,
    m: usize,
    n_global: usize,
    local2global: Vec<u64>,
    lookup: HashMap<u64, usize>,
    gs: GsHandle,
    action: Box<dyn MatrixAction + Send>,
}

impl MatvecBinding {
    /// Bind `action` to the first `m` entries of `local2global`, `n` of them owned
    pub fn new(
        local2global: &[u64],
        n: usize,
        m: usize,
        action: Box<dyn MatrixAction + Send>,
    ) -> Result<Self> {
        validate_dof_map(local2global.len(), n, m)?;

        let local2global = local2global.to_vec();
        let mut lookup = HashMap::with_capacity(m);
        for (index, &gid) in local2global.iter().enumerate() {
            lookup.entry(gid).or_insert(index);
        }
        let gs = GsHandle::new(&local2global);

        Ok(Self {
            n,
            m,
            n_global: 0,
            local2global,
            lookup,
            gs,
            action,
        })
    }

    /// Owned dof count
    pub fn n(&self) -> usize {
        self.n
    }

    /// Local dof count (owned and ghost)
    pub fn m(&self) -> usize {
        self.m
    }

    /// Number of unique global dofs, known once separators are determined
    pub fn n_global(&self) -> usize {
        self.n_global
    }

    pub(crate) fn set_n_global(&mut self, n_global: usize) {
        self.n_global = n_global;
    }

    /// Global id of every local dof
    pub fn local2global(&self) -> &[u64] {
        &self.local2global
    }

    /// Global ids of the owned dofs
    pub fn owned(&self) -> &[u64] {
        &self.local2global[..self.n]
    }

    /// First local index referencing `gid`
    pub fn local_index(&self, gid: u64) -> Option<usize> {
        self.lookup.get(&gid).copied()
    }

    /// Local index of `gid` if it is owned here
    pub fn owned_index(&self, gid: u64) -> Option<usize> {
        self.local_index(gid).filter(|&index| index < self.n)
    }

    /// Gather-scatter handle over the dof map
    pub fn gs(&self) -> &GsHandle {
        &self.gs
    }

    /// Limit ghost exchanges to ids some other process of `cube` references
    ///
    /// Collective over `cube`; returns the number of such ids held here.
    pub fn restrict_exchange<C: Hypercube>(&mut self, comm: &C, cube: SubCube) -> Result<usize> {
        self.gs.restrict_to_shared(comm, cube)
    }

    /// `out = A·v` for the owned rows
    pub fn apply(&self, v: &[f64], out: &mut [f64]) -> Result<()> {
        validate_vector_len(self.m, v.len())?;
        validate_vector_len(self.n, out.len())?;
        self.action.apply(v, out);
        Ok(())
    }
}

impl std::fmt::Debug for MatvecBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatvecBinding")
            .field("n", &self.n)
            .field("m", &self.m)
            .field("n_global", &self.n_global)
            .field("local2global", &self.local2global)
            .finish_non_exhaustive()
    }
}
