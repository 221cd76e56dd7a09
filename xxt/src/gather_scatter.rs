//! Gather-scatter over shared global ids
//!
//! Each round of the recursive doubling swaps the `(gid, value)` pairs known
//! so far with the partner across one hypercube edge and merges them by id.
//! After `dim` rounds every process of the sub-cube holds, for each id it
//! references, the combination of all contributions in that sub-cube.
//!
//! Once `restrict_to_shared` has run, only ids referenced by more than one
//! process travel; the rest are combined locally.

use hashbrown::HashMap;
use xxt_core::{validate_vector_len, GatherScatter, Hypercube, ReduceOp, Result, SubCube, XxtError};

/// Gather-scatter handle built from a `local2global` map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsHandle {
    /// Unique ids in order of first appearance
    gids: Vec<u64>,
    /// Unique-id slot of every local entry
    slots: Vec<usize>,
    /// Whether a unique id may be referenced by another process
    shared: Vec<bool>,
}

impl GsHandle {
    /// Build the handle, merging local duplicates of the same id
    pub fn new(local2global: &[u64]) -> Self {
        let mut index: HashMap<u64, usize> = HashMap::with_capacity(local2global.len());
        let mut gids = Vec::new();
        let slots = local2global
            .iter()
            .map(|&gid| {
                *index.entry(gid).or_insert_with(|| {
                    gids.push(gid);
                    gids.len() - 1
                })
            })
            .collect();
        let shared = vec![true; gids.len()];

        Self {
            gids,
            slots,
            shared,
        }
    }

    /// Number of distinct ids referenced locally
    pub fn unique_len(&self) -> usize {
        self.gids.len()
    }

    /// Number of distinct ids exchanged with other processes
    pub fn shared_len(&self) -> usize {
        self.shared.iter().filter(|&&shared| shared).count()
    }

    /// Find the ids referenced by more than one process of `cube`
    ///
    /// Collective over `cube`. Later `gop` calls over `cube` or any of its
    /// sub-cubes exchange only those ids.
    pub fn restrict_to_shared<C: Hypercube>(&mut self, comm: &C, cube: SubCube) -> Result<usize> {
        let mut counts: HashMap<u64, f64> = self.gids.iter().map(|&gid| (gid, 1.0)).collect();
        merge_across(comm, &mut counts, ReduceOp::Sum, cube)?;

        for (shared, gid) in self.shared.iter_mut().zip(&self.gids) {
            *shared = counts.get(gid).is_some_and(|&count| count > 1.5);
        }
        Ok(self.shared_len())
    }

    /// Combine local duplicates into one value per unique id
    fn combine_local(&self, vals: &[f64], op: ReduceOp) -> Vec<f64> {
        let mut seen = vec![false; self.gids.len()];
        let mut local = vec![0.0; self.gids.len()];
        for (&slot, &value) in self.slots.iter().zip(vals) {
            local[slot] = if seen[slot] {
                op.combine(local[slot], value)
            } else {
                seen[slot] = true;
                value
            };
        }
        local
    }
}

impl GatherScatter for GsHandle {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn gop<C: Hypercube>(
        &self,
        comm: &C,
        vals: &mut [f64],
        op: ReduceOp,
        cube: SubCube,
    ) -> Result<()> {
        validate_vector_len(self.len(), vals.len())?;

        let local = self.combine_local(vals, op);
        let mut known: HashMap<u64, f64> = self
            .gids
            .iter()
            .zip(&local)
            .zip(&self.shared)
            .filter(|&(_, &shared)| shared)
            .map(|((&gid, &value), _)| (gid, value))
            .collect();
        merge_across(comm, &mut known, op, cube)?;

        for (val, &slot) in vals.iter_mut().zip(&self.slots) {
            *val = if self.shared[slot] {
                known.get(&self.gids[slot]).copied().unwrap_or(local[slot])
            } else {
                local[slot]
            };
        }
        Ok(())
    }
}

/// Recursive doubling over `cube`, merging partner pairs by id
fn merge_across<C: Hypercube>(
    comm: &C,
    known: &mut HashMap<u64, f64>,
    op: ReduceOp,
    cube: SubCube,
) -> Result<()> {
    for edge in 0..cube.dim() {
        let partner = SubCube::partner(comm.rank(), edge);
        let (ids, values): (Vec<u64>, Vec<f64>) = known.iter().map(|(&g, &v)| (g, v)).unzip();

        let their_ids = comm.exchange(partner, &ids)?;
        let their_values = comm.exchange(partner, &values)?;
        if their_ids.len() != their_values.len() {
            return Err(XxtError::MessageLength {
                expected: their_ids.len(),
                actual: their_values.len(),
            });
        }

        for (gid, value) in their_ids.into_iter().zip(their_values) {
            known
                .entry(gid)
                .and_modify(|mine| *mine = op.combine(*mine, value))
                .or_insert(value);
        }
    }
    Ok(())
}
