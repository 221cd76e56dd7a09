//! Separator determination
//!
//! Splits the owned dofs into `L + 1` levels top-down. At each hypercube
//! dimension the two halves of the current sub-cube probe which of their dofs
//! are referenced from the other half; those dofs form the separator of that
//! sub-cube. Whatever is never claimed stays private to its process.

use xxt_core::{
    GatherScatter, Hypercube, LevelSeparator, ReduceOp, Result, SeparatorInfo, Side, SubCube,
};

use crate::binding::MatvecBinding;

/// Difference between `Σ 1/mult` and `Σ mult` above which dofs count as shared
const MULTIPLICITY_EPS: f64 = 1.0e-14;

/// Rounding slack when turning a sum of reciprocals back into a count
const COUNT_SLACK: f64 = 0.1;

/// Compute the nested separator ordering of `binding`'s owned dofs
///
/// Collective over the full cube of dimension `level`. The returned
/// `SeparatorInfo` carries the number of unique global dofs, which is also
/// recorded on the binding.
pub fn determine_separators<C: Hypercube>(
    comm: &C,
    binding: &mut MatvecBinding,
    level: u32,
) -> Result<SeparatorInfo> {
    let exchanged = binding.restrict_exchange(comm, SubCube::new(level))?;
    let (n_global, shared) = probe_multiplicity(comm, binding, SubCube::new(level))?;
    binding.set_n_global(n_global);
    log::debug!(
        "rank {}: {} of {} local ids are exchanged",
        comm.rank(),
        exchanged,
        binding.gs().unique_len()
    );

    let mut used = vec![false; binding.n()];
    let mut levels = Vec::with_capacity(level as usize + 1);
    let mut id = comm.rank();

    for edge in (1..=level).rev() {
        let mask = 1usize << (edge - 1);
        let low = id < mask;
        let signal = probe_other_half(comm, binding, edge, low)?;

        let separator = if shared {
            claim_shared(comm, binding, &mut used, signal, edge, low)?
        } else {
            claim_exclusive(comm, binding, &mut used, &signal, edge, low)?
        };
        log::debug!(
            "rank {}: level {} separator of {} dofs ({:?}), {} claimed here",
            comm.rank(),
            edge,
            separator.nsep,
            separator.side,
            separator.dofs.len()
        );
        levels.push(separator);

        if id >= mask {
            id -= mask;
        }
    }

    let remaining = claim(binding.owned(), &mut used, |_| true);
    levels.push(LevelSeparator::new(remaining.len(), Side::Local, remaining));
    levels.reverse();

    Ok(SeparatorInfo::from_levels(levels, n_global, shared))
}

/// Count unique global dofs and detect dofs owned by several processes
fn probe_multiplicity<C: Hypercube>(
    comm: &C,
    binding: &MatvecBinding,
    full: SubCube,
) -> Result<(usize, bool)> {
    let n = binding.n();
    let mut mult = vec![0.0; binding.m()];
    mult[..n].fill(1.0);
    binding.gs().sum(comm, &mut mult, full)?;

    let mut sums = [0.0_f64; 2];
    for &k in mult[..n].iter().filter(|&&k| k != 0.0) {
        sums[0] += 1.0 / k;
        sums[1] += k;
    }
    comm.reduce(&mut sums, ReduceOp::Sum, full)?;

    let n_global = (sums[0] + COUNT_SLACK) as usize;
    let shared = (sums[0] - sums[1]).abs() > MULTIPLICITY_EPS;
    Ok((n_global, shared))
}

/// Non-zero on every local entry referenced from the other half of SubCube(edge)
fn probe_other_half<C: Hypercube>(
    comm: &C,
    binding: &MatvecBinding,
    edge: u32,
    low: bool,
) -> Result<Vec<f64>> {
    let cube = SubCube::new(edge);
    let m = binding.m();

    // High half fires, low half listens
    let mut lhs = vec![if low { 0.0 } else { 1.0 }; m];
    binding.gs().sum(comm, &mut lhs, cube)?;

    // Low half fires, high half listens
    let mut rhs = vec![if low { 1.0 } else { 0.0 }; m];
    binding.gs().sum(comm, &mut rhs, cube)?;

    Ok(if low { lhs } else { rhs })
}

/// Each dof has one owner: the half with more unclaimed dofs takes the separator
fn claim_exclusive<C: Hypercube>(
    comm: &C,
    binding: &MatvecBinding,
    used: &mut [bool],
    signal: &[f64],
    edge: u32,
    low: bool,
) -> Result<LevelSeparator> {
    let own = if low { 0 } else { 1 };

    // [low signal, high signal, low unclaimed, high unclaimed]
    let mut counts = [0_u64; 4];
    for (&is_used, &s) in used.iter().zip(signal) {
        if !is_used {
            counts[own + 2] += 1;
            if s != 0.0 {
                counts[own] += 1;
            }
        }
    }
    comm.reduce(&mut counts, ReduceOp::Sum, SubCube::new(edge))?;

    let low_wins = counts[2] >= counts[3];
    let (nsep, side) = if low_wins {
        (counts[0] as usize, Side::Low)
    } else {
        (counts[1] as usize, Side::High)
    };

    let dofs = if low == low_wins {
        claim(binding.owned(), used, |i| signal[i] != 0.0)
    } else {
        Vec::new()
    };
    Ok(LevelSeparator::new(nsep, side, dofs))
}

/// Dofs with several owners: both halves claim their copies of the separator
fn claim_shared<C: Hypercube>(
    comm: &C,
    binding: &MatvecBinding,
    used: &mut [bool],
    mut signal: Vec<f64>,
    edge: u32,
    low: bool,
) -> Result<LevelSeparator> {
    let n = binding.n();

    // Owner count inside the own half; ghosts do not own
    for (i, s) in signal.iter_mut().enumerate() {
        *s = if i < n && *s != 0.0 { 1.0 } else { 0.0 };
    }
    binding.gs().sum(comm, &mut signal, SubCube::new(edge - 1))?;

    let own = if low { 0 } else { 1 };
    let mut unique = [0.0_f64; 2];
    for (&is_used, &mult) in used.iter().zip(&signal[..n]) {
        if !is_used && mult != 0.0 {
            unique[own] += 1.0 / mult;
        }
    }
    comm.reduce(&mut unique, ReduceOp::Sum, SubCube::new(edge))?;

    let nsep = (unique[own] + COUNT_SLACK) as usize;
    let dofs = claim(binding.owned(), used, |i| signal[i] != 0.0);
    Ok(LevelSeparator::new(nsep, Side::Both, dofs))
}

/// Mark and return the unclaimed owned dofs selected by `pick`
fn claim(owned: &[u64], used: &mut [bool], pick: impl Fn(usize) -> bool) -> Vec<u64> {
    owned
        .iter()
        .zip(used.iter_mut())
        .enumerate()
        .filter_map(|(i, (&gid, is_used))| {
            if !*is_used && pick(i) {
                *is_used = true;
                Some(gid)
            } else {
                None
            }
        })
        .collect()
}
