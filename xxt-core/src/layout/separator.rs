//! Nested separator ordering
//!
//! Level 0 holds the dofs private to one process, level `l` the separator of
//! the sub-cube of dimension `l`, and level `L = log2(P)` the separator that
//! splits the whole communicator. Dofs fire in that order: finest first,
//! root separator last.

use alloc::vec::Vec;

/// Which half of a sub-cube claimed the separator of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// Level 0, no partner involved
    Local,
    /// Low half of the sub-cube won the balance
    Low,
    /// High half of the sub-cube won the balance
    High,
    /// Dofs owned by several processes: both halves claim their copies
    Both,
}

/// Dofs claimed at one separator level by the calling process
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSeparator {
    /// Separator size over the level's sub-cube
    pub nsep: usize,
    /// Half that claimed the level
    pub side: Side,
    /// Global ids claimed by this process
    pub dofs: Vec<u64>,
}

impl LevelSeparator {
    /// Create a level record, sorting the claimed ids
    pub fn new(nsep: usize, side: Side, mut dofs: Vec<u64>) -> Self {
        dofs.sort_unstable();
        Self { nsep, side, dofs }
    }
}

/// Result of separator determination on one process
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SeparatorInfo {
    nsep: Vec<usize>,
    lnsep: Vec<usize>,
    sides: Vec<Side>,
    firing_order: Vec<u64>,
    level_offsets: Vec<usize>,
    n_global: usize,
    shared: bool,
}

impl SeparatorInfo {
    /// Assemble from per-level records indexed by level (0 = local)
    pub fn from_levels(levels: Vec<LevelSeparator>, n_global: usize, shared: bool) -> Self {
        let mut nsep = Vec::with_capacity(levels.len());
        let mut lnsep = Vec::with_capacity(levels.len());
        let mut sides = Vec::with_capacity(levels.len());
        let mut level_offsets = Vec::with_capacity(levels.len() + 1);
        let mut firing_order = Vec::new();

        level_offsets.push(0);
        for level in levels {
            nsep.push(level.nsep);
            lnsep.push(level.dofs.len());
            sides.push(level.side);
            firing_order.extend_from_slice(&level.dofs);
            level_offsets.push(firing_order.len());
        }

        Self {
            nsep,
            lnsep,
            sides,
            firing_order,
            level_offsets,
            n_global,
            shared,
        }
    }

    /// Top level `L`
    pub fn level(&self) -> u32 {
        self.nsep.len().saturating_sub(1) as u32
    }

    /// Separator size per level
    pub fn nsep(&self) -> &[usize] {
        &self.nsep
    }

    /// Locally claimed count per level
    pub fn lnsep(&self) -> &[usize] {
        &self.lnsep
    }

    /// Claiming half per level
    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    /// Owned global ids in elimination order
    pub fn firing_order(&self) -> &[u64] {
        &self.firing_order
    }

    /// Offsets of each level inside the firing order (length `L + 2`)
    pub fn level_offsets(&self) -> &[usize] {
        &self.level_offsets
    }

    /// Ids this process claimed at `level`
    pub fn level_dofs(&self, level: u32) -> &[u64] {
        let level = level as usize;
        match (self.level_offsets.get(level), self.level_offsets.get(level + 1)) {
            (Some(&start), Some(&end)) => &self.firing_order[start..end],
            _ => &[],
        }
    }

    /// Number of unique global dofs
    pub fn n_global(&self) -> usize {
        self.n_global
    }

    /// Whether some dof is owned by more than one process
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Number of owned dofs placed into some level
    pub fn owned_count(&self) -> usize {
        self.lnsep.iter().sum()
    }

    /// Number of factor columns this process takes part in
    pub fn column_count(&self) -> usize {
        self.nsep.iter().sum()
    }

    /// Separator dofs above level 0, which replicate across processes
    pub fn replicated_count(&self) -> usize {
        self.nsep.iter().skip(1).sum()
    }

    /// Prefix sums of `nsep`: the column index at which each level ends
    pub fn column_segments(&self) -> Vec<usize> {
        self.nsep
            .iter()
            .scan(0, |acc, &count| {
                *acc += count;
                Some(*acc)
            })
            .collect()
    }
}
