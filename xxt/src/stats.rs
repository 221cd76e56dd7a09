//! Factorization statistics gathered across processes

use std::fmt;

use xxt_core::{Hypercube, ReduceOp, Result, SubCube};

/// Minimum, maximum and mean of one quantity over all processes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl Summary {
    /// Summarise each entry of `local` over `cube`
    pub fn collect<C: Hypercube>(comm: &C, cube: SubCube, local: &[f64]) -> Result<Vec<Summary>> {
        let mut min = local.to_vec();
        let mut max = local.to_vec();
        let mut sum = local.to_vec();
        comm.reduce(&mut min, ReduceOp::Min, cube)?;
        comm.reduce(&mut max, ReduceOp::Max, cube)?;
        comm.reduce(&mut sum, ReduceOp::Sum, cube)?;

        let count = cube.size() as f64;
        Ok(min
            .into_iter()
            .zip(max)
            .zip(sum)
            .map(|((min, max), sum)| Summary {
                min,
                max,
                avg: sum / count,
            })
            .collect())
    }
}

/// Per-process factor sizes and solve counters of one handle
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XxtStats {
    /// Number of processes
    pub processes: usize,
    /// Top separator level
    pub level: u32,
    /// Unique global dofs
    pub n_global: usize,
    /// Owned rows
    pub rows: Summary,
    /// Factor columns
    pub columns: Summary,
    /// Stored factor values
    pub nnz: Summary,
    /// Packed buffer capacity
    pub capacity: Summary,
    /// Largest message a solve exchanges
    pub message_size: Summary,
    /// Solves run on this process
    pub solves: usize,
    /// Accumulated solve time in seconds
    pub solve_time: Summary,
}

impl fmt::Display for XxtStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "XXT on {} processes (level {}), {} global dofs",
            self.processes, self.level, self.n_global
        )?;
        writeln!(f, "{:<14} {:>12} {:>12} {:>12}", "", "min", "max", "avg")?;
        let rows = [
            ("rows", &self.rows),
            ("columns", &self.columns),
            ("nnz", &self.nnz),
            ("capacity", &self.capacity),
            ("message size", &self.message_size),
            ("solve time", &self.solve_time),
        ];
        for (name, summary) in rows {
            writeln!(
                f,
                "{:<14} {:>12.4e} {:>12.4e} {:>12.4e}",
                name, summary.min, summary.max, summary.avg
            )?;
        }
        write!(f, "{} solves", self.solves)
    }
}
