//! Solver handle lifecycle
//!
//! A handle is created empty, factored once by a collective call, used for
//! any number of solves and finally destroyed. Every collective entry point
//! first checks that all processes hold the same handle id.

use std::time::{Duration, Instant};

use xxt_core::{
    log2_exact, validate_vector_len, FactorStore, Hypercube, MatrixAction, ReduceOp, Result,
    SeparatorInfo, SubCube, XxtError,
};

use crate::binding::MatvecBinding;
use crate::config::FactorConfig;
use crate::factor::generate;
use crate::registry::HandleRegistry;
use crate::separators::determine_separators;
use crate::solve::solve_in_place;
use crate::stats::{Summary, XxtStats};

/// Everything a factored handle owns
#[derive(Debug)]
struct Factorization {
    binding: MatvecBinding,
    separators: SeparatorInfo,
    store: FactorStore,
    scratch: Vec<f64>,
}

/// One XXT factorization of a distributed SPD operator
#[derive(Debug)]
pub struct XxtSolver<C: Hypercube> {
    id: u64,
    comm: C,
    registry: HandleRegistry,
    config: FactorConfig,
    level: u32,
    state: Option<Factorization>,
    solves: usize,
    solve_time: Duration,
}

impl<C: Hypercube> XxtSolver<C> {
    /// Create an empty handle with a fresh id from `registry`
    pub fn new(registry: &HandleRegistry, comm: C) -> Self {
        Self {
            id: registry.issue(),
            comm,
            registry: registry.clone(),
            config: FactorConfig::default(),
            level: 0,
            state: None,
            solves: 0,
            solve_time: Duration::ZERO,
        }
    }

    /// Replace the factorization settings
    pub fn with_config(mut self, config: FactorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FactorConfig {
        &self.config
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Top separator level, `log2` of the process count once factored
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn is_factored(&self) -> bool {
        self.state.is_some()
    }

    pub fn separators(&self) -> Option<&SeparatorInfo> {
        self.state.as_ref().map(|state| &state.separators)
    }

    pub fn factor_store(&self) -> Option<&FactorStore> {
        self.state.as_ref().map(|state| &state.store)
    }

    pub fn binding(&self) -> Option<&MatvecBinding> {
        self.state.as_ref().map(|state| &state.binding)
    }

    /// Number of solves run so far
    pub fn solves(&self) -> usize {
        self.solves
    }

    /// Verify that every process passed the same handle
    ///
    /// Collective over the full communicator.
    pub fn check_handle(&self) -> Result<()> {
        if self.id == 0 {
            return Err(XxtError::InvalidHandle);
        }
        let level = log2_exact(self.comm.size())?;
        check_id(&self.comm, self.id, SubCube::new(level))
    }

    /// Factor the operator whose owned rows `action` applies
    ///
    /// `local2global` lists the `m` local dofs, the first `n` of them owned.
    /// Collective over the full communicator; a handle is factored at most
    /// once.
    pub fn factor<A>(&mut self, local2global: &[u64], n: usize, m: usize, action: A) -> Result<()>
    where
        A: MatrixAction + Send + 'static,
    {
        let level = log2_exact(self.comm.size())?;
        self.check_handle()?;

        let local = if self.state.is_some() {
            Err(XxtError::AlreadyFactored)
        } else {
            MatvecBinding::new(local2global, n, m, Box::new(action))
        };
        let mut binding = agree(&self.comm, SubCube::new(level), local)?;
        self.level = level;

        let separators = determine_separators(&self.comm, &mut binding, level)?;
        let store = generate(&self.comm, &binding, &separators, &self.config)?;
        log::info!(
            "handle {} rank {}: factored {} owned dofs of {} into {} columns",
            self.id,
            self.comm.rank(),
            n,
            binding.n_global(),
            store.num_columns()
        );

        let scratch = vec![0.0; store.num_columns()];
        self.state = Some(Factorization {
            binding,
            separators,
            store,
            scratch,
        });
        Ok(())
    }

    /// Solve `A·x = b` for the owned entries
    pub fn solve(&mut self, b: &[f64], x: &mut [f64]) -> Result<()> {
        let lengths = validate_vector_len(x.len(), b.len());
        if lengths.is_ok() {
            x.copy_from_slice(b);
        }
        self.run_solve(x, lengths)
    }

    /// Solve `A·x = b` where `x` holds `b` on entry
    pub fn solve_in_place(&mut self, x: &mut [f64]) -> Result<()> {
        self.run_solve(x, Ok(()))
    }

    fn run_solve(&mut self, x: &mut [f64], lengths: Result<()>) -> Result<()> {
        let cube = SubCube::new(log2_exact(self.comm.size())?);
        let local = lengths.and_then(|()| match &self.state {
            Some(state) => validate_vector_len(state.binding.n(), x.len()),
            None => Err(XxtError::NotFactored),
        });
        agree(&self.comm, cube, local)?;
        if self.config.verify_handles {
            check_id(&self.comm, self.id, cube)?;
        }
        let state = self.state.as_mut().ok_or(XxtError::NotFactored)?;

        let started = Instant::now();
        solve_in_place(&self.comm, &state.store, cube, &mut state.scratch, x)?;
        self.solve_time += started.elapsed();
        self.solves += 1;
        Ok(())
    }

    /// Sizes and counters summarised over all processes
    ///
    /// Collective over the full communicator.
    pub fn stats(&self) -> Result<XxtStats> {
        let cube = SubCube::new(log2_exact(self.comm.size())?);
        let state = agree(
            &self.comm,
            cube,
            self.state.as_ref().ok_or(XxtError::NotFactored),
        )?;
        let store = &state.store;

        let local = [
            state.binding.n() as f64,
            store.num_columns() as f64,
            store.nnz() as f64,
            store.capacity() as f64,
            store.message_size() as f64,
            self.solve_time.as_secs_f64(),
        ];
        let summaries = Summary::collect(&self.comm, cube, &local)?;
        let pick = |index: usize| summaries.get(index).copied().unwrap_or_default();

        Ok(XxtStats {
            processes: self.comm.size(),
            level: self.level,
            n_global: state.separators.n_global(),
            rows: pick(0),
            columns: pick(1),
            nnz: pick(2),
            capacity: pick(3),
            message_size: pick(4),
            solves: self.solves,
            solve_time: pick(5),
        })
    }

    /// Release the handle after a collective consistency check
    pub fn destroy(self) -> Result<()> {
        self.check_handle()
    }
}

/// Min-reduce `[id, MAX - id]` so that one exchange yields both extremes
fn check_id<C: Hypercube>(comm: &C, id: u64, cube: SubCube) -> Result<()> {
    let mut bounds = [id, u64::MAX - id];
    comm.reduce(&mut bounds, ReduceOp::Min, cube)?;
    let (min, max) = (bounds[0], u64::MAX - bounds[1]);

    if min != max {
        return Err(XxtError::HandleMismatch { min, max, id });
    }
    Ok(())
}

/// Settle a locally checked precondition across `cube`
///
/// Processes whose own check passed fail with `PeerFailed` naming the highest
/// failing rank, so nobody moves on to the next exchange alone.
fn agree<C: Hypercube, T>(comm: &C, cube: SubCube, local: Result<T>) -> Result<T> {
    let mut failed = [if local.is_err() { comm.rank() as u64 + 1 } else { 0 }];
    comm.reduce(&mut failed, ReduceOp::Max, cube)?;

    match (local, failed[0]) {
        (Err(err), _) => Err(err),
        (Ok(value), 0) => Ok(value),
        (Ok(_), rank) => Err(XxtError::PeerFailed {
            rank: rank as usize - 1,
        }),
    }
}

impl<C: Hypercube> Drop for XxtSolver<C> {
    fn drop(&mut self) {
        self.registry.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{SelfComm, ThreadCluster};
    use crate::gallery::{block_owner, GlobalMatrix, Identity};

    #[test]
    fn test_lifecycle_on_one_process() {
        let registry = HandleRegistry::new();
        let mut solver = registry.create(SelfComm);
        assert!(!solver.is_factored());
        assert_eq!(solver.solve_in_place(&mut [1.0]), Err(XxtError::NotFactored));
        assert_eq!(solver.stats().unwrap_err(), XxtError::NotFactored);

        solver.factor(&[0, 1], 2, 2, Identity).unwrap();
        assert!(solver.is_factored());
        assert_eq!(solver.level(), 0);

        let mut x = [0.0; 2];
        solver.solve(&[3.0, -4.0], &mut x).unwrap();
        assert_eq!(x, [3.0, -4.0]);
        assert_eq!(solver.solves(), 1);

        assert_eq!(
            solver.factor(&[0, 1], 2, 2, Identity),
            Err(XxtError::AlreadyFactored)
        );
        assert_eq!(
            solver.solve(&[1.0; 3], &mut [0.0; 3]),
            Err(XxtError::VectorLength {
                expected: 2,
                actual: 3
            })
        );

        solver.destroy().unwrap();
        assert_eq!(registry.outstanding(), 0);
    }

    #[test]
    fn test_invalid_dof_map() {
        let registry = HandleRegistry::new();
        let mut solver = registry.create(SelfComm);
        assert_eq!(
            solver.factor(&[0, 1], 3, 2, Identity),
            Err(XxtError::OwnedExceedsLocal { n: 3, m: 2 })
        );
        assert!(!solver.is_factored());
    }

    #[test]
    fn test_non_power_of_two_fails_everywhere() {
        let results = ThreadCluster::new(3)
            .run(|comm| {
                let registry = HandleRegistry::new();
                let mut solver = registry.create(comm);
                solver.factor(&[0], 1, 1, Identity)
            })
            .unwrap();

        for result in results {
            assert_eq!(result, Err(XxtError::NonPowerOfTwo { processes: 3 }));
        }
    }

    #[test]
    fn test_mismatched_handles_are_detected() {
        let results = ThreadCluster::new(2)
            .run(|comm| {
                let registry = HandleRegistry::new();
                // Rank 1 creates an extra handle first, so the ids disagree
                let _extra = (comm.rank() == 1).then(|| registry.create(SelfComm));
                let solver = registry.create(comm);
                solver.check_handle()
            })
            .unwrap();

        for result in results {
            assert!(matches!(
                result,
                Err(XxtError::HandleMismatch { min: 1, max: 2, .. })
            ));
        }
    }

    #[test]
    fn test_ids_near_the_top_of_the_range() {
        let results = ThreadCluster::new(2)
            .run(|comm| {
                let cube = comm.full_cube();
                let same = check_id(&comm, u64::MAX, cube);
                let apart = check_id(&comm, u64::MAX - comm.rank() as u64, cube);
                Ok::<_, XxtError>((same, apart))
            })
            .unwrap();

        for result in results {
            let (same, apart) = result.unwrap();
            assert_eq!(same, Ok(()));
            assert!(matches!(
                apart,
                Err(XxtError::HandleMismatch { min, max, .. })
                    if min == u64::MAX - 1 && max == u64::MAX
            ));
        }
    }

    #[test]
    fn test_local_failure_is_shared_with_peers() {
        let results = ThreadCluster::new(2)
            .run(|comm| {
                let rank = comm.rank();
                let gids = [2 * rank as u64, 2 * rank as u64 + 1];
                let registry = HandleRegistry::new();
                let mut solver = registry.create(comm);

                // Rank 0 hands over a map one entry short
                let short = if rank == 0 { &gids[..1] } else { &gids[..] };
                let rejected = solver.factor(short, 2, 2, Identity);
                let unfactored = solver.solve_in_place(&mut [0.0; 2]);

                solver.factor(&gids, 2, 2, Identity)?;
                let mut x = [0.0; 2];
                let wrong_length = solver.solve(&[1.0; 3], &mut [0.0; 3]);
                solver.solve(&[rank as f64, 1.0], &mut x)?;
                solver.destroy()?;
                Ok::<_, XxtError>((rejected, unfactored, wrong_length, x))
            })
            .unwrap();

        let (rejected, unfactored, wrong_length, x) = results[0].unwrap();
        assert_eq!(
            rejected,
            Err(XxtError::DofMapLength {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(unfactored, Err(XxtError::NotFactored));
        assert!(matches!(wrong_length, Err(XxtError::VectorLength { .. })));
        assert_eq!(x, [0.0, 1.0]);

        let (rejected, unfactored, wrong_length, x) = results[1].unwrap();
        assert_eq!(rejected, Err(XxtError::PeerFailed { rank: 0 }));
        assert_eq!(unfactored, Err(XxtError::NotFactored));
        assert!(matches!(wrong_length, Err(XxtError::VectorLength { .. })));
        assert_eq!(x, [1.0, 1.0]);
    }

    #[test]
    fn test_stats_on_two_processes() {
        let matrix = GlobalMatrix::laplacian_1d(6);
        let owner = block_owner(6, 2);
        let results = ThreadCluster::new(2)
            .run(|comm| {
                let problem = matrix.distribute(&owner, comm.rank());
                let registry = HandleRegistry::new();
                let mut solver = registry.create(comm);
                let m = problem.m();
                solver.factor(&problem.local2global, problem.n, m, problem.matrix)?;

                let mut x = vec![1.0; problem.n];
                solver.solve_in_place(&mut x)?;
                solver.stats()
            })
            .unwrap();

        for result in results {
            let stats = result.unwrap();
            assert_eq!(stats.processes, 2);
            assert_eq!(stats.level, 1);
            assert_eq!(stats.n_global, 6);
            assert_eq!(stats.rows.avg, 3.0);
            assert_eq!(stats.columns.min, 3.0);
            assert_eq!(stats.columns.max, 4.0);
            assert_eq!(stats.message_size.max, 1.0);
            assert_eq!(stats.solves, 1);
        }
    }
}
