//! XXT - Parallel recursive-substructuring direct solver
//!
//! Factors a symmetric positive-definite operator, distributed row-wise over
//! a power-of-two set of processes, as `A⁻¹ = X·Xᵗ` and applies that factor
//! to any number of right-hand sides.
//!
//! ## Architecture
//!
//! - **xxt-core**: collaborator traits, data layouts and validation (no threads, no I/O)
//! - **xxt**: separator ordering, factor generation, solves, handles and an
//!   in-process thread cluster that stands in for a message-passing runtime
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use xxt::gallery::{block_owner, GlobalMatrix};
//! use xxt::{HandleRegistry, Hypercube, ThreadCluster};
//!
//! fn example() -> xxt::Result<()> {
//!     let matrix = GlobalMatrix::laplacian_1d(64);
//!     let owner = block_owner(64, 4);
//!
//!     let solutions = ThreadCluster::new(4).run(|comm| {
//!         let problem = matrix.distribute(&owner, comm.rank());
//!         let registry = HandleRegistry::new();
//!         let mut solver = registry.create(comm);
//!         let m = problem.m();
//!         solver.factor(&problem.local2global, problem.n, m, problem.matrix)?;
//!
//!         let mut x = vec![1.0; problem.n];
//!         solver.solve_in_place(&mut x)?;
//!         Ok::<_, xxt::XxtError>(x)
//!     })?;
//!
//!     for piece in solutions {
//!         println!("{:?}", piece?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Nested separators**: dofs are ordered top-down by recursive bisection of the hypercube
//! - **Sparse factor**: each column of X is stored as its contiguous non-zero window
//! - **Scoped collectives**: every reduction names the sub-cube it runs over
//! - **Statistics**: sizes and solve times summarised across processes

// Re-export core abstractions
pub use xxt_core::{
    // Collaborator traits
    GatherScatter, Hypercube, MatrixAction, ReduceOp, SubCube,
    // Layouts
    FactorStore, SeparatorInfo, Side,
    // Error handling
    ErrorCategory, Result, XxtError,
    // Validation utilities
    is_power_of_two, log2_exact,
};

// Implementation modules
pub mod binding;
pub mod cluster;
pub mod config;
pub mod factor;
pub mod gallery;
pub mod gather_scatter;
pub mod handle;
pub mod registry;
pub mod separators;
pub mod solve;
pub mod stats;

// Public exports
pub use binding::MatvecBinding;
pub use cluster::{SelfComm, ThreadCluster, ThreadComm};
pub use config::{FactorConfig, DEFAULT_PIVOT_TOLERANCE};
pub use gather_scatter::GsHandle;
pub use handle::XxtSolver;
pub use registry::HandleRegistry;
pub use stats::{Summary, XxtStats};
