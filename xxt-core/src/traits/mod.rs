//! Abstract interfaces for the XXT solver
//!
//! This module defines the seams between the solver and its collaborators:
//! the client operator, the hypercube communicator, and the gather-scatter
//! layer. Traits are pure interfaces - implementations live elsewhere.

pub mod action;
pub mod comm;
pub mod exchange;

pub use action::MatrixAction;
pub use comm::{Hypercube, ReduceOp, Reducible, SubCube};
pub use exchange::GatherScatter;
