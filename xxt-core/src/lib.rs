#![no_std]

//! XXT Core - Definitions for the XXT parallel direct solver
//!
//! This crate provides the collaborator traits, data layouts and validation
//! helpers shared by every XXT implementation. It performs no communication
//! and no I/O of its own.

extern crate alloc;

pub mod error;
pub mod layout;
pub mod traits;
pub mod validation;

pub use error::*;
pub use layout::*;
pub use traits::*;
pub use validation::{is_power_of_two, log2_exact, validate_dof_map, validate_vector_len};
