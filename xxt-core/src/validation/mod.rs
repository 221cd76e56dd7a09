//! Validation utilities for XXT inputs
//!
//! This module contains pure validation functions with no communication.
//! All checks are on sizes and process topology.

pub mod bounds;
pub mod topology;

pub use bounds::{validate_dof_map, validate_vector_len};
pub use topology::{is_power_of_two, log2_exact};
