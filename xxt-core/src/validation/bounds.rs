//! Size validation for dof maps and vectors

use crate::XxtError;

/// Validate the local dof map handed to a factorization
///
/// `local2global` must have exactly one entry per local dof and the owned
/// rows must be a prefix of the local dofs.
pub const fn validate_dof_map(map_len: usize, n: usize, m: usize) -> Result<(), XxtError> {
    if n > m {
        return Err(XxtError::OwnedExceedsLocal { n, m });
    }
    if map_len != m {
        return Err(XxtError::DofMapLength {
            expected: m,
            actual: map_len,
        });
    }
    Ok(())
}

/// Validate a vector length
pub const fn validate_vector_len(expected: usize, actual: usize) -> Result<(), XxtError> {
    if expected != actual {
        return Err(XxtError::VectorLength { expected, actual });
    }
    Ok(())
}
