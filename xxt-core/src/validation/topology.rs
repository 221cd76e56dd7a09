//! Process topology validation
//!
//! XXT only runs on hypercubes, so every process count must be 2^L.

use crate::XxtError;

/// Whether `processes` is a non-zero power of two
pub const fn is_power_of_two(processes: usize) -> bool {
    processes != 0 && processes & (processes - 1) == 0
}

/// Hypercube dimension `L` of a communicator with `processes` members
pub const fn log2_exact(processes: usize) -> Result<u32, XxtError> {
    if !is_power_of_two(processes) {
        return Err(XxtError::NonPowerOfTwo { processes });
    }
    Ok(processes.trailing_zeros())
}
