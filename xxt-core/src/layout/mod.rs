//! Data layouts produced by the factorization
//!
//! Separator information is the symbolic half of a factorization, the packed
//! column store its numeric half.

pub mod separator;
pub mod store;

pub use separator::{LevelSeparator, SeparatorInfo, Side};
pub use store::{ColumnWindow, FactorStore, GrowableBuffer};
