//! Hypercube communicator interface
//!
//! Collective operations in XXT never span an arbitrary process subset: they
//! run over a sub-hypercube made of the 2^d processes whose ranks agree on
//! every bit above bit d-1. `SubCube` names that subset explicitly, and the
//! provided reductions on `Hypercube` are written once in terms of a single
//! pairwise exchange primitive.

use alloc::vec::Vec;
use bytemuck::Pod;

use crate::{Result, XxtError};

/// Active sub-hypercube of dimension `dim` around the calling process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubCube {
    dim: u32,
}

impl SubCube {
    /// The calling process on its own
    pub const LOCAL: SubCube = SubCube { dim: 0 };

    /// Sub-cube spanning the lowest `dim` rank bits
    pub const fn new(dim: u32) -> Self {
        Self { dim }
    }

    /// Dimension of the sub-cube
    pub const fn dim(self) -> u32 {
        self.dim
    }

    /// Number of processes in the sub-cube
    pub const fn size(self) -> usize {
        1 << self.dim
    }

    /// Lowest rank of the sub-cube containing `rank`
    pub const fn base(self, rank: usize) -> usize {
        rank & !(self.size() - 1)
    }

    /// Whether two ranks fall into the same sub-cube
    pub const fn contains(self, a: usize, b: usize) -> bool {
        self.base(a) == self.base(b)
    }

    /// Partner of `rank` across hypercube dimension `edge`
    pub const fn partner(rank: usize, edge: u32) -> usize {
        rank ^ (1 << edge)
    }

    /// Sub-cube one dimension smaller, `None` for a single process
    pub const fn lower(self) -> Option<SubCube> {
        match self.dim {
            0 => None,
            dim => Some(SubCube { dim: dim - 1 }),
        }
    }
}

/// Element-wise combination used by reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReduceOp {
    Sum,
    Min,
    Max,
}

/// Values that can travel through a reduction
pub trait Reducible: Pod + PartialOrd + core::ops::Add<Output = Self> {}

impl<T> Reducible for T where T: Pod + PartialOrd + core::ops::Add<Output = T> {}

impl ReduceOp {
    /// Combine two partial values
    ///
    /// Symmetric in its arguments, so both partners of an exchange end up
    /// with bit-identical results.
    pub fn combine<T: Reducible>(self, a: T, b: T) -> T {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Min => {
                if b < a {
                    b
                } else {
                    a
                }
            }
            ReduceOp::Max => {
                if b > a {
                    b
                } else {
                    a
                }
            }
        }
    }
}

/// Communicator over a power-of-two set of processes
///
/// All provided methods are collective over the given sub-cube: every member
/// must call them in the same order with agreeing lengths.
pub trait Hypercube {
    /// Rank of the calling process
    fn rank(&self) -> usize;

    /// Number of processes in the communicator
    fn size(&self) -> usize;

    /// Send `send` to `partner` and return what `partner` sent back
    fn exchange_bytes(&self, partner: usize, send: &[u8]) -> Result<Vec<u8>>;

    /// Sub-cube spanning the whole communicator
    ///
    /// Only meaningful once the size is known to be a power of two.
    fn full_cube(&self) -> SubCube {
        SubCube::new(self.size().trailing_zeros())
    }

    /// Typed pairwise exchange
    fn exchange<T: Pod>(&self, partner: usize, send: &[T]) -> Result<Vec<T>> {
        let bytes = self.exchange_bytes(partner, bytemuck::cast_slice(send))?;
        let width = core::mem::size_of::<T>();
        if width == 0 || bytes.len() % width != 0 {
            return Err(XxtError::MessageLength {
                expected: send.len() * width,
                actual: bytes.len(),
            });
        }
        Ok(bytemuck::pod_collect_to_vec(&bytes))
    }

    /// Element-wise reduction over `cube`, result available on every member
    fn reduce<T: Reducible>(&self, vals: &mut [T], op: ReduceOp, cube: SubCube) -> Result<()> {
        for edge in 0..cube.dim() {
            let partner = SubCube::partner(self.rank(), edge);
            let theirs = self.exchange(partner, vals)?;
            if theirs.len() != vals.len() {
                return Err(XxtError::MessageLength {
                    expected: vals.len(),
                    actual: theirs.len(),
                });
            }
            for (mine, other) in vals.iter_mut().zip(theirs) {
                *mine = op.combine(*mine, other);
            }
        }
        Ok(())
    }

    /// Segmented sum over `cube`
    ///
    /// `stages[e]..stages[cube.dim()]` is combined across hypercube
    /// dimension `e`, so entries below `stages[0]` stay local and entries in
    /// `stages[k-1]..stages[k]` are summed over the sub-cube of dimension `k`.
    /// Partners must agree on each segment length, not on the offsets.
    fn segmented_sum(&self, vals: &mut [f64], stages: &[usize], cube: SubCube) -> Result<()> {
        let dim = cube.dim() as usize;
        if stages.len() <= dim {
            return Err(XxtError::InvalidStages {
                required: dim + 1,
                actual: stages.len(),
            });
        }

        let end = stages[dim];
        if end > vals.len() {
            return Err(XxtError::VectorLength {
                expected: end,
                actual: vals.len(),
            });
        }

        for edge in 0..cube.dim() {
            let start = stages[edge as usize];
            if start >= end {
                continue;
            }

            let partner = SubCube::partner(self.rank(), edge);
            let segment = &mut vals[start..end];
            let theirs = self.exchange(partner, segment)?;
            if theirs.len() != segment.len() {
                return Err(XxtError::MessageLength {
                    expected: segment.len(),
                    actual: theirs.len(),
                });
            }
            for (mine, other) in segment.iter_mut().zip(theirs) {
                *mine += other;
            }
        }
        Ok(())
    }
}
