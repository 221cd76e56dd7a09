//! Packed column storage for the X factor
//!
//! After separator ordering, the non-zeros of each column of X concentrate in
//! a short contiguous range of local rows. Only that window is stored, one
//! column after the other, in a single growable buffer.

use alloc::vec::Vec;

use crate::{validate_vector_len, Result, XxtError};

/// Dense `f64` buffer with an explicit capacity that doubles on overflow
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrowableBuffer {
    data: Vec<f64>,
    capacity: usize,
}

impl GrowableBuffer {
    /// Allocate a buffer able to hold `capacity` values without growing
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| XxtError::AllocationFailed { requested: capacity })?;
        Ok(Self { data, capacity })
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current capacity in values
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored values
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Append `values`, doubling the capacity until they fit
    ///
    /// Returns the number of doublings performed.
    pub fn extend_from_slice(&mut self, values: &[f64]) -> Result<u32> {
        let required = self
            .data
            .len()
            .checked_add(values.len())
            .ok_or(XxtError::AllocationFailed { requested: usize::MAX })?;
        let doublings = self.grow_to_fit(required)?;
        self.data.extend_from_slice(values);
        Ok(doublings)
    }

    fn grow_to_fit(&mut self, required: usize) -> Result<u32> {
        if required <= self.capacity {
            return Ok(0);
        }

        let mut target = self.capacity.max(1);
        let mut doublings = 0;
        while target < required {
            target = target
                .checked_mul(2)
                .ok_or(XxtError::AllocationFailed { requested: required })?;
            doublings += 1;
        }

        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|_| XxtError::AllocationFailed { requested: target })?;
        self.capacity = target;
        Ok(doublings)
    }
}

/// Location of one stored column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnWindow {
    /// First local row of the non-zero window
    pub offset: usize,
    /// Number of rows in the window
    pub len: usize,
    /// Position of the window inside the packed buffer
    pub start: usize,
}

impl ColumnWindow {
    /// Local row range covered by the window
    pub fn rows(&self) -> core::ops::Range<usize> {
        self.offset..self.offset + self.len
    }

    /// Buffer range holding the window
    pub fn values(&self) -> core::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Local slice of the factor X: `rows` owned rows by any number of columns
#[derive(Debug, Clone, PartialEq)]
pub struct FactorStore {
    rows: usize,
    columns: Vec<ColumnWindow>,
    values: GrowableBuffer,
    stages: Vec<usize>,
    doublings: u32,
}

impl FactorStore {
    /// Create an empty store
    pub fn new(rows: usize, expected_columns: usize, capacity: usize) -> Result<Self> {
        let mut columns = Vec::new();
        columns
            .try_reserve_exact(expected_columns)
            .map_err(|_| XxtError::AllocationFailed {
                requested: expected_columns,
            })?;

        Ok(Self {
            rows,
            columns,
            values: GrowableBuffer::with_capacity(capacity)?,
            stages: Vec::new(),
            doublings: 0,
        })
    }

    /// Compress `column` to its non-zero window and append it
    pub fn push_column(&mut self, column: &[f64]) -> Result<ColumnWindow> {
        validate_vector_len(self.rows, column.len())?;

        let window = match column.iter().position(|&x| x != 0.0) {
            Some(first) => {
                let last = column.iter().rposition(|&x| x != 0.0).unwrap_or(first);
                ColumnWindow {
                    offset: first,
                    len: last - first + 1,
                    start: self.values.len(),
                }
            }
            None => ColumnWindow {
                offset: 0,
                len: 0,
                start: self.values.len(),
            },
        };

        self.doublings += self.values.extend_from_slice(&column[window.rows()])?;
        self.columns.push(window);
        Ok(window)
    }

    /// Append a column with no stored entries
    pub fn push_empty(&mut self) -> ColumnWindow {
        let window = ColumnWindow {
            offset: 0,
            len: 0,
            start: self.values.len(),
        };
        self.columns.push(window);
        window
    }

    /// Local row count
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of stored columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Number of stored values
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Capacity of the packed buffer
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// How many times the packed buffer doubled
    pub fn doublings(&self) -> u32 {
        self.doublings
    }

    /// Window and values of column `k`
    pub fn column(&self, k: usize) -> Option<(ColumnWindow, &[f64])> {
        let window = *self.columns.get(k)?;
        Some((window, &self.values.as_slice()[window.values()]))
    }

    /// Iterate over `(window, values)` of all columns in order
    pub fn columns(&self) -> impl Iterator<Item = (ColumnWindow, &[f64])> + '_ {
        let values = self.values.as_slice();
        self.columns
            .iter()
            .map(move |window| (*window, &values[window.values()]))
    }

    /// `uu[k] = u[window_k] · X_k` for the first `uu.len()` columns
    pub fn project(&self, u: &[f64], uu: &mut [f64]) -> Result<()> {
        validate_vector_len(self.rows, u.len())?;
        for (slot, (window, values)) in uu.iter_mut().zip(self.columns()) {
            *slot = u[window.rows()]
                .iter()
                .zip(values)
                .map(|(a, b)| a * b)
                .sum();
        }
        Ok(())
    }

    /// `out[window_k] += coeffs[k] · X_k` for the first `coeffs.len()` columns
    pub fn accumulate(&self, coeffs: &[f64], out: &mut [f64]) -> Result<()> {
        validate_vector_len(self.rows, out.len())?;
        for (&coeff, (window, values)) in coeffs.iter().zip(self.columns()) {
            for (o, x) in out[window.rows()].iter_mut().zip(values) {
                *o += coeff * x;
            }
        }
        Ok(())
    }

    /// Record the column offsets of level transitions
    pub fn set_stages(&mut self, stages: Vec<usize>) {
        self.stages = stages;
    }

    /// Column offsets of level transitions (length `L + 1`)
    pub fn stages(&self) -> &[usize] {
        &self.stages
    }

    /// Length of the largest message a solve exchanges
    pub fn message_size(&self) -> usize {
        match (self.stages.first(), self.stages.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0,
        }
    }
}
