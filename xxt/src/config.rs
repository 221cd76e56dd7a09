//! Factorization settings

/// Smallest admissible pivot `α = vᵗ·A·v` before normalisation
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1.0e-14;

/// Configuration for factor generation and handle checking
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FactorConfig {
    /// Pivots below this value abort the factorization
    pub pivot_tolerance: f64,
    /// Initial packed buffer size in values, `None` for the size heuristic
    pub initial_capacity: Option<usize>,
    /// Run the cross-process handle check on every solve
    pub verify_handles: bool,
}

impl FactorConfig {
    /// Set the pivot tolerance
    pub fn with_pivot_tolerance(mut self, tolerance: f64) -> Self {
        self.pivot_tolerance = tolerance;
        self
    }

    /// Set the initial packed buffer size in values
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Enable or disable the handle check on solves
    pub fn with_verify_handles(mut self, verify: bool) -> Self {
        self.verify_handles = verify;
        self
    }

    /// Initial packed buffer size for a factor of `rows × columns`
    ///
    /// Uses the configured capacity when present, otherwise
    /// `(2.5·n_global^(5/3) + rows·replicated/2) / processes`, which tracks
    /// the fill of nested dissection on 2-D grids. Always at least 1 and at
    /// most the dense size.
    pub fn capacity_for(
        &self,
        n_global: usize,
        rows: usize,
        columns: usize,
        replicated: usize,
        processes: usize,
    ) -> usize {
        let dense = rows.saturating_mul(columns).max(1);
        match self.initial_capacity {
            Some(capacity) => capacity,
            None => {
                let fill = 2.5 * (n_global as f64).powf(1.6667);
                let replication = (rows * replicated) as f64 / 2.0;
                let estimate = (fill + replication) / processes.max(1) as f64;
                (estimate as usize).clamp(1, dense)
            }
        }
    }

    /// Parse a configuration from JSON, missing fields take their defaults
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            pivot_tolerance: DEFAULT_PIVOT_TOLERANCE,
            initial_capacity: None,
            verify_handles: true,
        }
    }
}
