//! Error types for XXT operations

/// Broad classes of failure, used by callers that only need to know whether a
/// collective call failed because of the setup, the operator, or the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCategory {
    /// Process topology, handle or dof map set up inconsistently
    Configuration,
    /// Operator is singular, indefinite or too ill-conditioned for a pivot
    Numerical,
    /// Memory or thread resources could not be obtained
    Resource,
    /// A peer process went away or sent a malformed message
    Communication,
    /// Operation issued against a handle in the wrong lifecycle state
    State,
}

/// Errors that can occur during XXT operations
///
/// Every variant is produced identically on all processes taking part in the
/// failing collective step, except local validation failures, which the other
/// processes observe as `PeerFailed`, and `PeerDisconnected`, which is what
/// the remaining processes see once a failed peer has left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum XxtError {
    /// Process count is not a power of two
    NonPowerOfTwo { processes: usize },
    /// Handle ids differ across the communicator
    HandleMismatch { min: u64, max: u64, id: u64 },
    /// Handle id was never issued by a registry
    InvalidHandle,
    /// Solve or stats requested before a successful factor
    NotFactored,
    /// Factor requested on an already factored handle
    AlreadyFactored,
    /// `local2global` does not cover the `m` local dofs
    DofMapLength { expected: usize, actual: usize },
    /// More owned rows than local dofs
    OwnedExceedsLocal { n: usize, m: usize },
    /// Vector handed to solve has the wrong length
    VectorLength { expected: usize, actual: usize },
    /// Elected dof is missing from the local map of the process that proposed it
    MissingDof { global: u64 },
    /// Column pivot below tolerance, negative, or NaN
    BadPivot { column: usize, pivot: f64 },
    /// Column counter walked past the top separator level
    LevelOverflow { level: u32 },
    /// Stage list shorter than the sub-cube it is reduced over
    InvalidStages { required: usize, actual: usize },
    /// Growing the packed factor buffer failed
    AllocationFailed { requested: usize },
    /// Worker threads for the in-process cluster could not be started
    ThreadPool,
    /// Partner process is gone
    PeerDisconnected { rank: usize },
    /// Another process rejected its arguments to the same collective call
    PeerFailed { rank: usize },
    /// Partner sent a message of unexpected length
    MessageLength { expected: usize, actual: usize },
}

impl XxtError {
    /// Category of this error
    pub const fn category(&self) -> ErrorCategory {
        match self {
            XxtError::NonPowerOfTwo { .. }
            | XxtError::HandleMismatch { .. }
            | XxtError::InvalidHandle
            | XxtError::DofMapLength { .. }
            | XxtError::OwnedExceedsLocal { .. }
            | XxtError::VectorLength { .. }
            | XxtError::InvalidStages { .. } => ErrorCategory::Configuration,
            XxtError::BadPivot { .. } => ErrorCategory::Numerical,
            XxtError::AllocationFailed { .. } | XxtError::ThreadPool => ErrorCategory::Resource,
            XxtError::PeerDisconnected { .. }
            | XxtError::PeerFailed { .. }
            | XxtError::MessageLength { .. } => ErrorCategory::Communication,
            XxtError::NotFactored
            | XxtError::AlreadyFactored
            | XxtError::MissingDof { .. }
            | XxtError::LevelOverflow { .. } => ErrorCategory::State,
        }
    }
}

impl core::fmt::Display for XxtError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            XxtError::NonPowerOfTwo { processes } => {
                write!(f, "Process count {processes} is not a power of two")
            }
            XxtError::HandleMismatch { min, max, id } => {
                write!(f, "Handle id mismatch: min/max {min}/{max}, local {id}")
            }
            XxtError::InvalidHandle => write!(f, "Handle id was never issued"),
            XxtError::NotFactored => write!(f, "Handle has not been factored"),
            XxtError::AlreadyFactored => write!(f, "Handle is already factored"),
            XxtError::DofMapLength { expected, actual } => {
                write!(f, "local2global has {actual} entries, expected {expected}")
            }
            XxtError::OwnedExceedsLocal { n, m } => {
                write!(f, "Owned row count {n} exceeds local dof count {m}")
            }
            XxtError::VectorLength { expected, actual } => {
                write!(f, "Vector has length {actual}, expected {expected}")
            }
            XxtError::MissingDof { global } => {
                write!(f, "Global dof {global} not found in local map")
            }
            XxtError::BadPivot { column, pivot } => {
                write!(f, "Bad pivot {pivot:e} at column {column}")
            }
            XxtError::LevelOverflow { level } => {
                write!(f, "Column sweep exceeded separator level {level}")
            }
            XxtError::InvalidStages { required, actual } => {
                write!(f, "Stage list has {actual} entries, need {required}")
            }
            XxtError::AllocationFailed { requested } => {
                write!(f, "Failed to grow factor storage to {requested} values")
            }
            XxtError::ThreadPool => write!(f, "Failed to start cluster threads"),
            XxtError::PeerDisconnected { rank } => write!(f, "Process {rank} disconnected"),
            XxtError::PeerFailed { rank } => {
                write!(f, "Process {rank} failed the collective call")
            }
            XxtError::MessageLength { expected, actual } => {
                write!(f, "Received {actual} values, expected {expected}")
            }
        }
    }
}

/// Result type for XXT operations
pub type Result<T> = core::result::Result<T, XxtError>;
