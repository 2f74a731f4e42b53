//! Error types for the shared buffer and its verification

/// Errors raised while allocating or accessing a shared buffer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("failed to allocate {size} bytes for the shared buffer")]
    AllocationFailure { size: usize },

    #[error("shared buffer length must be positive")]
    ZeroLength,

    #[error("buffer identifier {id} is outside the table (slots: {slots})")]
    UnknownId { id: u8, slots: usize },

    #[error("buffer identifier {id} has no buffer attached")]
    Unset { id: u8 },

    #[error("offset {offset} is out of bounds for buffer {id} (length: {len})")]
    OutOfBounds { id: u8, offset: u32, len: usize },

    #[error("buffer {id} was handed a null address")]
    NullAddress { id: u8 },

    #[error("buffer {id} was handed an address the host does not own")]
    ForeignAddress { id: u8 },
}

/// A byte that does not match the expected segment pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("check error {offset}: {expected} {got}")]
pub struct VerifyError {
    pub offset: usize,
    pub expected: u8,
    pub got: u8,
}

/// Process exit status of a host run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// The simulator's own return value; 0 on a clean run
    Simulator(i32),
    AllocationFailed,
    CheckFailed,
}

impl ExitStatus {
    pub const ALLOCATION_FAILED_CODE: i32 = -1;
    pub const CHECK_FAILED_CODE: i32 = 1;

    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Simulator(code) => code,
            ExitStatus::AllocationFailed => Self::ALLOCATION_FAILED_CODE,
            ExitStatus::CheckFailed => Self::CHECK_FAILED_CODE,
        }
    }
}
