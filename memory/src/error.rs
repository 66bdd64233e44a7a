use thiserror::Error;

use crate::RemoteAddress;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("failed to access memory at {address} ({length} bytes)")]
    InvalidAddress {
        address: RemoteAddress,
        length: usize,
    },

    #[error("null pointer read at {address}")]
    NullPointer { address: RemoteAddress },

    #[error("partial read at {address} (copied {copied} of {requested} bytes)")]
    PartialRead {
        address: RemoteAddress,
        copied: usize,
        requested: usize,
    },

    #[error("read at {address} timed out")]
    Timeout { address: RemoteAddress },

    #[error("the target process does no longer exists")]
    ProcessUnavailable,

    #[error("module {0} is not loaded in the target process")]
    UnknownModule(String),

    #[error("value size mismatch (expected {expected} bytes, got {actual})")]
    SizeMismatch { expected: usize, actual: usize },
}

pub type MemoryResult<T> = std::result::Result<T, MemoryError>;

impl MemoryError {
    /// The address the failed access targeted, if the failure is bound to one.
    pub fn address(&self) -> Option<RemoteAddress> {
        match self {
            Self::InvalidAddress { address, .. }
            | Self::NullPointer { address }
            | Self::PartialRead { address, .. }
            | Self::Timeout { address } => Some(*address),
            _ => None,
        }
    }
}
