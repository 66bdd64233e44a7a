use raid_memory::{
    MemoryError,
    RemoteAddress,
};
use thiserror::Error;

/// A pointer chain could not be followed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("chain broken at step {step} ({address}): {source}")]
pub struct BrokenChain {
    /// Index of the step which failed
    pub step: usize,

    /// Address which has been read by the failed step
    pub address: RemoteAddress,

    #[source]
    pub source: MemoryError,
}

#[derive(Error, Debug)]
pub enum OffsetError {
    #[error("invalid chain step \"{0}\"")]
    InvalidStep(String),

    #[error("chain contains {length} steps but only {limit} are supported")]
    ChainTooLong { length: usize, limit: usize },

    #[error("missing offset {structure}.{field}")]
    MissingField {
        structure: &'static str,
        field: &'static str,
    },

    #[error("offset {structure}.{field} must {expected}")]
    InvalidShape {
        structure: &'static str,
        field: &'static str,
        expected: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type OffsetResult<T> = std::result::Result<T, OffsetError>;
