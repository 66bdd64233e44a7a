use raid_memory::{
    MemoryError,
    RemoteAddress,
};
use raid_offsets::{
    BrokenChain,
    Field,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// The address could not be read
    #[error("{what} unreadable: {source}")]
    Unreadable {
        what: &'static str,

        #[source]
        source: MemoryError,
    },

    /// A step of a pointer chain could not be followed
    #[error("failed to resolve {field}: {source}")]
    BrokenChain {
        field: Field,

        #[source]
        source: BrokenChain,
    },

    /// The value could be read but failed a sanity check
    #[error("implausible {what}: {detail}")]
    ImplausibleValue { what: &'static str, detail: String },

    /// The object at the address is not of the expected type
    #[error("unexpected object type \"{found}\" at {address}")]
    StructuralMismatch {
        address: RemoteAddress,
        found: String,
    },

    #[error("offset table does not contain {0}")]
    MissingOffset(Field),

    #[error("operation cancelled")]
    Cancelled,
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

impl ResolveError {
    pub fn unreadable(what: &'static str) -> impl FnOnce(MemoryError) -> ResolveError {
        move |source| ResolveError::Unreadable { what, source }
    }

    pub fn implausible(what: &'static str, detail: impl Into<String>) -> ResolveError {
        ResolveError::ImplausibleValue {
            what,
            detail: detail.into(),
        }
    }
}
