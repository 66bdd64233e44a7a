//! Versioned offset table describing the memory layout of the target process.
//!
//! Every symbolic field maps to an [`OffsetChain`] which can be walked from
//! the address of its owning structure. A new game build only requires a new
//! table, not new code.

mod chain;
pub use chain::*;

mod error;
pub use error::*;

mod field;
pub use field::*;

mod table;
pub use table::*;
