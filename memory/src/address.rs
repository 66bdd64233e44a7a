use std::fmt::{
    self,
    Debug,
    Display,
};

use serde::{
    Deserialize,
    Serialize,
};

/// A location within the address space of the target process.
/// Whether the address is readable is only known after reading it.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteAddress(pub u64);

impl RemoteAddress {
    pub const NULL: RemoteAddress = RemoteAddress(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    pub const fn offset(self, offset: u64) -> Self {
        Self(self.0.wrapping_add(offset))
    }

    pub fn element(self, index: usize, element_size: usize) -> Self {
        self.offset((index * element_size) as u64)
    }
}

impl From<u64> for RemoteAddress {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl Debug for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteAddress(0x{:X})", self.0)
    }
}
