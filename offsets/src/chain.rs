use std::{
    fmt::{
        self,
        Display,
    },
    str::FromStr,
};

use raid_memory::{
    MemoryAccess,
    MemoryAccessExt,
    RemoteAddress,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    BrokenChain,
    OffsetError,
};

/// Maximum amount of steps a single chain may contain.
pub const MAX_CHAIN_LENGTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetStep {
    /// Advance the current address by a byte offset
    Add(u64),

    /// Replace the current address with the pointer stored at it
    Deref,
}

/// An ordered list of steps resolving a field address from a base address.
///
/// Textual form: whitespace separated steps where `*` dereferences and
/// any number (decimal or `0x` prefixed hex) adds a byte offset.
/// Example: `0x10 * 0x28` reads the pointer at `base + 0x10` and returns `pointer + 0x28`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OffsetChain {
    steps: Vec<OffsetStep>,
}

impl OffsetChain {
    pub fn new(steps: Vec<OffsetStep>) -> Result<Self, OffsetError> {
        if steps.len() > MAX_CHAIN_LENGTH {
            return Err(OffsetError::ChainTooLong {
                length: steps.len(),
                limit: MAX_CHAIN_LENGTH,
            });
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[OffsetStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn ends_with_deref(&self) -> bool {
        matches!(self.steps.last(), Some(OffsetStep::Deref))
    }

    /// The chain without its final dereference.
    /// Walking it yields the address of the pointer the full chain would follow last.
    pub fn pointer_slot(&self) -> Option<OffsetChain> {
        if !self.ends_with_deref() {
            return None;
        }

        Some(Self {
            steps: self.steps[..self.steps.len() - 1].to_vec(),
        })
    }

    /// Resolve the target address starting at `base`.
    /// Fails on the first link which can not be read. No reads beyond that link will be issued.
    pub fn walk(
        &self,
        memory: &dyn MemoryAccess,
        base: RemoteAddress,
    ) -> Result<RemoteAddress, BrokenChain> {
        let mut address = base;
        for (step, entry) in self.steps.iter().enumerate() {
            address = match entry {
                OffsetStep::Add(offset) => address.offset(*offset),
                OffsetStep::Deref => memory
                    .read_pointer(address)
                    .map_err(|source| BrokenChain {
                        step,
                        address,
                        source,
                    })?,
            };
        }

        Ok(address)
    }
}

impl FromStr for OffsetChain {
    type Err = OffsetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let steps = value
            .split_whitespace()
            .map(|token| {
                if token == "*" {
                    return Ok(OffsetStep::Deref);
                }

                let number = token.trim_start_matches('+');
                let offset = if let Some(hex) = number
                    .strip_prefix("0x")
                    .or_else(|| number.strip_prefix("0X"))
                {
                    u64::from_str_radix(hex, 16)
                } else {
                    number.parse::<u64>()
                };

                offset
                    .map(OffsetStep::Add)
                    .map_err(|_| OffsetError::InvalidStep(token.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(steps)
    }
}

impl TryFrom<String> for OffsetChain {
    type Error = OffsetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OffsetChain> for String {
    fn from(value: OffsetChain) -> Self {
        value.to_string()
    }
}

impl Display for OffsetChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            if index > 0 {
                write!(f, " ")?;
            }

            match step {
                OffsetStep::Add(offset) => write!(f, "0x{:X}", offset)?,
                OffsetStep::Deref => write!(f, "*")?,
            }
        }

        Ok(())
    }
}
