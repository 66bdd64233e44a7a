use std::time::Instant;

use raid_memory::{
    MemoryError,
    RemoteAddress,
};
use raid_offsets::Field;

use crate::{
    ResolveContext,
    ResolveError,
    ResolveResult,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GearItem {
    pub slot: String,
    pub template_id: String,
}

/// Equipment of a player as of `refreshed_at`.
#[derive(Debug, Clone)]
pub struct Gear {
    pub items: Vec<GearItem>,
    pub refreshed_at: Instant,
}

impl Gear {
    /// Read all occupied slots of the equipment slot array.
    pub fn resolve(ctx: &ResolveContext, slots: RemoteAddress) -> ResolveResult<Self> {
        let slots = ctx.read_array(slots, ctx.table.limits().max_slots)?;

        let mut items = Vec::with_capacity(slots.len());
        for slot in slots {
            let item = match ctx.walk(Field::SlotItem, slot) {
                Ok(item) => item,
                Err(ResolveError::BrokenChain { source, .. })
                    if matches!(source.source, MemoryError::NullPointer { .. }) =>
                {
                    /* empty slot */
                    continue;
                }
                Err(err) => return Err(err),
            };

            items.push(GearItem {
                slot: ctx.read_string_field(Field::SlotName, slot)?,
                template_id: ctx.read_string_field(Field::ItemTemplateId, item)?,
            });
        }

        Ok(Self {
            items,
            refreshed_at: Instant::now(),
        })
    }
}
