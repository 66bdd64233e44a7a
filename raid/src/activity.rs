use std::collections::HashSet;

use raid_memory::RemoteAddress;
use raid_offsets::Field;

use crate::{
    ResolveContext,
    ResolveError,
    ResolveResult,
};

/// Locate the currently active game world.
pub fn locate_world(ctx: &ResolveContext) -> ResolveResult<RemoteAddress> {
    let module = ctx
        .memory
        .module_base(ctx.table.module())
        .map_err(ResolveError::unreadable("game module"))?;

    ctx.walk(Field::WorldLocator, module)
}

/// Players the game world currently considers registered.
#[derive(Debug, Clone, Default)]
pub struct ActivitySet {
    order: Vec<RemoteAddress>,
    members: HashSet<RemoteAddress>,
}

impl ActivitySet {
    pub fn read(ctx: &ResolveContext, world: RemoteAddress) -> ResolveResult<Self> {
        let list = ctx.walk(Field::WorldRegisteredPlayers, world)?;
        let players = ctx.read_list(list, ctx.table.limits().max_players)?;
        Ok(Self::from_addresses(players))
    }

    pub fn from_addresses(addresses: impl IntoIterator<Item = RemoteAddress>) -> Self {
        let mut result = Self::default();
        for address in addresses {
            if address.is_null() || !result.members.insert(address) {
                continue;
            }

            result.order.push(address);
        }

        result
    }

    pub fn contains(&self, address: RemoteAddress) -> bool {
        self.members.contains(&address)
    }

    /// Addresses in the order the game registered them
    pub fn addresses(&self) -> &[RemoteAddress] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
