use std::collections::HashSet;

use raid_memory::RemoteAddress;
use raid_offsets::{
    Field,
    PlayerField,
    PlayerLayout,
};

use crate::{
    CancellationToken,
    ResolveContext,
    ResolveError,
    ResolveResult,
};

/// Item templates the local player has put onto the wishlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wishlist {
    templates: HashSet<String>,
}

impl Wishlist {
    /// Read the wishlist of the local player.
    /// The token is checked before every entry.
    pub fn refresh(
        ctx: &ResolveContext,
        local_player: RemoteAddress,
        cancellation: &CancellationToken,
    ) -> ResolveResult<Self> {
        let list = ctx.walk(
            Field::Player(PlayerLayout::Local, PlayerField::Wishlist),
            local_player,
        )?;
        let entries = ctx.read_list(list, ctx.table.limits().max_wishlist)?;

        let mut templates = HashSet::with_capacity(entries.len());
        for entry in entries {
            if cancellation.is_cancelled() {
                return Err(ResolveError::Cancelled);
            }

            templates.insert(ctx.read_string(entry)?);
        }

        Ok(Self { templates })
    }

    pub fn contains(&self, template_id: &str) -> bool {
        self.templates.contains(template_id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::Wishlist;
    use crate::{
        test_support::{
            PlayerTemplate,
            TestProcess,
        },
        CancellationToken,
        ResolveError,
    };

    #[test]
    fn reads_local_wishlist() {
        let process = TestProcess::new();
        let local = process.create_player(&PlayerTemplate {
            wishlist: vec!["5c0e874186f7745dc7616606".to_string(), "5b44cf1486f77431723e3d05".to_string()],
            ..PlayerTemplate::local("me")
        });

        let wishlist = Wishlist::refresh(&process.context(), local, &CancellationToken::new()).unwrap();
        assert_eq!(wishlist.len(), 2);
        assert!(wishlist.contains("5c0e874186f7745dc7616606"));
    }

    #[test]
    fn refresh_can_be_cancelled() {
        let process = TestProcess::new();
        let local = process.create_player(&PlayerTemplate {
            wishlist: vec!["5c0e874186f7745dc7616606".to_string()],
            ..PlayerTemplate::local("me")
        });

        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            Wishlist::refresh(&process.context(), local, &token),
            Err(ResolveError::Cancelled)
        );
    }
}
