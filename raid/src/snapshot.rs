use raid_memory::RemoteAddress;
use serde::Serialize;

use crate::{
    Bone,
    EntityKind,
    LifeState,
    PlayerEntity,
    RadarSettings,
    Session,
    Side,
    Wishlist,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GearSnapshot {
    pub slot: String,
    pub template_id: String,
    pub wished: bool,
}

/// Read only copy of an entity handed to renderers once per frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub address: RemoteAddress,
    pub kind: EntityKind,
    pub display_name: String,
    pub side: Side,
    pub group_number: Option<usize>,
    pub focused: bool,

    pub position: Option<[f32; 3]>,
    pub rotation: Option<[f32; 2]>,
    pub bones: Vec<(Bone, [f32; 3])>,

    pub life: LifeState,
    pub error: bool,
    pub watch_reason: Option<String>,
    pub gear: Vec<GearSnapshot>,
}

impl EntitySnapshot {
    pub fn capture(
        player: &PlayerEntity,
        settings: &RadarSettings,
        session: &Session,
        wishlist: &Wishlist,
    ) -> Self {
        let gear = player
            .gear()
            .map(|gear| {
                gear.items
                    .into_iter()
                    .map(|item| GearSnapshot {
                        wished: wishlist.contains(&item.template_id),
                        slot: item.slot,
                        template_id: item.template_id,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            address: player.address(),
            kind: player.kind(),
            display_name: player.display_name(settings).to_string(),
            side: player.side(),
            group_number: player.group_number(),
            focused: session.is_focused(player.address()),

            position: player.position().map(Into::into),
            rotation: player.rotation().map(Into::into),
            bones: player
                .skeleton()
                .poses()
                .into_iter()
                .map(|(bone, position)| (bone, position.into()))
                .collect(),

            life: player.life(),
            error: player.has_error(),
            watch_reason: player.watch_reason().map(str::to_string),
            gear,
        }
    }
}
