use raid_offsets::{
    Field,
    PlayerField,
    PlayerLayout,
    TypeTags,
};
use serde::Serialize;

use crate::{
    RadarSettings,
    SkeletonProfile,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// The player controlled by the local client
    Local,

    /// Any other player replicated to the local client
    Observed,
}

impl EntityKind {
    pub fn from_class_name(class_name: &str, tags: &TypeTags) -> Option<Self> {
        if class_name == tags.local {
            Some(EntityKind::Local)
        } else if class_name == tags.observed {
            Some(EntityKind::Observed)
        } else {
            None
        }
    }

    pub fn layout(self) -> PlayerLayout {
        match self {
            EntityKind::Local => PlayerLayout::Local,
            EntityKind::Observed => PlayerLayout::Observed,
        }
    }

    pub fn field(self, field: PlayerField) -> Field {
        Field::Player(self.layout(), field)
    }

    pub fn capabilities(self, settings: &RadarSettings) -> Capabilities {
        let full_skeleton = match self {
            EntityKind::Local => settings.local_skeleton,
            EntityKind::Observed => settings.skeleton,
        };

        Capabilities {
            skeleton: if full_skeleton {
                SkeletonProfile::Full
            } else {
                SkeletonProfile::RootOnly
            },
            gear: self == EntityKind::Observed && settings.gear,
            wishlist: self == EntityKind::Local,
            rotation: self.field(PlayerField::Rotation),
            name: self.field(PlayerField::Nickname),
        }
    }
}

/// Behaviour selected per entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub skeleton: SkeletonProfile,
    pub gear: bool,
    pub wishlist: bool,
    pub rotation: Field,
    pub name: Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Usec,
    Bear,
    Scav,
    Unknown(i32),
}

impl From<i32> for Side {
    fn from(value: i32) -> Self {
        match value {
            1 => Side::Usec,
            2 => Side::Bear,
            4 => Side::Scav,
            value => Side::Unknown(value),
        }
    }
}
