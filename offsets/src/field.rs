use std::fmt::{
    self,
    Display,
};

/// Player layouts known to the table.
/// Locally controlled and remotely observed players use different structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlayerLayout {
    Local,
    Observed,
}

impl PlayerLayout {
    pub const ALL: [PlayerLayout; 2] = [PlayerLayout::Local, PlayerLayout::Observed];

    pub fn structure_name(self) -> &'static str {
        match self {
            Self::Local => "local_player",
            Self::Observed => "observed_player",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlayerField {
    /// Nickname string object
    Nickname,
    /// Account id string object
    AccountId,
    /// Group id string object
    GroupId,
    /// Side (i32)
    Side,
    /// Slot holding the corpse pointer
    Corpse,
    /// Rotation (yaw, pitch)
    Rotation,
    /// List of bone transforms
    Bones,
    /// Array of equipment slots
    Slots,
    /// List of wished template ids
    Wishlist,
}

impl PlayerField {
    pub const ALL: [PlayerField; 9] = [
        PlayerField::Nickname,
        PlayerField::AccountId,
        PlayerField::GroupId,
        PlayerField::Side,
        PlayerField::Corpse,
        PlayerField::Rotation,
        PlayerField::Bones,
        PlayerField::Slots,
        PlayerField::Wishlist,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Nickname => "nickname",
            Self::AccountId => "account_id",
            Self::GroupId => "group_id",
            Self::Side => "side",
            Self::Corpse => "corpse",
            Self::Rotation => "rotation",
            Self::Bones => "bones",
            Self::Slots => "slots",
            Self::Wishlist => "wishlist",
        }
    }
}

/// What walking a chain yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// The chain ends with a dereference and yields the pointed to object
    Pointer,

    /// The chain ends with an offset and yields the address of a plain value
    Value,
}

/// Symbolic name of a field within a remote structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Module base to the game world
    WorldLocator,
    /// Game world to the list of registered players
    WorldRegisteredPlayers,

    /// Managed list to its backing array
    ListItems,
    /// Managed list to its element count
    ListCount,
    /// Managed array to its element count
    ArrayCount,
    /// Managed array to its first element
    ArrayFirstElement,

    /// Managed string to its length (in UTF-16 units)
    StringLength,
    /// Managed string to its first character
    StringChars,

    /// Object to the nul terminated name of its class
    ObjectClassName,

    Player(PlayerLayout, PlayerField),

    /// Managed transform to the native transform
    TransformInternal,
    /// Native transform to its hierarchy
    TransformHierarchy,
    /// Native transform to its index within the hierarchy
    TransformIndex,
    /// Hierarchy to the vertex buffer
    HierarchyVertices,
    /// Hierarchy to the parent index buffer
    HierarchyParentIndices,

    /// Equipment slot to its name string
    SlotName,
    /// Equipment slot to the contained item
    SlotItem,
    /// Item to its template id string
    ItemTemplateId,
}

impl Field {
    pub fn all() -> Vec<Field> {
        let mut result = vec![
            Field::WorldLocator,
            Field::WorldRegisteredPlayers,
            Field::ListItems,
            Field::ListCount,
            Field::ArrayCount,
            Field::ArrayFirstElement,
            Field::StringLength,
            Field::StringChars,
            Field::ObjectClassName,
            Field::TransformInternal,
            Field::TransformHierarchy,
            Field::TransformIndex,
            Field::HierarchyVertices,
            Field::HierarchyParentIndices,
            Field::SlotName,
            Field::SlotItem,
            Field::ItemTemplateId,
        ];

        for layout in PlayerLayout::ALL {
            for field in PlayerField::ALL {
                result.push(Field::Player(layout, field));
            }
        }

        result
    }

    pub fn structure_name(self) -> &'static str {
        match self {
            Self::WorldLocator | Self::WorldRegisteredPlayers => "game_world",
            Self::ListItems | Self::ListCount => "list",
            Self::ArrayCount | Self::ArrayFirstElement => "array",
            Self::StringLength | Self::StringChars => "string",
            Self::ObjectClassName => "object",
            Self::Player(layout, _) => layout.structure_name(),
            Self::TransformInternal | Self::TransformHierarchy | Self::TransformIndex => {
                "transform"
            }
            Self::HierarchyVertices | Self::HierarchyParentIndices => "hierarchy",
            Self::SlotName | Self::SlotItem => "slot",
            Self::ItemTemplateId => "item",
        }
    }

    pub fn field_name(self) -> &'static str {
        match self {
            Self::WorldLocator => "locator",
            Self::WorldRegisteredPlayers => "registered_players",
            Self::ListItems => "items",
            Self::ListCount | Self::ArrayCount => "count",
            Self::ArrayFirstElement => "first_element",
            Self::StringLength => "length",
            Self::StringChars => "chars",
            Self::ObjectClassName => "class_name",
            Self::Player(_, field) => field.name(),
            Self::TransformInternal => "internal",
            Self::TransformHierarchy => "hierarchy",
            Self::TransformIndex => "index",
            Self::HierarchyVertices => "vertices",
            Self::HierarchyParentIndices => "parent_indices",
            Self::SlotName => "name",
            Self::SlotItem => "item",
            Self::ItemTemplateId => "template_id",
        }
    }

    /// The shape every chain for this field must have, independent of the game build.
    pub fn shape(self) -> FieldShape {
        match self {
            Self::ListCount
            | Self::ArrayCount
            | Self::ArrayFirstElement
            | Self::StringLength
            | Self::StringChars
            | Self::TransformIndex
            | Self::Player(_, PlayerField::Side)
            | Self::Player(_, PlayerField::Corpse)
            | Self::Player(_, PlayerField::Rotation) => FieldShape::Value,
            _ => FieldShape::Pointer,
        }
    }

    /// Observed players do not carry a wishlist.
    pub fn is_required(self) -> bool {
        !matches!(
            self,
            Self::Player(PlayerLayout::Observed, PlayerField::Wishlist)
        )
    }
}

impl Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.structure_name(), self.field_name())
    }
}
