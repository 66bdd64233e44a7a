//! Builders for a fake target process backed by a `MemoryImage`.

use std::{
    collections::HashMap,
    sync::{
        atomic::{
            AtomicU64,
            Ordering,
        },
        Arc,
        Mutex,
    },
};

use raid_memory::{
    MemoryAccess,
    MemoryAccessExt,
    MemoryImage,
    RemoteAddress,
};
use raid_offsets::{
    Field,
    OffsetStep,
    OffsetTable,
    PlayerField,
};

use crate::{
    EntityKind,
    ResolveContext,
};

pub const MODULE_BASE: RemoteAddress = RemoteAddress(0x7FF0_0000_0000);
const BLOCK_SIZE: usize = 0x1000;
const BONE_COUNT: usize = 17;

#[derive(Debug, Clone)]
pub struct TestSkeleton {
    pub list: RemoteAddress,
    pub managed: Vec<RemoteAddress>,
    pub internals: Vec<RemoteAddress>,
    pub hierarchy: RemoteAddress,
    pub vertices: RemoteAddress,
}

#[derive(Debug, Clone)]
pub struct PlayerTemplate {
    pub kind: EntityKind,
    pub nickname: String,
    pub account_id: String,
    pub group_id: String,
    pub side: i32,
    pub rotation: [f32; 2],
    pub position: [f32; 3],
    pub gear: Vec<(String, Option<String>)>,
    pub wishlist: Vec<String>,
}

impl PlayerTemplate {
    pub fn observed(nickname: &str) -> Self {
        Self {
            kind: EntityKind::Observed,
            nickname: nickname.to_string(),
            account_id: format!("{}-account", nickname),
            group_id: String::new(),
            side: 4,
            rotation: [180.0, 0.0],
            position: [0.0, 0.0, 0.0],
            gear: Vec::new(),
            wishlist: Vec::new(),
        }
    }

    pub fn local(nickname: &str) -> Self {
        Self {
            kind: EntityKind::Local,
            side: 1,
            ..Self::observed(nickname)
        }
    }
}

pub struct TestProcess {
    pub image: Arc<MemoryImage>,
    pub table: Arc<OffsetTable>,
    next_block: AtomicU64,
    skeletons: Mutex<HashMap<RemoteAddress, TestSkeleton>>,
}

impl TestProcess {
    pub fn new() -> Self {
        let table = OffsetTable::from_json(include_str!("../../offsets/tables/sample.json"))
            .expect("sample table to be valid");

        let image = MemoryImage::new();
        image.register_module(table.module(), MODULE_BASE);
        image.write_bytes(MODULE_BASE, &[0u8; BLOCK_SIZE]);

        Self {
            image: Arc::new(image),
            table: Arc::new(table),
            next_block: AtomicU64::new(0x10_0000_0000),
            skeletons: Default::default(),
        }
    }

    pub fn context(&self) -> ResolveContext<'_> {
        ResolveContext::new(&*self.image, &self.table)
    }

    pub fn memory(&self) -> Arc<dyn MemoryAccess> {
        self.image.clone()
    }

    pub fn allocate(&self) -> RemoteAddress {
        let address = RemoteAddress(
            self.next_block
                .fetch_add(BLOCK_SIZE as u64, Ordering::Relaxed),
        );
        self.allocate_at(address);
        address
    }

    pub fn allocate_at(&self, address: RemoteAddress) {
        self.image.write_bytes(address, &[0u8; BLOCK_SIZE]);
    }

    /// Follow the chain of `field` from `base` and create every missing object on the way.
    /// The final pointer of pointer chains is set to `target`.
    /// Returns the address the chain resolves to.
    fn plant(&self, base: RemoteAddress, field: Field, target: Option<RemoteAddress>) -> RemoteAddress {
        let chain = self.table.chain(field).expect("field to be present");
        let steps = chain.steps();

        let mut address = base;
        for (index, step) in steps.iter().enumerate() {
            address = match step {
                OffsetStep::Add(offset) => address.offset(*offset),
                OffsetStep::Deref if index + 1 == steps.len() => {
                    let target = target.expect("pointer chains to have a target");
                    self.image.write_pointer(address, target);
                    target
                }
                OffsetStep::Deref => match self.image.read::<RemoteAddress>(address) {
                    Ok(next) if !next.is_null() => next,
                    _ => {
                        let next = self.allocate();
                        self.image.write_pointer(address, next);
                        next
                    }
                },
            };
        }

        address
    }

    pub fn plant_pointer(&self, base: RemoteAddress, field: Field, target: RemoteAddress) {
        self.plant(base, field, Some(target));
    }

    /// Address of a value field, creating the objects leading to it.
    pub fn plant_value(&self, base: RemoteAddress, field: Field) -> RemoteAddress {
        self.plant(base, field, None)
    }

    pub fn create_string(&self, value: &str) -> RemoteAddress {
        let string = self.allocate();
        let length = self.plant_value(string, Field::StringLength);
        self.image
            .write_i32(length, value.encode_utf16().count() as i32);

        let chars = self.plant_value(string, Field::StringChars);
        self.image.write_utf16(chars, value);
        string
    }

    fn create_class_name(&self, object: RemoteAddress, class_name: &str) {
        let name = self.allocate();
        self.image.write_bytes(name, class_name.as_bytes());
        self.plant_pointer(object, Field::ObjectClassName, name);
    }

    pub fn create_object(&self, class_name: &str) -> RemoteAddress {
        let object = self.allocate();
        self.create_class_name(object, class_name);
        object
    }

    pub fn create_array(&self, elements: &[RemoteAddress]) -> RemoteAddress {
        let array = self.allocate();
        let count = self.plant_value(array, Field::ArrayCount);
        self.image.write_i32(count, elements.len() as i32);

        let first = self.plant_value(array, Field::ArrayFirstElement);
        for (index, element) in elements.iter().enumerate() {
            self.image.write_pointer(first.element(index, 8), *element);
        }

        array
    }

    pub fn create_list(&self, elements: &[RemoteAddress]) -> RemoteAddress {
        let list = self.allocate();
        let items = self.create_array(elements);
        self.plant_pointer(list, Field::ListItems, items);

        let count = self.plant_value(list, Field::ListCount);
        self.image.write_i32(count, elements.len() as i32);
        list
    }

    /// Hierarchy with the root at `position` and every other bone
    /// offset along the y axis relative to the root.
    fn create_hierarchy(&self, position: [f32; 3]) -> (RemoteAddress, RemoteAddress) {
        let vertices = self.allocate();
        for index in 0..BONE_COUNT {
            let translation = if index == 0 {
                position
            } else {
                [0.0, 0.1 * index as f32, 0.0]
            };

            #[rustfmt::skip]
            let vertex = [
                translation[0], translation[1], translation[2], 0.0,
                0.0, 0.0, 0.0, 1.0,
                1.0, 1.0, 1.0, 0.0,
            ];
            self.image
                .write_f32_slice(vertices.element(index, 0x30), &vertex);
        }

        let parents = self.allocate();
        let parent_indices = (0..BONE_COUNT)
            .map(|index| if index == 0 { -1 } else { 0 })
            .collect::<Vec<i32>>();
        self.image.write_i32_slice(parents, &parent_indices);

        let hierarchy = self.allocate();
        self.plant_pointer(hierarchy, Field::HierarchyVertices, vertices);
        self.plant_pointer(hierarchy, Field::HierarchyParentIndices, parents);
        (hierarchy, vertices)
    }

    pub fn create_skeleton(&self, position: [f32; 3]) -> TestSkeleton {
        let (hierarchy, vertices) = self.create_hierarchy(position);

        let mut managed = Vec::with_capacity(BONE_COUNT);
        let mut internals = Vec::with_capacity(BONE_COUNT);
        for index in 0..BONE_COUNT {
            let transform = self.allocate();
            let internal = self.allocate();
            self.plant_pointer(transform, Field::TransformInternal, internal);
            self.plant_pointer(internal, Field::TransformHierarchy, hierarchy);

            let transform_index = self.plant_value(internal, Field::TransformIndex);
            self.image.write_i32(transform_index, index as i32);

            managed.push(transform);
            internals.push(internal);
        }

        TestSkeleton {
            list: self.create_list(&managed),
            managed,
            internals,
            hierarchy,
            vertices,
        }
    }

    /// Move all transforms of the skeleton into a new hierarchy.
    pub fn relocate_skeleton(&self, skeleton: &TestSkeleton, position: [f32; 3]) -> TestSkeleton {
        let (hierarchy, vertices) = self.create_hierarchy(position);
        for internal in skeleton.internals.iter() {
            self.plant_pointer(*internal, Field::TransformHierarchy, hierarchy);
        }

        TestSkeleton {
            hierarchy,
            vertices,
            ..skeleton.clone()
        }
    }

    pub fn create_gear(&self, slots: &[(&str, Option<&str>)]) -> RemoteAddress {
        let slots = slots
            .iter()
            .map(|(name, template_id)| {
                let slot = self.allocate();
                let name = self.create_string(name);
                self.plant_pointer(slot, Field::SlotName, name);

                if let Some(template_id) = template_id {
                    let item = self.allocate();
                    let template_id = self.create_string(template_id);
                    self.plant_pointer(item, Field::ItemTemplateId, template_id);
                    self.plant_pointer(slot, Field::SlotItem, item);
                }

                slot
            })
            .collect::<Vec<_>>();

        self.create_array(&slots)
    }

    pub fn create_player(&self, template: &PlayerTemplate) -> RemoteAddress {
        let address = self.allocate();
        self.create_player_at(address, template);
        address
    }

    pub fn create_player_at(&self, address: RemoteAddress, template: &PlayerTemplate) {
        self.allocate_at(address);

        let field = |field: PlayerField| template.kind.field(field);
        let tags = self.table.type_tags();
        let class_name = match template.kind {
            EntityKind::Local => tags.local.clone(),
            EntityKind::Observed => tags.observed.clone(),
        };
        self.create_class_name(address, &class_name);

        let nickname = self.create_string(&template.nickname);
        self.plant_pointer(address, field(PlayerField::Nickname), nickname);

        let account_id = self.create_string(&template.account_id);
        self.plant_pointer(address, field(PlayerField::AccountId), account_id);

        if !template.group_id.is_empty() {
            let group_id = self.create_string(&template.group_id);
            self.plant_pointer(address, field(PlayerField::GroupId), group_id);
        }

        let side = self.plant_value(address, field(PlayerField::Side));
        self.image.write_i32(side, template.side);

        /* alive players have no corpse */
        self.plant_value(address, field(PlayerField::Corpse));

        let rotation = self.plant_value(address, field(PlayerField::Rotation));
        self.image.write_f32_slice(rotation, &template.rotation);

        let skeleton = self.create_skeleton(template.position);
        self.plant_pointer(address, field(PlayerField::Bones), skeleton.list);

        match template.kind {
            EntityKind::Observed => {
                let gear = template
                    .gear
                    .iter()
                    .map(|(slot, item)| (slot.as_str(), item.as_deref()))
                    .collect::<Vec<_>>();
                let slots = self.create_gear(&gear);
                self.plant_pointer(address, field(PlayerField::Slots), slots);
            }
            EntityKind::Local => {
                let entries = template
                    .wishlist
                    .iter()
                    .map(|template_id| self.create_string(template_id))
                    .collect::<Vec<_>>();
                let wishlist = self.create_list(&entries);
                self.plant_pointer(address, field(PlayerField::Wishlist), wishlist);
            }
        }

        self.skeletons
            .lock()
            .unwrap()
            .insert(address, skeleton);
    }

    pub fn skeleton_of(&self, player: RemoteAddress) -> TestSkeleton {
        self.skeletons
            .lock()
            .unwrap()
            .get(&player)
            .cloned()
            .expect("player to be created by this process")
    }

    pub fn corpse_slot(&self, player: RemoteAddress, kind: EntityKind) -> RemoteAddress {
        self.plant_value(player, kind.field(PlayerField::Corpse))
    }

    pub fn rotation_address(&self, player: RemoteAddress, kind: EntityKind) -> RemoteAddress {
        self.plant_value(player, kind.field(PlayerField::Rotation))
    }

    pub fn create_world(&self, players: &[RemoteAddress]) -> RemoteAddress {
        let world = self.allocate();
        self.plant_pointer(MODULE_BASE, Field::WorldLocator, world);
        self.set_activity(world, players);
        world
    }

    pub fn set_activity(&self, world: RemoteAddress, players: &[RemoteAddress]) {
        let list = self.create_list(players);
        self.plant_pointer(world, Field::WorldRegisteredPlayers, list);
    }

    pub fn remove_world(&self) {
        self.plant_pointer(MODULE_BASE, Field::WorldLocator, RemoteAddress::NULL);
    }
}
