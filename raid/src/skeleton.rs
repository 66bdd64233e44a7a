use nalgebra::Vector3;
use raid_memory::RemoteAddress;
use raid_offsets::Field;
use serde::Serialize;

use crate::{
    ResolveContext,
    ResolveError,
    ResolveResult,
    Transform,
    TransformSlot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Bone {
    Root,
    Pelvis,
    Spine,
    Neck,
    Head,
    LeftUpperArm,
    LeftForearm,
    LeftHand,
    RightUpperArm,
    RightForearm,
    RightHand,
    LeftThigh,
    LeftCalf,
    LeftFoot,
    RightThigh,
    RightCalf,
    RightFoot,
}

impl Bone {
    pub const ALL: [Bone; 17] = [
        Bone::Root,
        Bone::Pelvis,
        Bone::Spine,
        Bone::Neck,
        Bone::Head,
        Bone::LeftUpperArm,
        Bone::LeftForearm,
        Bone::LeftHand,
        Bone::RightUpperArm,
        Bone::RightForearm,
        Bone::RightHand,
        Bone::LeftThigh,
        Bone::LeftCalf,
        Bone::LeftFoot,
        Bone::RightThigh,
        Bone::RightCalf,
        Bone::RightFoot,
    ];

    /// Name of the bone within the offset table bone map
    pub fn name(self) -> &'static str {
        match self {
            Bone::Root => "root",
            Bone::Pelvis => "pelvis",
            Bone::Spine => "spine",
            Bone::Neck => "neck",
            Bone::Head => "head",
            Bone::LeftUpperArm => "left_upper_arm",
            Bone::LeftForearm => "left_forearm",
            Bone::LeftHand => "left_hand",
            Bone::RightUpperArm => "right_upper_arm",
            Bone::RightForearm => "right_forearm",
            Bone::RightHand => "right_hand",
            Bone::LeftThigh => "left_thigh",
            Bone::LeftCalf => "left_calf",
            Bone::LeftFoot => "left_foot",
            Bone::RightThigh => "right_thigh",
            Bone::RightCalf => "right_calf",
            Bone::RightFoot => "right_foot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkeletonProfile {
    RootOnly,
    Full,
}

impl SkeletonProfile {
    pub fn bones(self) -> &'static [Bone] {
        match self {
            SkeletonProfile::RootOnly => &[Bone::Root],
            SkeletonProfile::Full => &Bone::ALL,
        }
    }
}

pub struct Skeleton {
    /* the root is always the first entry */
    bones: Vec<(Bone, TransformSlot)>,
}

impl Skeleton {
    /// Resolve the bones of `profile` from the managed bone list.
    /// Only the root bone is mandatory, every other bone is skipped if it can not be resolved.
    pub fn resolve(
        ctx: &ResolveContext,
        bone_list: RemoteAddress,
        profile: SkeletonProfile,
    ) -> ResolveResult<Self> {
        let transforms = ctx.read_list(bone_list, ctx.table.limits().max_bones)?;

        let mut bones = Vec::with_capacity(profile.bones().len());
        for bone in profile.bones().iter().copied() {
            match Self::resolve_bone(ctx, &transforms, bone) {
                Ok(slot) => bones.push((bone, slot)),
                Err(err) if bone == Bone::Root => return Err(err),
                Err(err) => {
                    log::debug!("Skipping bone {:?} of {}: {}", bone, bone_list, err);
                }
            }
        }

        Ok(Self { bones })
    }

    fn resolve_bone(
        ctx: &ResolveContext,
        transforms: &[RemoteAddress],
        bone: Bone,
    ) -> ResolveResult<TransformSlot> {
        let managed = ctx
            .table
            .bone_index(bone.name())
            .and_then(|index| transforms.get(index))
            .copied()
            .ok_or_else(|| {
                ResolveError::implausible(
                    "bone index",
                    format!("{} not present in {} transforms", bone.name(), transforms.len()),
                )
            })?;

        let internal = ctx.walk(Field::TransformInternal, managed)?;
        let transform = Transform::resolve(ctx, internal)?;
        Ok(TransformSlot::new(managed, transform))
    }

    pub fn root(&self) -> &TransformSlot {
        &self.bones[0].1
    }

    pub fn bones(&self) -> &[(Bone, TransformSlot)] {
        &self.bones
    }

    pub fn bone(&self, bone: Bone) -> Option<&TransformSlot> {
        self.bones
            .iter()
            .find(|(entry, _)| *entry == bone)
            .map(|(_, slot)| slot)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Last known positions of all resolved bones
    pub fn poses(&self) -> Vec<(Bone, Vector3<f32>)> {
        self.bones
            .iter()
            .filter_map(|(bone, slot)| Some((*bone, slot.current().last_pose()?)))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use raid_memory::RemoteAddress;

    use super::{
        Bone,
        Skeleton,
        SkeletonProfile,
    };
    use crate::test_support::TestProcess;

    #[test]
    fn resolves_profiles() {
        let process = TestProcess::new();
        let skeleton = process.create_skeleton([0.0, 0.0, 0.0]);
        let context = process.context();

        let root_only = Skeleton::resolve(&context, skeleton.list, SkeletonProfile::RootOnly).unwrap();
        assert_eq!(root_only.len(), 1);
        assert_eq!(root_only.root().managed(), skeleton.managed[0]);

        let full = Skeleton::resolve(&context, skeleton.list, SkeletonProfile::Full).unwrap();
        assert_eq!(full.len(), Bone::ALL.len());
        assert_eq!(
            full.bone(Bone::Head).unwrap().current().index(),
            4
        );
    }

    #[test]
    fn skips_broken_bones_but_not_the_root() {
        let process = TestProcess::new();
        let skeleton = process.create_skeleton([0.0, 0.0, 0.0]);
        let context = process.context();

        /* break the internal pointer of the head */
        process
            .image
            .write_pointer(skeleton.managed[4].offset(0x10), RemoteAddress::NULL);
        let full = Skeleton::resolve(&context, skeleton.list, SkeletonProfile::Full).unwrap();
        assert_eq!(full.len(), Bone::ALL.len() - 1);
        assert!(full.bone(Bone::Head).is_none());

        process
            .image
            .write_pointer(skeleton.managed[0].offset(0x10), RemoteAddress::NULL);
        assert!(Skeleton::resolve(&context, skeleton.list, SkeletonProfile::Full).is_err());
    }
}
