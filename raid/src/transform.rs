use std::sync::{
    atomic::{
        AtomicBool,
        Ordering,
    },
    Arc,
    Mutex,
    RwLock,
};

use nalgebra::{
    Quaternion,
    UnitQuaternion,
    Vector3,
    Vector4,
};
use raid_memory::{
    MemoryAccessExt,
    MemoryValue,
    RemoteAddress,
};
use raid_offsets::Field;

use crate::{
    sync::{
        lock,
        read,
        write,
    },
    ResolveContext,
    ResolveError,
    ResolveResult,
};

/// One element of a transform hierarchy vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformVertex {
    pub translation: Vector4<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector4<f32>,
}

impl MemoryValue for TransformVertex {
    const SIZE: usize = 0x30;

    fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            translation: Vector4::from_bytes(&bytes[0x00..0x10]),
            rotation: Quaternion::from_bytes(&bytes[0x10..0x20]),
            scale: Vector4::from_bytes(&bytes[0x20..0x30]),
        }
    }
}

/// Compute the world position of the vertex at `index` by
/// walking up the hierarchy until the root has been reached.
pub fn compute_position(
    vertices: &[TransformVertex],
    parent_indices: &[i32],
    index: usize,
) -> ResolveResult<Vector3<f32>> {
    let vertex = vertices.get(index).ok_or_else(|| {
        ResolveError::implausible(
            "transform index",
            format!("{} exceeds {} vertices", index, vertices.len()),
        )
    })?;

    let mut position = vertex.translation.xyz();
    let mut parent = parent_indices.get(index).copied().unwrap_or(-1);

    /* every vertex can be visited at most once, anything else is a cycle */
    let mut remaining = vertices.len();
    while parent >= 0 {
        if remaining == 0 {
            return Err(ResolveError::implausible(
                "parent indices",
                "hierarchy contains a cycle",
            ));
        }
        remaining -= 1;

        let parent_index = parent as usize;
        let parent_vertex = vertices.get(parent_index).ok_or_else(|| {
            ResolveError::implausible(
                "parent index",
                format!("{} exceeds {} vertices", parent_index, vertices.len()),
            )
        })?;

        let rotation = UnitQuaternion::from_quaternion(parent_vertex.rotation);
        position = rotation * position.component_mul(&parent_vertex.scale.xyz())
            + parent_vertex.translation.xyz();

        parent = parent_indices.get(parent_index).copied().unwrap_or(-1);
    }

    if !position.iter().all(|value| value.is_finite()) {
        return Err(ResolveError::implausible(
            "transform position",
            format!("{:?}", position),
        ));
    }

    Ok(position)
}

/// Cached addresses of a native transform.
///
/// A transform never changes its addresses. If the game relocates the
/// hierarchy a new `Transform` is resolved and replaces this one.
#[derive(Debug)]
pub struct Transform {
    internal: RemoteAddress,

    hierarchy_slot: RemoteAddress,
    hierarchy: RemoteAddress,

    vertices_slot: RemoteAddress,
    vertices: RemoteAddress,

    index: usize,
    parent_indices: Vec<i32>,

    pose: Mutex<Option<Vector3<f32>>>,
}

impl Transform {
    pub fn resolve(ctx: &ResolveContext, internal: RemoteAddress) -> ResolveResult<Self> {
        let hierarchy_slot = ctx.walk_pointer_slot(Field::TransformHierarchy, internal)?;
        let hierarchy = ctx
            .memory
            .read_pointer(hierarchy_slot)
            .map_err(ResolveError::unreadable("transform hierarchy"))?;

        let index = ctx.read_value::<i32>(Field::TransformIndex, internal)?;
        let max_vertices = ctx.table.limits().max_vertices;
        if index < 0 || index as usize >= max_vertices {
            return Err(ResolveError::implausible(
                "transform index",
                format!("{} (limit {})", index, max_vertices),
            ));
        }
        let index = index as usize;

        let vertices_slot = ctx.walk_pointer_slot(Field::HierarchyVertices, hierarchy)?;
        let vertices = ctx
            .memory
            .read_pointer(vertices_slot)
            .map_err(ResolveError::unreadable("hierarchy vertices"))?;

        let parent_indices = ctx.walk(Field::HierarchyParentIndices, hierarchy)?;
        let parent_indices = ctx
            .memory
            .read_vec::<i32>(parent_indices, index + 1)
            .map_err(ResolveError::unreadable("hierarchy parent indices"))?;

        Ok(Self {
            internal,

            hierarchy_slot,
            hierarchy,

            vertices_slot,
            vertices,

            index,
            parent_indices,

            pose: Mutex::new(None),
        })
    }

    pub fn internal(&self) -> RemoteAddress {
        self.internal
    }

    pub fn hierarchy(&self) -> RemoteAddress {
        self.hierarchy
    }

    /// Address holding the hierarchy pointer
    pub fn hierarchy_slot(&self) -> RemoteAddress {
        self.hierarchy_slot
    }

    pub fn vertices(&self) -> RemoteAddress {
        self.vertices
    }

    /// Address holding the vertex buffer pointer
    pub fn vertices_slot(&self) -> RemoteAddress {
        self.vertices_slot
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn vertex_count(&self) -> usize {
        self.index + 1
    }

    /// Compute and cache the pose from a freshly read vertex buffer.
    pub fn apply_vertices(&self, vertices: &[TransformVertex]) -> ResolveResult<Vector3<f32>> {
        let position = compute_position(vertices, &self.parent_indices, self.index)?;
        *lock(&self.pose) = Some(position);
        Ok(position)
    }

    pub fn last_pose(&self) -> Option<Vector3<f32>> {
        *lock(&self.pose)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStatus {
    Resolved,
    Stale,
}

/// A transform of an entity which may be replaced once it went stale.
pub struct TransformSlot {
    managed: RemoteAddress,
    current: RwLock<Arc<Transform>>,
    stale: AtomicBool,
}

impl TransformSlot {
    pub fn new(managed: RemoteAddress, transform: Transform) -> Self {
        Self {
            managed,
            current: RwLock::new(Arc::new(transform)),
            stale: AtomicBool::new(false),
        }
    }

    /// Address of the managed transform object owning the native transform
    pub fn managed(&self) -> RemoteAddress {
        self.managed
    }

    pub fn current(&self) -> Arc<Transform> {
        read(&self.current).clone()
    }

    pub fn status(&self) -> TransformStatus {
        if self.stale.load(Ordering::Relaxed) {
            TransformStatus::Stale
        } else {
            TransformStatus::Resolved
        }
    }

    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Relaxed);
    }

    /// Replace the cached transform. The last known pose is carried over.
    pub fn replace(&self, transform: Transform) {
        let mut current = write(&self.current);
        if let Some(pose) = current.last_pose() {
            *lock(&transform.pose) = Some(pose);
        }

        *current = Arc::new(transform);
        self.stale.store(false, Ordering::Relaxed);
    }

    /// Resolve the native transform of this slot again.
    pub fn resolve_again(&self, ctx: &ResolveContext) -> ResolveResult<()> {
        let internal = ctx.walk(Field::TransformInternal, self.managed)?;
        let transform = Transform::resolve(ctx, internal)?;
        log::debug!(
            "Transform {} re-resolved (hierarchy {} -> {})",
            self.managed,
            self.current().hierarchy(),
            transform.hierarchy()
        );

        self.replace(transform);
        Ok(())
    }
}
