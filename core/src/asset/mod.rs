//! Asset handles and the components attached to their entities.
//!
//! An [`Asset`] is a cheap, clonable handle. The data it points at lives in
//! the [`AssetLoader`](crate::AssetLoader)'s store; once the asset is
//! destroyed every query through any clone of the handle fails with
//! [`AssetError::UseAfterDestroy`].

mod store;

use std::sync::Arc;

use nalgebra::Matrix4;

use crate::engine::{BufferId, TextureId};
use crate::entity::Entity;
use crate::error::AssetError;
use crate::gltf::{BufferSource, ImageSource};
use crate::material::MaterialInstance;
use crate::mesh::{BoundingBox, PrimitiveTopology, VertexLayout};

pub(crate) use store::{AssetStore, LoadedAsset, SlotTable};

/// Generational index of an asset inside its loader's store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetId {
    index: u32,
    generation: u32,
}

impl AssetId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the store.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when the asset was created.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Asset({}@{})", self.index, self.generation)
    }
}

/// Local and world transform of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformComponent {
    /// Transform relative to the parent entity.
    pub local: Matrix4<f32>,
    /// Composed transform from the asset root.
    pub world: Matrix4<f32>,
}

impl TransformComponent {
    /// Identity local and world transform.
    pub fn identity() -> Self {
        Self {
            local: Matrix4::identity(),
            world: Matrix4::identity(),
        }
    }
}

/// Index of a resource slot inside one asset.
///
/// Buffers come first, then images, then mesh primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// One primitive of a [`Renderable`].
#[derive(Debug, Clone)]
pub struct RenderPrimitive {
    /// Primitive topology, `None` for modes that cannot be rendered.
    pub topology: Option<PrimitiveTopology>,
    /// Material instance, shared with every equal description.
    pub material: Arc<MaterialInstance>,
    /// Bounds from the POSITION accessor's `min`/`max`, if present.
    pub bounds: Option<BoundingBox>,
    /// Slot holding the primitive's geometry.
    pub slot: SlotId,
}

/// Renderable component: the primitives of the mesh a node references.
#[derive(Debug, Clone)]
pub struct Renderable {
    /// Primitives in mesh declaration order.
    pub primitives: Vec<RenderPrimitive>,
}

/// Why a resource slot failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceFailure {
    /// No record was registered for the URI.
    Missing {
        /// The referenced URI.
        uri: String,
    },
    /// The bytes were present but could not be decoded.
    Decode {
        /// What went wrong.
        reason: String,
    },
    /// A slot this one reads from failed.
    MissingDependency {
        /// The failed slot.
        dependency: SlotId,
    },
    /// The load was cancelled before the slot was applied.
    Cancelled,
}

impl ResourceFailure {
    /// The error reported for a slot with this failure.
    pub fn to_error(&self, resource: &str) -> AssetError {
        match self {
            Self::Missing { uri } => AssetError::MissingResource { uri: uri.clone() },
            Self::Decode { reason } => AssetError::decode(resource, reason.as_str()),
            Self::MissingDependency { dependency } => {
                AssetError::decode(resource, format!("depends on failed {dependency}"))
            }
            Self::Cancelled => AssetError::decode(resource, "load cancelled"),
        }
    }
}

impl std::fmt::Display for ResourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing { uri } => write!(f, "missing '{uri}'"),
            Self::Decode { reason } => write!(f, "decode failed: {reason}"),
            Self::MissingDependency { dependency } => write!(f, "{dependency} failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Resolution state of a resource slot.
///
/// `Unresolved → Resolving → Resolved | Failed`. Terminal states never
/// change again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResourceState {
    /// Not yet attempted.
    #[default]
    Unresolved,
    /// Work for the slot is in flight.
    Resolving,
    /// Decoded and uploaded.
    Resolved,
    /// Resolution failed.
    Failed(ResourceFailure),
}

impl ResourceState {
    /// Whether the state can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Failed(_))
    }
}

/// What a slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// A glTF buffer.
    Buffer(usize),
    /// A glTF image.
    Image(usize),
    /// A primitive of a glTF mesh.
    Primitive {
        /// Mesh index.
        mesh: usize,
        /// Primitive index within the mesh.
        primitive: usize,
    },
}

/// Snapshot of one resource slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSlot {
    /// Slot index.
    pub id: SlotId,
    /// What the slot holds.
    pub kind: SlotKind,
    /// Human-readable name (name, URI or positional label).
    pub label: String,
    /// External URI, for slots resolved through resource records.
    pub uri: Option<String>,
    /// Current state.
    pub state: ResourceState,
}

/// Engine handles of an uploaded primitive.
#[derive(Debug, Clone)]
pub struct GpuPrimitive {
    /// Interleaved vertex buffer.
    pub vertex_buffer: BufferId,
    /// Index buffer, if the primitive is indexed.
    pub index_buffer: Option<BufferId>,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Number of indices (0 when not indexed).
    pub index_count: u32,
    /// Layout of the vertex buffer.
    pub layout: Arc<VertexLayout>,
    /// Bounds of the uploaded positions.
    pub bounds: Option<BoundingBox>,
}

/// Engine handle of an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuTexture {
    /// Texture handle.
    pub texture: TextureId,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Handle to a loaded asset.
///
/// Cloning is cheap; all clones refer to the same asset and all become
/// invalid when it is destroyed.
#[derive(Clone)]
pub struct Asset {
    id: AssetId,
    store: Arc<AssetStore>,
}

impl Asset {
    pub(crate) fn new(id: AssetId, store: Arc<AssetStore>) -> Self {
        Self { id, store }
    }

    pub(crate) fn store(&self) -> &Arc<AssetStore> {
        &self.store
    }

    pub(crate) fn loaded(&self) -> Result<Arc<LoadedAsset>, AssetError> {
        self.store.get(self.id)
    }

    /// Store id of this asset.
    pub fn id(&self) -> AssetId {
        self.id
    }

    /// Whether the asset has not been destroyed.
    pub fn is_alive(&self) -> bool {
        self.store.is_current(self.id)
    }

    /// The root entity. Every top-level node entity is its child.
    pub fn root(&self) -> Result<Entity, AssetError> {
        Ok(self.loaded()?.root)
    }

    /// Node entities in depth-first pre-order, excluding the root.
    pub fn entities(&self) -> Result<Vec<Entity>, AssetError> {
        Ok(self.loaded()?.entities.clone())
    }

    /// Name of the node an entity was created for.
    pub fn name(&self, entity: Entity) -> Result<Option<String>, AssetError> {
        let loaded = self.loaded()?;
        Ok(loaded
            .entity_nodes
            .get(&entity)
            .and_then(|&node| loaded.graph.node(node))
            .and_then(|node| node.name.clone()))
    }

    /// Parent entity. Top-level nodes report the root; the root has none.
    pub fn parent(&self, entity: Entity) -> Result<Option<Entity>, AssetError> {
        let loaded = self.loaded()?;
        let Some(&node) = loaded.entity_nodes.get(&entity) else {
            return Ok(None);
        };
        Ok(match loaded.graph.parent(node) {
            Some(parent) => loaded.node_entities[parent],
            None => Some(loaded.root),
        })
    }

    /// Child entities in declaration order.
    pub fn children(&self, entity: Entity) -> Result<Vec<Entity>, AssetError> {
        let loaded = self.loaded()?;
        let nodes: &[usize] = if entity == loaded.root {
            loaded.graph.roots()
        } else {
            match loaded.entity_nodes.get(&entity) {
                Some(&node) => loaded.graph.children(node),
                None => &[],
            }
        };
        Ok(nodes
            .iter()
            .filter_map(|&node| loaded.node_entities[node])
            .collect())
    }

    /// Transform component of an entity of this asset.
    pub fn transform(&self, entity: Entity) -> Result<Option<TransformComponent>, AssetError> {
        let loaded = self.loaded()?;
        if entity == loaded.root {
            return Ok(Some(TransformComponent::identity()));
        }
        Ok(loaded
            .entity_nodes
            .get(&entity)
            .and_then(|&node| loaded.graph.node(node))
            .map(|node| TransformComponent {
                local: node.local.matrix(),
                world: node.world,
            }))
    }

    /// Renderable component of an entity, `None` for nodes without a mesh.
    pub fn renderable(&self, entity: Entity) -> Result<Option<Renderable>, AssetError> {
        let loaded = self.loaded()?;
        Ok(loaded
            .entity_nodes
            .get(&entity)
            .and_then(|node| loaded.renderables.get(node))
            .cloned())
    }

    /// Snapshot of every resource slot.
    pub fn resource_states(&self) -> Result<Vec<ResourceSlot>, AssetError> {
        let loaded = self.loaded()?;
        let plan = &loaded.plan;
        let states = loaded.slots.lock().states.clone();

        let buffers = plan.buffers.iter().map(|buffer| {
            let uri = match &buffer.source {
                BufferSource::Uri(uri) => Some(uri.clone()),
                _ => None,
            };
            (SlotKind::Buffer(buffer.index), buffer.label.clone(), uri)
        });
        let images = plan.images.iter().map(|image| {
            let uri = match &image.source {
                ImageSource::Uri(uri) => Some(uri.clone()),
                _ => None,
            };
            (SlotKind::Image(image.index), image.label.clone(), uri)
        });
        let primitives = plan.primitives.iter().map(|primitive| {
            let kind = SlotKind::Primitive {
                mesh: primitive.mesh,
                primitive: primitive.primitive,
            };
            (kind, primitive.label.clone(), None)
        });

        Ok(buffers
            .chain(images)
            .chain(primitives)
            .zip(states)
            .enumerate()
            .map(|(index, ((kind, label, uri), state))| ResourceSlot {
                id: SlotId(index),
                kind,
                label,
                uri,
                state,
            })
            .collect())
    }

    /// State of a single slot.
    pub fn slot_state(&self, slot: SlotId) -> Result<Option<ResourceState>, AssetError> {
        Ok(self.loaded()?.slots.lock().states.get(slot.0).cloned())
    }

    /// External URIs that still need resolving, without duplicates.
    pub fn pending_uris(&self) -> Result<Vec<String>, AssetError> {
        let mut uris: Vec<String> = Vec::new();
        for slot in self.resource_states()? {
            if slot.state == ResourceState::Unresolved
                && let Some(uri) = slot.uri
                && !uris.contains(&uri)
            {
                uris.push(uri);
            }
        }
        Ok(uris)
    }

    /// Entities with at least one primitive that is not resolved or failed yet.
    pub fn unresolved_entities(&self) -> Result<Vec<Entity>, AssetError> {
        let loaded = self.loaded()?;
        let slots = loaded.slots.lock();
        Ok(loaded
            .entities
            .iter()
            .copied()
            .filter(|entity| {
                loaded
                    .entity_nodes
                    .get(entity)
                    .and_then(|node| loaded.renderables.get(node))
                    .is_some_and(|renderable| {
                        renderable
                            .primitives
                            .iter()
                            .any(|p| !slots.states[p.slot.0].is_terminal())
                    })
            })
            .collect())
    }

    /// Uploaded geometry of a primitive slot.
    pub fn gpu_primitive(&self, slot: SlotId) -> Result<Option<GpuPrimitive>, AssetError> {
        Ok(self.loaded()?.slots.lock().primitives.get(&slot).cloned())
    }

    /// Uploaded texture of an image.
    pub fn gpu_texture(&self, image: usize) -> Result<Option<GpuTexture>, AssetError> {
        Ok(self.loaded()?.slots.lock().textures.get(&image).copied())
    }
}

impl std::fmt::Debug for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Asset").field("id", &self.id).finish()
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.store, &other.store)
    }
}

impl Eq for Asset {}
