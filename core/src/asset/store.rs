//! Generational arena of loaded assets.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::compute::CancellationToken;
use crate::entity::Entity;
use crate::error::AssetError;
use crate::gltf::ResourcePlan;
use crate::scene::SceneGraph;

use super::{AssetId, GpuPrimitive, GpuTexture, Renderable, ResourceState, SlotId};

/// Mutable per-asset resolution state.
#[derive(Debug, Default)]
pub(crate) struct SlotTable {
    pub states: Vec<ResourceState>,
    /// GLB BIN chunk, released once the embedded buffer is resolved.
    pub embedded: Option<Arc<[u8]>>,
    pub primitives: HashMap<SlotId, GpuPrimitive>,
    /// Uploaded textures by image index.
    pub textures: HashMap<usize, GpuTexture>,
}

/// Everything the store owns for one asset.
///
/// Shared through `Arc` so decode jobs that outlive a destroy never touch
/// freed data; they observe `token` instead.
#[derive(Debug)]
pub(crate) struct LoadedAsset {
    pub token: CancellationToken,
    pub root: Entity,
    /// Node entities in depth-first pre-order.
    pub entities: Vec<Entity>,
    /// Entity of each graph node, `None` for nodes no scene instantiates.
    pub node_entities: Vec<Option<Entity>>,
    pub entity_nodes: HashMap<Entity, usize>,
    pub graph: SceneGraph,
    /// Renderable component per graph node.
    pub renderables: HashMap<usize, Renderable>,
    pub plan: ResourcePlan,
    pub slots: Mutex<SlotTable>,
}

impl LoadedAsset {
    /// Every entity the asset owns, root first.
    pub(crate) fn all_entities(&self) -> Vec<Entity> {
        std::iter::once(self.root)
            .chain(self.entities.iter().copied())
            .collect()
    }
}

struct StoreSlot {
    generation: u32,
    asset: Option<Arc<LoadedAsset>>,
}

#[derive(Default)]
struct StoreInner {
    slots: Vec<StoreSlot>,
    free: Vec<u32>,
    live: usize,
}

/// Arena of [`LoadedAsset`]s owned by one asset loader.
///
/// Removing an asset bumps its slot generation, so every [`AssetId`] issued
/// for the slot before becomes stale.
#[derive(Default)]
pub(crate) struct AssetStore {
    inner: Mutex<StoreInner>,
}

impl AssetStore {
    pub(crate) fn insert(&self, asset: LoadedAsset) -> AssetId {
        let mut inner = self.inner.lock();
        inner.live += 1;
        let asset = Some(Arc::new(asset));
        if let Some(index) = inner.free.pop() {
            let slot = &mut inner.slots[index as usize];
            slot.asset = asset;
            return AssetId::new(index, slot.generation);
        }
        let index = inner.slots.len() as u32;
        inner.slots.push(StoreSlot {
            generation: 0,
            asset,
        });
        AssetId::new(index, 0)
    }

    pub(crate) fn get(&self, id: AssetId) -> Result<Arc<LoadedAsset>, AssetError> {
        let inner = self.inner.lock();
        match inner.slots.get(id.index() as usize) {
            Some(StoreSlot {
                generation,
                asset: Some(asset),
            }) if *generation == id.generation() => Ok(Arc::clone(asset)),
            _ => Err(AssetError::UseAfterDestroy(id)),
        }
    }

    pub(crate) fn is_current(&self, id: AssetId) -> bool {
        self.get(id).is_ok()
    }

    /// Takes the asset out of the arena and invalidates `id`.
    pub(crate) fn remove(&self, id: AssetId) -> Result<Arc<LoadedAsset>, AssetError> {
        let mut inner = self.inner.lock();
        let slot = inner
            .slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .ok_or(AssetError::UseAfterDestroy(id))?;
        let asset = slot.asset.take().ok_or(AssetError::UseAfterDestroy(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        inner.free.push(id.index());
        inner.live -= 1;
        Ok(asset)
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().live
    }
}

impl std::fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStore")
            .field("live", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRegistry;
    use crate::error::ErrorKind;
    use crate::scene::{NodeDesc, SceneGraphBuilder};

    fn loaded(registry: &EntityRegistry) -> LoadedAsset {
        let mut builder = SceneGraphBuilder::new(1);
        builder.add_node(NodeDesc::new());
        let graph = builder.build(&[0]).unwrap();
        let node = registry.create();
        LoadedAsset {
            token: CancellationToken::new(),
            root: registry.create(),
            entities: vec![node],
            node_entities: vec![Some(node)],
            entity_nodes: HashMap::from([(node, 0)]),
            graph,
            renderables: HashMap::new(),
            plan: ResourcePlan::default(),
            slots: Mutex::new(SlotTable::default()),
        }
    }

    #[test]
    fn removed_ids_go_stale() {
        let registry = EntityRegistry::new();
        let store = AssetStore::default();
        let id = store.insert(loaded(&registry));
        assert!(store.is_current(id));
        assert_eq!(store.len(), 1);

        store.remove(id).unwrap();
        assert_eq!(store.len(), 0);
        assert_eq!(store.get(id).unwrap_err().kind(), ErrorKind::UseAfterDestroy);
        assert_eq!(
            store.remove(id).unwrap_err().kind(),
            ErrorKind::UseAfterDestroy
        );
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let registry = EntityRegistry::new();
        let store = AssetStore::default();
        let first = store.insert(loaded(&registry));
        store.remove(first).unwrap();
        let second = store.insert(loaded(&registry));

        assert_eq!(second.index(), first.index());
        assert_ne!(second.generation(), first.generation());
        assert!(!store.is_current(first));
        assert!(store.is_current(second));
    }

    #[test]
    fn all_entities_lists_root_first() {
        let registry = EntityRegistry::new();
        let asset = loaded(&registry);
        let all = asset.all_entities();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], asset.root);
    }
}
