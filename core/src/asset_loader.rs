//! Turns glTF bytes into [`Asset`] handles.
//!
//! Creating an asset parses and validates the structure, builds the scene
//! graph, allocates entities and requests material instances. No resource
//! bytes are decoded and nothing is uploaded; that is the job of the
//! [`ResourceLoader`](crate::ResourceLoader).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::Matrix4;
use parking_lot::Mutex;

use crate::asset::{
    Asset, AssetStore, LoadedAsset, RenderPrimitive, Renderable, ResourceState, SlotId, SlotTable,
};
use crate::compute::CancellationToken;
use crate::config::LoaderConfig;
use crate::engine::Engine;
use crate::error::AssetError;
use crate::gltf::{Glb, ResourcePlan, is_glb, parse_document};
use crate::material::{MaterialDescription, MaterialGenerator, MaterialInstance};
use crate::scene::{NodeDesc, NodeTransform, SceneGraph, SceneGraphBuilder};

/// Serials scope embedded images in the material caches. Shared by every
/// loader so two loaders never hand out the same serial.
static NEXT_ASSET_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Creates and destroys assets for one engine.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use redlilium_gltfio::{AssetLoader, HeadlessEngine, MaterialGenerator};
///
/// let engine = Arc::new(HeadlessEngine::new());
/// let loader = AssetLoader::new(engine, Arc::new(MaterialGenerator::new()));
///
/// let json = br#"{"asset":{"version":"2.0"},"nodes":[{"name":"only"}]}"#;
/// let asset = loader.create_asset_from_json(json).unwrap();
/// assert_eq!(asset.entities().unwrap().len(), 1);
///
/// loader.destroy_asset(&asset).unwrap();
/// assert!(asset.root().is_err());
/// ```
pub struct AssetLoader {
    engine: Arc<dyn Engine>,
    generator: Arc<MaterialGenerator>,
    config: LoaderConfig,
    store: Arc<AssetStore>,
}

impl AssetLoader {
    /// Creates a loader with the default configuration.
    pub fn new(engine: Arc<dyn Engine>, generator: Arc<MaterialGenerator>) -> Self {
        Self::with_config(engine, generator, LoaderConfig::default())
    }

    /// Creates a loader with an explicit configuration.
    pub fn with_config(
        engine: Arc<dyn Engine>,
        generator: Arc<MaterialGenerator>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            engine,
            generator,
            config,
            store: Arc::new(AssetStore::default()),
        }
    }

    /// Toggles verbose validation logging. Never changes what is produced.
    pub fn enable_diagnostics(&mut self, enabled: bool) {
        self.config.diagnostics = enabled;
    }

    /// Whether verbose validation logging is on.
    pub fn diagnostics_enabled(&self) -> bool {
        self.config.diagnostics
    }

    /// The engine this loader allocates entities from.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// The shared material generator.
    pub fn generator(&self) -> &Arc<MaterialGenerator> {
        &self.generator
    }

    /// Number of live assets created by this loader.
    pub fn asset_count(&self) -> usize {
        self.store.len()
    }

    /// Creates an asset from either encoding, chosen by the GLB magic.
    pub fn create_asset(&self, bytes: &[u8]) -> Result<Asset, AssetError> {
        if is_glb(bytes) {
            self.create_asset_from_binary(bytes)
        } else {
            self.create_asset_from_json(bytes)
        }
    }

    /// Creates an asset from textual glTF.
    pub fn create_asset_from_json(&self, bytes: &[u8]) -> Result<Asset, AssetError> {
        self.build(bytes, None)
    }

    /// Creates an asset from a GLB container. The BIN chunk becomes the
    /// embedded buffer.
    pub fn create_asset_from_binary(&self, bytes: &[u8]) -> Result<Asset, AssetError> {
        let glb = Glb::parse(bytes)?;
        self.build(glb.json, glb.bin.map(Arc::from))
    }

    /// Destroys an asset: cancels in-flight resource work, destroys its
    /// entities, releases its uploads and invalidates every clone of the
    /// handle.
    pub fn destroy_asset(&self, asset: &Asset) -> Result<(), AssetError> {
        if !Arc::ptr_eq(asset.store(), &self.store) {
            log::error!("{} was not created by this loader", asset.id());
            return Err(AssetError::UseAfterDestroy(asset.id()));
        }

        let loaded = self.store.remove(asset.id())?;
        loaded.token.cancel();

        let destroyed = self
            .engine
            .entities()
            .destroy_many(&loaded.all_entities());

        {
            let mut slots = loaded.slots.lock();
            for primitive in slots.primitives.values() {
                self.engine.release_buffer(primitive.vertex_buffer);
                if let Some(index_buffer) = primitive.index_buffer {
                    self.engine.release_buffer(index_buffer);
                }
            }
            for texture in slots.textures.values() {
                self.engine.release_texture(texture.texture);
            }
            slots.primitives.clear();
            slots.textures.clear();
            slots.embedded = None;
        }
        drop(loaded);

        let purged = self.generator.purge_unused();
        log::debug!(
            "destroyed {}: {destroyed} entities, {purged} material instances purged",
            asset.id()
        );
        Ok(())
    }

    fn build(&self, json: &[u8], bin: Option<Arc<[u8]>>) -> Result<Asset, AssetError> {
        let diagnostics = self.config.diagnostics;
        let document = parse_document(json, self.config.strict_extensions, diagnostics)?;
        let plan = ResourcePlan::from_document(&document, bin.is_some())?;
        let graph = build_scene_graph(&document, diagnostics)?;

        if diagnostics {
            for skipped in &plan.skipped_attributes {
                log::warn!(
                    "{}: attribute {} is not mapped and will be ignored",
                    skipped.primitive,
                    skipped.semantic
                );
            }
            let instantiated = graph.depth_first().len();
            if instantiated < graph.nodes().len() {
                log::warn!(
                    "{} of {} nodes are not part of the instantiated scene",
                    graph.nodes().len() - instantiated,
                    graph.nodes().len()
                );
            }
        }

        let serial = NEXT_ASSET_SERIAL.fetch_add(1, Ordering::Relaxed);
        let instances = self.primitive_materials(&document, &plan, serial);

        // Nothing below can fail, so entities never leak on error.
        let mut entities = self
            .engine
            .entities()
            .create_many(graph.depth_first().len() + 1);
        let root = entities.remove(0);

        let mut node_entities = vec![None; graph.nodes().len()];
        let mut entity_nodes = HashMap::with_capacity(entities.len());
        let mut renderables = HashMap::new();
        for (&node, &entity) in graph.depth_first().iter().zip(&entities) {
            node_entities[node] = Some(entity);
            entity_nodes.insert(entity, node);

            let Some(mesh) = graph.nodes()[node].mesh else {
                continue;
            };
            let primitives = plan.mesh_primitives[mesh]
                .iter()
                .map(|&p| {
                    let primitive = &plan.primitives[p];
                    RenderPrimitive {
                        topology: primitive.topology.clone().ok(),
                        material: Arc::clone(&instances[p]),
                        bounds: primitive.bounds,
                        slot: SlotId(plan.primitive_slot(p)),
                    }
                })
                .collect();
            renderables.insert(node, Renderable { primitives });
        }

        let slots = SlotTable {
            states: vec![ResourceState::Unresolved; plan.slot_count()],
            embedded: bin,
            ..SlotTable::default()
        };

        log::debug!(
            "created asset #{serial}: {} entities, {} slots",
            entities.len() + 1,
            plan.slot_count()
        );

        let id = self.store.insert(LoadedAsset {
            token: CancellationToken::new(),
            root,
            entities,
            node_entities,
            entity_nodes,
            graph,
            renderables,
            plan,
            slots: Mutex::new(slots),
        });
        Ok(Asset::new(id, Arc::clone(&self.store)))
    }

    /// One material instance per primitive plan. Primitives without a
    /// material share the generator's default instance.
    fn primitive_materials(
        &self,
        document: &gltf_dep::Document,
        plan: &ResourcePlan,
        serial: u64,
    ) -> Vec<Arc<MaterialInstance>> {
        let descriptions: Vec<MaterialDescription> = document
            .materials()
            .map(|material| MaterialDescription::from_gltf(&material, serial))
            .collect();

        plan.primitives
            .iter()
            .map(|primitive| {
                let colors = primitive.has_colors();
                match primitive.material.and_then(|m| descriptions.get(m)) {
                    Some(description) => self
                        .generator
                        .generate(&description.clone().with_vertex_colors(colors)),
                    None if colors => self
                        .generator
                        .generate(&MaterialDescription::default().with_vertex_colors(true)),
                    None => self.generator.default_instance(),
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for AssetLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetLoader")
            .field("config", &self.config)
            .field("assets", &self.asset_count())
            .finish()
    }
}

/// Builds the node hierarchy and picks the roots: the default scene, else
/// the first scene, else every node that is nobody's child.
fn build_scene_graph(
    document: &gltf_dep::Document,
    diagnostics: bool,
) -> Result<SceneGraph, AssetError> {
    let mut builder = SceneGraphBuilder::new(document.nodes().len());
    for node in document.nodes() {
        let mut desc = NodeDesc::new().with_children(node.children().map(|c| c.index()).collect());
        if let Some(name) = node.name() {
            desc = desc.with_name(name);
        }
        if let Some(mesh) = node.mesh() {
            desc = desc.with_mesh(mesh.index());
        }
        desc = match node.transform() {
            gltf_dep::scene::Transform::Matrix { matrix } => {
                desc.with_matrix(Matrix4::from_fn(|row, col| matrix[col][row]))
            }
            gltf_dep::scene::Transform::Decomposed {
                translation,
                rotation,
                scale,
            } => {
                let trs = NodeTransform::IDENTITY
                    .with_translation(translation)
                    .with_rotation(rotation)
                    .with_scale(scale);
                if diagnostics && !trs.has_unit_rotation() {
                    log::warn!(
                        "node {} has a non-unit rotation quaternion {rotation:?}",
                        node.index()
                    );
                }
                desc.with_transform(trs)
            }
        };
        builder.add_node(desc);
    }

    let scene = document.default_scene().or_else(|| document.scenes().next());
    let source = scene
        .as_ref()
        .map_or_else(|| "parentless nodes".to_owned(), |s| format!("scene {}", s.index()));
    let roots: Vec<usize> = match &scene {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => builder.find_roots(),
    };

    let graph = builder.build(&roots)?;
    if graph.roots().is_empty() {
        return Err(AssetError::malformed(format!("no nodes to instantiate from {source}")));
    }
    if diagnostics {
        log::debug!(
            "instantiated {} root nodes from {source}",
            graph.roots().len()
        );
    }
    Ok(graph)
}
