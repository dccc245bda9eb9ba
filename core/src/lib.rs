//! # RedLilium glTF I/O
//!
//! Loads glTF 2.0 assets (`.gltf` JSON or `.glb` containers) into entity
//! hierarchies for the RedLilium engine, in two phases:
//!
//! 1. [`AssetLoader`] parses and validates the structure and returns an
//!    [`Asset`] handle: entities, transforms, renderables and material
//!    instances, with every buffer, image and primitive in an
//!    [`Unresolved`](ResourceState::Unresolved) slot.
//! 2. [`ResourceLoader`] takes bytes for external URIs from the host,
//!    decodes images in parallel and uploads geometry and textures through
//!    the [`Engine`] on the calling thread.
//!
//! ```
//! use std::sync::Arc;
//! use redlilium_gltfio::{AssetLoader, HeadlessEngine, MaterialGenerator, ResourceLoader};
//!
//! let engine = Arc::new(HeadlessEngine::new());
//! let loader = AssetLoader::new(engine.clone(), Arc::new(MaterialGenerator::new()));
//! let asset = loader
//!     .create_asset_from_json(br#"{"asset":{"version":"2.0"},"nodes":[{"children":[1]},{}]}"#)
//!     .unwrap();
//! assert_eq!(asset.children(asset.root().unwrap()).unwrap().len(), 1);
//!
//! let mut resources = ResourceLoader::new(engine);
//! let report = resources.load_resources(&asset).unwrap();
//! assert!(report.is_complete());
//! ```

pub mod asset;
mod asset_loader;
pub mod compute;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
mod gltf;
pub mod material;
pub mod mesh;
mod resource_loader;
pub mod sampler;
pub mod scene;

pub use asset::{
    Asset, AssetId, GpuPrimitive, GpuTexture, RenderPrimitive, Renderable, ResourceFailure,
    ResourceSlot, ResourceState, SlotId, SlotKind, TransformComponent,
};
pub use asset_loader::AssetLoader;
pub use config::{GltfioConfig, LoaderConfig, ResourceConfig};
pub use engine::{BufferId, Engine, HeadlessEngine, TextureId};
pub use entity::{Entity, EntityRegistry};
pub use error::{AssetError, ErrorKind};
pub use material::{MaterialDescription, MaterialGenerator, MaterialInstance};
pub use resource_loader::{AsyncLoad, LoadReport, ResourceLoader};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extensions listed in `extensionsRequired` that this loader understands.
pub fn supported_extensions() -> &'static [&'static str] {
    gltf::SUPPORTED_EXTENSIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn unlit_is_supported() {
        assert!(supported_extensions().contains(&"KHR_materials_unlit"));
    }
}
