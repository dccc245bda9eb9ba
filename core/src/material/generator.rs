use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Material, MaterialDescription, MaterialInstance, MaterialKey};

#[derive(Default)]
struct Caches {
    materials: HashMap<MaterialKey, Arc<Material>>,
    instances: HashMap<MaterialDescription, Arc<MaterialInstance>>,
}

impl Caches {
    fn material(&mut self, key: &MaterialKey) -> Arc<Material> {
        Arc::clone(
            self.materials
                .entry(*key)
                .or_insert_with(|| Arc::new(Material::from_key(key))),
        )
    }
}

/// Produces and caches material declarations and instances.
///
/// Shared between asset loaders through an `Arc`; every method takes `&self`
/// and synchronizes internally. Instances stay cached while anything holds
/// them; [`purge_unused`](Self::purge_unused) drops the rest.
#[derive(Default)]
pub struct MaterialGenerator {
    caches: Mutex<Caches>,
}

impl MaterialGenerator {
    /// Creates an empty generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the instance for `description`, creating it on first request.
    ///
    /// Equal descriptions always return the same `Arc`.
    pub fn generate(&self, description: &MaterialDescription) -> Arc<MaterialInstance> {
        let mut caches = self.caches.lock();
        if let Some(instance) = caches.instances.get(description) {
            return Arc::clone(instance);
        }

        let material = caches.material(&description.key());
        let instance = Arc::new(MaterialInstance::new(material, description.clone()));
        caches
            .instances
            .insert(description.clone(), Arc::clone(&instance));
        log::trace!(
            "generated material instance #{} ({:?})",
            caches.instances.len(),
            description.key()
        );
        instance
    }

    /// Returns the declaration for a shader variant, creating it on first request.
    pub fn material_for_key(&self, key: &MaterialKey) -> Arc<Material> {
        self.caches.lock().material(key)
    }

    /// Instance used by primitives that reference no material.
    pub fn default_instance(&self) -> Arc<MaterialInstance> {
        self.generate(&MaterialDescription::default())
    }

    /// Number of cached declarations.
    pub fn material_count(&self) -> usize {
        self.caches.lock().materials.len()
    }

    /// Number of cached instances.
    pub fn instance_count(&self) -> usize {
        self.caches.lock().instances.len()
    }

    /// Drops cached instances and declarations that nothing outside the
    /// generator references. Returns how many instances were dropped.
    pub fn purge_unused(&self) -> usize {
        let mut caches = self.caches.lock();
        let before = caches.instances.len();
        caches
            .instances
            .retain(|_, instance| Arc::strong_count(instance) > 1);
        caches
            .materials
            .retain(|_, material| Arc::strong_count(material) > 1);
        let purged = before - caches.instances.len();
        if purged > 0 {
            log::debug!("purged {purged} unused material instances");
        }
        purged
    }

    /// Drops every cached entry. Outstanding `Arc`s stay valid.
    pub fn clear(&self) {
        let mut caches = self.caches.lock();
        caches.instances.clear();
        caches.materials.clear();
    }
}
