//! Second-phase resolution of buffers, images and primitives.
//!
//! The host registers bytes per URI with
//! [`add_resource_data`](ResourceLoader::add_resource_data), then calls
//! [`load_resources`](ResourceLoader::load_resources) (or
//! [`begin_async_load`](ResourceLoader::begin_async_load)). Images decode in
//! parallel; every upload happens on the calling thread.
//!
//! Each slot moves `Unresolved → Resolving → Resolved | Failed` exactly
//! once, so a second load of the same asset does no work.

mod async_load;
mod decode;

use std::collections::HashMap;
use std::sync::Arc;

use crate::asset::{Asset, SlotId};
use crate::compute::ThreadPool;
use crate::config::ResourceConfig;
use crate::engine::Engine;
use crate::error::AssetError;

pub use async_load::AsyncLoad;

/// Outcome of one resource batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    /// Slots that reached `Resolved` in this batch.
    pub resolved: Vec<SlotId>,
    /// Slots that reached `Failed` in this batch, with the reason.
    pub failed: Vec<(SlotId, AssetError)>,
    /// Number of engine upload calls made.
    pub uploads: usize,
    /// Slots left alone because they were already resolved, failed or in flight.
    pub skipped: usize,
}

impl LoadReport {
    /// Whether no slot failed.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Error recorded for a slot, if it failed in this batch.
    pub fn failure(&self, slot: SlotId) -> Option<&AssetError> {
        self.failed
            .iter()
            .find(|(id, _)| *id == slot)
            .map(|(_, err)| err)
    }
}

/// Resolves the external resources of assets and uploads them.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use redlilium_gltfio::{AssetLoader, HeadlessEngine, MaterialGenerator, ResourceLoader};
///
/// let engine = Arc::new(HeadlessEngine::new());
/// let loader = AssetLoader::new(engine.clone(), Arc::new(MaterialGenerator::new()));
/// let json = br#"{"asset":{"version":"2.0"},"nodes":[{}],
///     "buffers":[{"uri":"missing.bin","byteLength":4}]}"#;
/// let asset = loader.create_asset_from_json(json).unwrap();
///
/// let mut resources = ResourceLoader::new(engine);
/// let report = resources.load_resources(&asset).unwrap();
/// assert_eq!(report.failed.len(), 1);
/// ```
pub struct ResourceLoader {
    engine: Arc<dyn Engine>,
    config: ResourceConfig,
    records: HashMap<String, Arc<[u8]>>,
    pool: Arc<ThreadPool>,
}

impl ResourceLoader {
    /// Creates a loader with the default configuration.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self::with_config(engine, ResourceConfig::default())
    }

    /// Creates a loader with an explicit configuration.
    pub fn with_config(engine: Arc<dyn Engine>, config: ResourceConfig) -> Self {
        let pool = Arc::new(ThreadPool::new(config.worker_count()));
        Self {
            engine,
            config,
            records: HashMap::new(),
            pool,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// Registers bytes for a URI. A later call for the same URI replaces
    /// the earlier bytes.
    pub fn add_resource_data(&mut self, url: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        let url = url.into();
        let bytes = bytes.into();
        log::trace!("resource record '{url}': {} bytes", bytes.len());
        if self.records.insert(url, bytes).is_some() {
            log::debug!("replaced an existing resource record");
        }
    }

    /// Whether bytes are registered for a URI.
    pub fn has_resource_data(&self, url: &str) -> bool {
        self.records.contains_key(url)
    }

    /// Drops the record for a URI. Returns whether one existed.
    pub fn evict_resource_data(&mut self, url: &str) -> bool {
        self.records.remove(url).is_some()
    }

    /// Number of registered records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Resolves every unresolved slot of `asset`.
    ///
    /// Per-resource problems are reported in the [`LoadReport`]; the only
    /// error is [`AssetError::UseAfterDestroy`].
    pub fn load_resources(&mut self, asset: &Asset) -> Result<LoadReport, AssetError> {
        let loaded = asset.loaded()?;
        let prepared = decode::prepare(&loaded, &self.records);
        let mut report = prepared.report;
        log::debug!(
            "{}: {} decode jobs on {} threads",
            asset.id(),
            prepared.jobs.len(),
            self.pool.num_threads()
        );

        let outputs = self.pool.map(prepared.jobs, |job| job.run(None));

        for output in outputs {
            let applied = decode::commit(
                self.engine.as_ref(),
                &loaded,
                asset.is_alive(),
                output,
                &mut report,
                self.config.recompute_bounding_boxes,
            );
            if !applied {
                log::warn!("{} destroyed during resource loading", asset.id());
                return Err(AssetError::UseAfterDestroy(asset.id()));
            }
        }

        self.finish_batch();
        log::debug!(
            "{}: {} resolved, {} failed, {} uploads, {} skipped",
            asset.id(),
            report.resolved.len(),
            report.failed.len(),
            report.uploads,
            report.skipped
        );
        Ok(report)
    }

    /// Starts resolving `asset` with decoding on a background thread.
    ///
    /// Buffers are resolved before this returns. Call
    /// [`AsyncLoad::update`] regularly from the thread that owns the
    /// engine's submission context to upload finished work.
    pub fn begin_async_load(&mut self, asset: &Asset) -> Result<AsyncLoad, AssetError> {
        let loaded = asset.loaded()?;
        let prepared = decode::prepare(&loaded, &self.records);
        self.finish_batch();
        Ok(AsyncLoad::start(
            Arc::clone(&self.engine),
            asset.clone(),
            loaded,
            prepared,
            Arc::clone(&self.pool),
            self.config.recompute_bounding_boxes,
        ))
    }

    /// Consumes the loader; dropping it releases every record, so this only
    /// logs how many were held. Uploaded resources live in the engine and
    /// are unaffected.
    pub fn destroy(self) {
        log::debug!("resource loader dropped with {} records", self.records.len());
    }

    fn finish_batch(&mut self) {
        if !self.config.retain_records {
            self.records.clear();
        }
    }
}

impl std::fmt::Debug for ResourceLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("config", &self.config)
            .field("records", &self.records.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::HeadlessEngine;

    #[test]
    fn records_last_write_wins() {
        let mut loader = ResourceLoader::new(Arc::new(HeadlessEngine::new()));
        loader.add_resource_data("a.bin", vec![1u8, 2]);
        loader.add_resource_data("a.bin", vec![3u8]);
        assert_eq!(loader.record_count(), 1);
        assert_eq!(loader.records["a.bin"].as_ref(), &[3u8]);

        assert!(loader.has_resource_data("a.bin"));
        assert!(loader.evict_resource_data("a.bin"));
        assert!(!loader.evict_resource_data("a.bin"));
        assert!(!loader.has_resource_data("a.bin"));
    }

    #[test]
    fn destroy_releases_records() {
        let bytes: Arc<[u8]> = Arc::from(vec![7u8; 16]);
        let mut loader = ResourceLoader::new(Arc::new(HeadlessEngine::new()));
        loader.add_resource_data("a.bin", Arc::clone(&bytes));
        assert_eq!(Arc::strong_count(&bytes), 2);

        loader.destroy();
        assert_eq!(Arc::strong_count(&bytes), 1);
    }

    #[test]
    fn report_lookup() {
        let report = LoadReport {
            resolved: vec![SlotId(0)],
            failed: vec![(
                SlotId(1),
                AssetError::MissingResource {
                    uri: "x.png".into(),
                },
            )],
            uploads: 0,
            skipped: 0,
        };
        assert!(!report.is_complete());
        assert!(report.failure(SlotId(1)).is_some());
        assert!(report.failure(SlotId(0)).is_none());
    }
}
