//! The three phases of a resource batch.
//!
//! 1. [`prepare`] runs on the caller thread: claims every `Unresolved` slot,
//!    resolves buffers and turns images and primitives into jobs.
//! 2. [`DecodeJob::run`] runs anywhere: image decoding and vertex
//!    interleaving, no shared state touched.
//! 3. [`commit`] runs on the caller thread: uploads through the engine and
//!    records the final slot state.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use crate::asset::{GpuPrimitive, GpuTexture, LoadedAsset, ResourceFailure, ResourceState, SlotId};
use crate::compute::CancellationToken;
use crate::engine::Engine;
use crate::gltf::{BufferSource, ImageSource, data_uri_mime, decode_data_uri};
use crate::mesh::PrimitiveGeometry;

use super::LoadReport;

type BufferBytes = Arc<Vec<Option<Arc<[u8]>>>>;

enum JobKind {
    Image {
        index: usize,
        bytes: Arc<[u8]>,
        range: Range<usize>,
        mime_type: Option<String>,
    },
    Primitive {
        index: usize,
        buffers: BufferBytes,
    },
}

/// Decode work for one slot.
pub(crate) struct DecodeJob {
    slot: SlotId,
    asset: Arc<LoadedAsset>,
    kind: JobKind,
}

enum Decoded {
    Image { index: usize, image: image::RgbaImage },
    Primitive { index: usize, geometry: PrimitiveGeometry },
}

/// Result of a [`DecodeJob`], applied by [`commit`].
pub(crate) struct DecodeOutput {
    pub slot: SlotId,
    result: Result<Decoded, ResourceFailure>,
}

impl DecodeJob {
    /// Decodes unless the asset or the load was cancelled.
    ///
    /// `load` is the token of a cancellable load; synchronous loads pass
    /// `None` and only stop when the asset is destroyed.
    pub(crate) fn run(self, load: Option<&CancellationToken>) -> DecodeOutput {
        let slot = self.slot;
        let cancelled = self
            .asset
            .token
            .check()
            .and_then(|()| load.map_or(Ok(()), CancellationToken::check));
        if let Err(cancelled) = cancelled {
            log::trace!("{slot}: {cancelled}");
            return DecodeOutput {
                slot,
                result: Err(ResourceFailure::Cancelled),
            };
        }

        let result = match self.kind {
            JobKind::Image {
                index,
                bytes,
                range,
                mime_type,
            } => decode_image(&bytes[range], mime_type.as_deref())
                .map(|image| Decoded::Image { index, image }),
            JobKind::Primitive { index, buffers } => self.asset.plan.primitives[index]
                .decode(|buffer| buffers.get(buffer).and_then(|b| b.as_deref()))
                .map(|geometry| Decoded::Primitive { index, geometry }),
        };
        DecodeOutput {
            slot,
            result: result.map_err(|reason| ResourceFailure::Decode { reason }),
        }
    }
}

/// Decodes PNG or JPEG bytes to RGBA8.
///
/// The format is sniffed from the bytes; the declared MIME type is the
/// fallback when sniffing fails.
pub(crate) fn decode_image(bytes: &[u8], mime_type: Option<&str>) -> Result<image::RgbaImage, String> {
    let format = image::guess_format(bytes).ok().or(match mime_type {
        Some("image/png") => Some(image::ImageFormat::Png),
        Some("image/jpeg") => Some(image::ImageFormat::Jpeg),
        _ => None,
    });
    let Some(format) = format else {
        return Err(format!(
            "unrecognized image format (mime type {})",
            mime_type.unwrap_or("unknown")
        ));
    };
    image::load_from_memory_with_format(bytes, format)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|e| format!("{format:?} decode failed: {e}"))
}

/// Slots claimed by [`prepare`].
pub(crate) struct Prepared {
    pub jobs: Vec<DecodeJob>,
    /// Buffer results, immediate failures and skipped slots.
    pub report: LoadReport,
}

impl Prepared {
    /// Slots still waiting for a job result.
    pub(crate) fn pending(&self) -> Vec<SlotId> {
        self.jobs.iter().map(|job| job.slot).collect()
    }
}

fn fail(
    states: &mut [ResourceState],
    report: &mut LoadReport,
    slot: usize,
    label: &str,
    failure: ResourceFailure,
) {
    log::warn!("{label}: {failure}");
    report.failed.push((SlotId(slot), failure.to_error(label)));
    states[slot] = ResourceState::Failed(failure);
}

/// Claims every `Unresolved` slot of the asset.
///
/// Buffers are resolved here; their bytes are only held by the returned
/// jobs, so they are released as soon as the batch is applied.
pub(crate) fn prepare(asset: &Arc<LoadedAsset>, records: &HashMap<String, Arc<[u8]>>) -> Prepared {
    let plan = &asset.plan;
    let mut guard = asset.slots.lock();
    let slots = &mut *guard;
    let mut report = LoadReport::default();
    let mut jobs = Vec::new();

    let mut buffers: Vec<Option<Arc<[u8]>>> = vec![None; plan.buffers.len()];
    for buffer in &plan.buffers {
        let slot = plan.buffer_slot(buffer.index);
        if slots.states[slot] != ResourceState::Unresolved {
            report.skipped += 1;
            continue;
        }
        let bytes = match &buffer.source {
            BufferSource::Embedded => slots.embedded.clone().ok_or(ResourceFailure::Decode {
                reason: "GLB binary chunk is no longer available".to_owned(),
            }),
            BufferSource::DataUri(uri) => match decode_data_uri(uri) {
                Some(Ok(bytes)) => Ok(Arc::from(bytes)),
                Some(Err(reason)) => Err(ResourceFailure::Decode { reason }),
                None => Err(ResourceFailure::Decode {
                    reason: "not a data URI".to_owned(),
                }),
            },
            BufferSource::Uri(uri) => records
                .get(uri)
                .cloned()
                .ok_or_else(|| ResourceFailure::Missing { uri: uri.clone() }),
        }
        .and_then(|bytes| {
            if bytes.len() < buffer.byte_length {
                Err(ResourceFailure::Decode {
                    reason: format!(
                        "buffer has {} bytes, byteLength is {}",
                        bytes.len(),
                        buffer.byte_length
                    ),
                })
            } else {
                Ok(bytes)
            }
        });

        match bytes {
            Ok(bytes) => {
                log::trace!("resolved {} ({} bytes)", buffer.label, bytes.len());
                buffers[buffer.index] = Some(bytes);
                slots.states[slot] = ResourceState::Resolved;
                report.resolved.push(SlotId(slot));
            }
            Err(failure) => fail(&mut slots.states, &mut report, slot, &buffer.label, failure),
        }
    }
    // Every buffer slot is terminal now.
    slots.embedded = None;

    let dependency = |buffer: usize| -> Result<Arc<[u8]>, ResourceFailure> {
        buffers
            .get(buffer)
            .cloned()
            .flatten()
            .ok_or(ResourceFailure::MissingDependency {
                dependency: SlotId(plan.buffer_slot(buffer)),
            })
    };

    for image in &plan.images {
        let slot = plan.image_slot(image.index);
        if slots.states[slot] != ResourceState::Unresolved {
            report.skipped += 1;
            continue;
        }
        let mut mime_type = image.mime_type.clone();
        let source = match &image.source {
            ImageSource::Uri(uri) => records
                .get(uri)
                .map(|bytes| (Arc::clone(bytes), 0..bytes.len()))
                .ok_or_else(|| ResourceFailure::Missing { uri: uri.clone() }),
            ImageSource::DataUri(uri) => {
                if mime_type.is_none() {
                    mime_type = data_uri_mime(uri).map(str::to_owned);
                }
                match decode_data_uri(uri) {
                    Some(Ok(bytes)) => {
                        let len = bytes.len();
                        Ok((Arc::from(bytes), 0..len))
                    }
                    Some(Err(reason)) => Err(ResourceFailure::Decode { reason }),
                    None => Err(ResourceFailure::Decode {
                        reason: "not a data URI".to_owned(),
                    }),
                }
            }
            ImageSource::View {
                buffer,
                offset,
                length,
            } => dependency(*buffer).and_then(|bytes| {
                let end = offset.saturating_add(*length);
                if end > bytes.len() {
                    Err(ResourceFailure::Decode {
                        reason: format!(
                            "buffer view {offset}..{end} exceeds buffer of {} bytes",
                            bytes.len()
                        ),
                    })
                } else {
                    Ok((bytes, *offset..end))
                }
            }),
        };

        match source {
            Ok((bytes, range)) => {
                slots.states[slot] = ResourceState::Resolving;
                jobs.push(DecodeJob {
                    slot: SlotId(slot),
                    asset: Arc::clone(asset),
                    kind: JobKind::Image {
                        index: image.index,
                        bytes,
                        range,
                        mime_type,
                    },
                });
            }
            Err(failure) => fail(&mut slots.states, &mut report, slot, &image.label, failure),
        }
    }

    let buffer_bytes: BufferBytes = Arc::new(buffers.clone());
    for (index, primitive) in plan.primitives.iter().enumerate() {
        let slot = plan.primitive_slot(index);
        if slots.states[slot] != ResourceState::Unresolved {
            report.skipped += 1;
            continue;
        }
        match primitive
            .buffers()
            .into_iter()
            .try_for_each(|buffer| dependency(buffer).map(drop))
        {
            Ok(()) => {
                slots.states[slot] = ResourceState::Resolving;
                jobs.push(DecodeJob {
                    slot: SlotId(slot),
                    asset: Arc::clone(asset),
                    kind: JobKind::Primitive {
                        index,
                        buffers: Arc::clone(&buffer_bytes),
                    },
                });
            }
            Err(failure) => fail(
                &mut slots.states,
                &mut report,
                slot,
                &primitive.label,
                failure,
            ),
        }
    }

    Prepared { jobs, report }
}

/// Applies one decode result. Returns `false` when the asset was destroyed,
/// in which case nothing is uploaded or written.
pub(crate) fn commit(
    engine: &dyn Engine,
    asset: &LoadedAsset,
    asset_alive: bool,
    output: DecodeOutput,
    report: &mut LoadReport,
    recompute_bounds: bool,
) -> bool {
    let mut slots = asset.slots.lock();
    if !asset_alive || asset.token.is_cancelled() {
        return false;
    }

    let slot = output.slot;
    match output.result {
        Ok(Decoded::Image { index, image }) => {
            let label = &asset.plan.images[index].label;
            let (width, height) = image.dimensions();
            let texture = engine.upload_texture(label, width, height, image.as_raw());
            report.uploads += 1;
            slots.textures.insert(
                index,
                GpuTexture {
                    texture,
                    width,
                    height,
                },
            );
            slots.states[slot.0] = ResourceState::Resolved;
            report.resolved.push(slot);
        }
        Ok(Decoded::Primitive { index, geometry }) => {
            let plan = &asset.plan.primitives[index];
            let bounds = match plan.bounds {
                Some(bounds) if !recompute_bounds => Some(bounds),
                _ => geometry.compute_bounds(),
            };
            let vertex_buffer =
                engine.upload_vertex_buffer(&plan.label, &geometry.layout, &geometry.vertices);
            report.uploads += 1;
            let index_buffer = geometry.indices.as_ref().map(|indices| {
                report.uploads += 1;
                engine.upload_index_buffer(&plan.label, indices)
            });
            slots.primitives.insert(
                slot,
                GpuPrimitive {
                    vertex_buffer,
                    index_buffer,
                    vertex_count: geometry.vertex_count,
                    index_count: geometry.indices.as_ref().map_or(0, |i| i.len() as u32),
                    layout: Arc::clone(&geometry.layout),
                    bounds,
                },
            );
            slots.states[slot.0] = ResourceState::Resolved;
            report.resolved.push(slot);
        }
        Err(failure) => {
            let label = slot_label(asset, slot);
            fail(&mut slots.states, report, slot.0, &label, failure);
        }
    }
    true
}

/// Marks slots whose results will never be applied as cancelled.
pub(crate) fn cancel_slots(asset: &LoadedAsset, pending: &[SlotId], report: &mut LoadReport) {
    let mut slots = asset.slots.lock();
    for &slot in pending {
        if slots.states[slot.0] == ResourceState::Resolving {
            let label = slot_label(asset, slot);
            report.failed.push((slot, ResourceFailure::Cancelled.to_error(&label)));
            slots.states[slot.0] = ResourceState::Failed(ResourceFailure::Cancelled);
        }
    }
}

fn slot_label(asset: &LoadedAsset, slot: SlotId) -> String {
    let plan = &asset.plan;
    let images = plan.image_slot(0);
    let primitives = plan.primitive_slot(0);
    if slot.0 < images {
        plan.buffers[slot.0].label.clone()
    } else if slot.0 < primitives {
        plan.images[slot.0 - images].label.clone()
    } else {
        plan.primitives[slot.0 - primitives].label.clone()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::asset::SlotTable;
    use crate::entity::EntityRegistry;
    use crate::gltf::ResourcePlan;
    use crate::scene::{NodeDesc, SceneGraphBuilder};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let pixels = vec![200u8; (width * height * 4) as usize];
        let image = image::RgbaImage::from_raw(width, height, pixels).unwrap();
        let mut out = std::io::Cursor::new(Vec::new());
        image.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_to_rgba() {
        let image = decode_image(&png(3, 2), Some("image/png")).unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.as_raw().len(), 24);
    }

    #[test]
    fn sniffing_beats_wrong_mime() {
        let image = decode_image(&png(1, 1), Some("image/jpeg")).unwrap();
        assert_eq!(image.dimensions(), (1, 1));
    }

    fn image_job(asset: &Arc<LoadedAsset>) -> DecodeJob {
        let bytes: Arc<[u8]> = Arc::from(png(2, 2));
        DecodeJob {
            slot: SlotId(0),
            asset: Arc::clone(asset),
            kind: JobKind::Image {
                index: 0,
                range: 0..bytes.len(),
                bytes,
                mime_type: None,
            },
        }
    }

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
    fn jobs_stop_on_either_token() {
        let registry = EntityRegistry::new();
        let asset = Arc::new(loaded(&registry));

        let output = image_job(&asset).run(None);
        assert!(matches!(output.result, Ok(Decoded::Image { index: 0, .. })));

        let live = CancellationToken::new();
        assert!(image_job(&asset).run(Some(&live)).result.is_ok());

        let load = CancellationToken::new();
        load.cancel();
        let output = image_job(&asset).run(Some(&load));
        assert!(matches!(output.result, Err(ResourceFailure::Cancelled)));

        asset.token.cancel();
        let output = image_job(&asset).run(None);
        assert!(matches!(output.result, Err(ResourceFailure::Cancelled)));
    }

    #[test]
    fn garbage_fails() {
        let err = decode_image(b"definitely not an image", None).unwrap_err();
        assert!(err.contains("unrecognized"));

        let mut truncated = png(4, 4);
        truncated.truncate(truncated.len() / 2);
        assert!(decode_image(&truncated, Some("image/png")).is_err());
    }
}
