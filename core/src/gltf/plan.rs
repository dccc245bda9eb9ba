//! Resource plans extracted from a validated document.
//!
//! A plan records where every buffer, image and primitive of an asset gets
//! its bytes from, so the document itself can be dropped once the asset is
//! built.

use std::sync::Arc;

use crate::error::AssetError;
use crate::mesh::{BoundingBox, VertexLayout};

use super::uri::is_data_uri;
use super::vertex::{
    AccessorPlan, PrimitivePlan, find_or_create_layout, map_semantic, map_topology, read_bound,
};

/// Where a buffer's bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BufferSource {
    /// The BIN chunk of the GLB container.
    Embedded,
    /// A `data:` URI carried in the JSON.
    DataUri(String),
    /// An external URI resolved through resource records.
    Uri(String),
}

#[derive(Debug, Clone)]
pub(crate) struct BufferPlan {
    pub index: usize,
    pub label: String,
    pub byte_length: usize,
    pub source: BufferSource,
}

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ImageSource {
    Uri(String),
    DataUri(String),
    View {
        buffer: usize,
        offset: usize,
        length: usize,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct ImagePlan {
    pub index: usize,
    pub label: String,
    pub mime_type: Option<String>,
    pub source: ImageSource,
}

/// An attribute present in the file but not mapped to a vertex semantic.
#[derive(Debug, Clone)]
pub(crate) struct SkippedAttribute {
    pub primitive: String,
    pub semantic: String,
}

/// Everything resource resolution needs, in slot order.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResourcePlan {
    pub buffers: Vec<BufferPlan>,
    pub images: Vec<ImagePlan>,
    pub primitives: Vec<PrimitivePlan>,
    /// Primitive plan indices per mesh.
    pub mesh_primitives: Vec<Vec<usize>>,
    pub skipped_attributes: Vec<SkippedAttribute>,
}

fn label(name: Option<&str>, fallback: impl FnOnce() -> String) -> String {
    match name {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ => fallback(),
    }
}

impl ResourcePlan {
    /// Builds the plan. `has_bin` tells whether a GLB BIN chunk is present.
    pub(crate) fn from_document(
        document: &gltf_dep::Document,
        has_bin: bool,
    ) -> Result<Self, AssetError> {
        let mut plan = Self::default();

        for buffer in document.buffers() {
            let source = match buffer.source() {
                gltf_dep::buffer::Source::Bin => {
                    if !has_bin || buffer.index() != 0 {
                        return Err(AssetError::malformed(format!(
                            "buffer {} has no uri and there is no GLB BIN chunk for it",
                            buffer.index()
                        )));
                    }
                    BufferSource::Embedded
                }
                gltf_dep::buffer::Source::Uri(uri) if is_data_uri(uri) => {
                    BufferSource::DataUri(uri.to_owned())
                }
                gltf_dep::buffer::Source::Uri(uri) => BufferSource::Uri(uri.to_owned()),
            };
            let index = buffer.index();
            plan.buffers.push(BufferPlan {
                index,
                label: label(buffer.name(), || match &source {
                    BufferSource::Uri(uri) => uri.clone(),
                    _ => format!("buffer[{index}]"),
                }),
                byte_length: buffer.length(),
                source,
            });
        }

        for image in document.images() {
            let index = image.index();
            let (source, mime_type) = match image.source() {
                gltf_dep::image::Source::Uri { uri, mime_type } => {
                    let source = if is_data_uri(uri) {
                        ImageSource::DataUri(uri.to_owned())
                    } else {
                        ImageSource::Uri(uri.to_owned())
                    };
                    (source, mime_type.map(str::to_owned))
                }
                gltf_dep::image::Source::View { view, mime_type } => (
                    ImageSource::View {
                        buffer: view.buffer().index(),
                        offset: view.offset(),
                        length: view.length(),
                    },
                    Some(mime_type.to_owned()),
                ),
            };
            plan.images.push(ImagePlan {
                index,
                label: label(image.name(), || match &source {
                    ImageSource::Uri(uri) => uri.clone(),
                    _ => format!("image[{index}]"),
                }),
                mime_type,
                source,
            });
        }

        let mut layouts: Vec<Arc<VertexLayout>> = Vec::new();
        for mesh in document.meshes() {
            let mut indices = Vec::new();
            for primitive in mesh.primitives() {
                let primitive_label = label(mesh.name(), || format!("mesh[{}]", mesh.index()));
                let primitive_label = format!("{primitive_label}/primitive[{}]", primitive.index());

                let mut mapped = Vec::new();
                for (semantic, accessor) in primitive.attributes() {
                    match map_semantic(&semantic) {
                        Some(mapped_semantic) => mapped.push((mapped_semantic, accessor)),
                        None => plan.skipped_attributes.push(SkippedAttribute {
                            primitive: primitive_label.clone(),
                            semantic: semantic.to_string(),
                        }),
                    }
                }
                mapped.sort_by_key(|(semantic, _)| *semantic);

                let mut layout = VertexLayout::new();
                for (semantic, _) in &mapped {
                    layout.push(*semantic);
                }
                let layout = find_or_create_layout(layout, &mut layouts);

                let mut bounds = None;
                let attributes = mapped
                    .iter()
                    .zip(layout.attributes())
                    .map(|((semantic, accessor), attribute)| {
                        if *semantic == crate::mesh::VertexAttributeSemantic::Position {
                            bounds = match (read_bound(accessor.min()), read_bound(accessor.max())) {
                                (Some(min), Some(max)) => Some(BoundingBox::new(min, max)),
                                _ => None,
                            };
                        }
                        (*attribute, AccessorPlan::from_gltf(accessor))
                    })
                    .collect();

                indices.push(plan.primitives.len());
                plan.primitives.push(PrimitivePlan {
                    mesh: mesh.index(),
                    primitive: primitive.index(),
                    label: primitive_label,
                    topology: map_topology(primitive.mode()),
                    layout,
                    attributes,
                    indices: primitive.indices().map(|a| AccessorPlan::from_gltf(&a)),
                    material: primitive.material().index(),
                    bounds,
                });
            }
            plan.mesh_primitives.push(indices);
        }

        Ok(plan)
    }

    /// Total number of resource slots.
    pub(crate) fn slot_count(&self) -> usize {
        self.buffers.len() + self.images.len() + self.primitives.len()
    }

    pub(crate) fn buffer_slot(&self, buffer: usize) -> usize {
        buffer
    }

    pub(crate) fn image_slot(&self, image: usize) -> usize {
        self.buffers.len() + image
    }

    pub(crate) fn primitive_slot(&self, primitive: usize) -> usize {
        self.buffers.len() + self.images.len() + primitive
    }
}
