//! Accessor reading and vertex interleaving for glTF primitives.
//!
//! Everything here works on resolved buffer bytes and checks every read
//! against both the buffer view and the buffer, so corrupt offsets become
//! decode failures rather than panics.

use std::sync::Arc;

use gltf_dep::accessor::DataType;

use crate::mesh::{
    BoundingBox, PrimitiveGeometry, PrimitiveTopology, VertexAttribute, VertexAttributeFormat,
    VertexAttributeSemantic, VertexLayout,
};

/// Map a glTF semantic to a vertex attribute semantic.
pub(crate) fn map_semantic(semantic: &gltf_dep::Semantic) -> Option<VertexAttributeSemantic> {
    match semantic {
        gltf_dep::Semantic::Positions => Some(VertexAttributeSemantic::Position),
        gltf_dep::Semantic::Normals => Some(VertexAttributeSemantic::Normal),
        gltf_dep::Semantic::Tangents => Some(VertexAttributeSemantic::Tangent),
        gltf_dep::Semantic::Colors(0) => Some(VertexAttributeSemantic::Color),
        gltf_dep::Semantic::TexCoords(0) => Some(VertexAttributeSemantic::TexCoord0),
        gltf_dep::Semantic::TexCoords(1) => Some(VertexAttributeSemantic::TexCoord1),
        gltf_dep::Semantic::Joints(0) => Some(VertexAttributeSemantic::Joints),
        gltf_dep::Semantic::Weights(0) => Some(VertexAttributeSemantic::Weights),
        _ => None, // Ignore additional sets (Colors(1+), TexCoords(2+), etc.)
    }
}

/// Map glTF primitive mode to our PrimitiveTopology.
pub(crate) fn map_topology(mode: gltf_dep::mesh::Mode) -> Result<PrimitiveTopology, String> {
    match mode {
        gltf_dep::mesh::Mode::Points => Ok(PrimitiveTopology::PointList),
        gltf_dep::mesh::Mode::Lines => Ok(PrimitiveTopology::LineList),
        gltf_dep::mesh::Mode::LineStrip => Ok(PrimitiveTopology::LineStrip),
        gltf_dep::mesh::Mode::Triangles => Ok(PrimitiveTopology::TriangleList),
        gltf_dep::mesh::Mode::TriangleStrip => Ok(PrimitiveTopology::TriangleStrip),
        other => Err(format!("unsupported primitive mode {other:?}")),
    }
}

/// Location and encoding of one accessor's elements.
#[derive(Debug, Clone)]
pub(crate) struct AccessorPlan {
    pub index: usize,
    pub buffer: usize,
    /// Byte offset of the first element in the buffer.
    offset: usize,
    /// End of the buffer view in the buffer.
    view_end: usize,
    stride: usize,
    pub count: usize,
    data_type: DataType,
    components: usize,
    normalized: bool,
}

impl AccessorPlan {
    /// Captures an accessor's layout. Sparse accessors and accessors
    /// without a buffer view are rejected.
    pub(crate) fn from_gltf(accessor: &gltf_dep::Accessor<'_>) -> Result<Self, String> {
        if accessor.sparse().is_some() {
            return Err(format!(
                "accessor {} is sparse; sparse accessors are not supported",
                accessor.index()
            ));
        }
        let view = accessor.view().ok_or_else(|| {
            format!("accessor {} has no buffer view", accessor.index())
        })?;

        let offset = view.offset().checked_add(accessor.offset()).ok_or_else(|| {
            format!("accessor {} byte offset overflows", accessor.index())
        })?;
        let view_end = view.offset().checked_add(view.length()).ok_or_else(|| {
            format!("buffer view {} byte range overflows", view.index())
        })?;

        let data_type = accessor.data_type();
        let components = accessor.dimensions().multiplicity();
        let element_size = data_type.size() * components;
        Ok(Self {
            index: accessor.index(),
            buffer: view.buffer().index(),
            offset,
            view_end,
            stride: view.stride().unwrap_or(element_size),
            count: accessor.count(),
            data_type,
            components,
            normalized: accessor.normalized(),
        })
    }

    fn element_size(&self) -> usize {
        self.data_type.size() * self.components
    }

    /// Checks that every element lies inside the buffer view and the view
    /// inside a buffer of `buffer_len` bytes.
    fn check_bounds(&self, buffer_len: usize) -> Result<(), String> {
        let element_size = self.element_size();
        if self.count > 0 {
            let end = (self.count - 1)
                .checked_mul(self.stride)
                .and_then(|span| span.checked_add(self.offset))
                .and_then(|start| start.checked_add(element_size))
                .ok_or_else(|| format!("accessor {} size overflows", self.index))?;
            if end > self.view_end {
                return Err(format!(
                    "accessor {} reads to byte {end}, past the end of its buffer view ({})",
                    self.index, self.view_end
                ));
            }
            if self.view_end > buffer_len {
                return Err(format!(
                    "accessor {} buffer view ends at byte {} but buffer {} has {} bytes",
                    self.index,
                    self.view_end,
                    self.buffer,
                    buffer_len
                ));
            }
        }
        Ok(())
    }

    /// Bounds-checked element slices.
    fn elements<'b>(&self, data: &'b [u8]) -> Result<impl Iterator<Item = &'b [u8]>, String> {
        self.check_bounds(data.len())?;
        let element_size = self.element_size();
        let (offset, stride) = (self.offset, self.stride);
        Ok((0..self.count).map(move |i| {
            let start = offset + i * stride;
            &data[start..start + element_size]
        }))
    }

    fn component(&self, element: &[u8], c: usize) -> f32 {
        let size = self.data_type.size();
        let bytes = &element[c * size..(c + 1) * size];
        match self.data_type {
            DataType::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            DataType::U8 if self.normalized => f32::from(bytes[0]) / 255.0,
            DataType::U8 => f32::from(bytes[0]),
            DataType::I8 if self.normalized => (f32::from(bytes[0] as i8) / 127.0).max(-1.0),
            DataType::I8 => f32::from(bytes[0] as i8),
            DataType::U16 => {
                let v = f32::from(u16::from_le_bytes([bytes[0], bytes[1]]));
                if self.normalized { v / 65535.0 } else { v }
            }
            DataType::I16 => {
                let v = f32::from(i16::from_le_bytes([bytes[0], bytes[1]]));
                if self.normalized { (v / 32767.0).max(-1.0) } else { v }
            }
            DataType::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
        }
    }

    /// Reads elements as `out` floats each. Missing components are filled
    /// with 0, except a fourth component which defaults to 1 (color alpha).
    fn read_floats(&self, data: &[u8], out: usize) -> Result<Vec<f32>, String> {
        if self.components > 4 {
            return Err(format!(
                "accessor {} has {} components, expected at most 4",
                self.index, self.components
            ));
        }
        let mut values = Vec::with_capacity(self.count * out);
        for element in self.elements(data)? {
            for c in 0..out {
                values.push(if c < self.components {
                    self.component(element, c)
                } else if c == 3 {
                    1.0
                } else {
                    0.0
                });
            }
        }
        Ok(values)
    }

    fn read_joints(&self, data: &[u8]) -> Result<Vec<u16>, String> {
        if !matches!(self.data_type, DataType::U8 | DataType::U16) || self.components != 4 {
            return Err(format!(
                "joint accessor {} must be VEC4 of unsigned byte or short",
                self.index
            ));
        }
        let mut values = Vec::with_capacity(self.count * 4);
        for element in self.elements(data)? {
            for c in 0..4 {
                values.push(match self.data_type {
                    DataType::U8 => u16::from(element[c]),
                    _ => u16::from_le_bytes([element[c * 2], element[c * 2 + 1]]),
                });
            }
        }
        Ok(values)
    }

    /// Reads a scalar unsigned accessor as `u32` indices.
    pub(crate) fn read_indices(&self, data: &[u8]) -> Result<Vec<u32>, String> {
        if self.components != 1 {
            return Err(format!("index accessor {} is not SCALAR", self.index));
        }
        let elements = self.elements(data)?;
        match self.data_type {
            DataType::U8 => Ok(elements.map(|e| u32::from(e[0])).collect()),
            DataType::U16 => Ok(elements
                .map(|e| u32::from(u16::from_le_bytes([e[0], e[1]])))
                .collect()),
            DataType::U32 => Ok(elements
                .map(|e| u32::from_le_bytes([e[0], e[1], e[2], e[3]]))
                .collect()),
            other => Err(format!(
                "unsupported index type {other:?} in accessor {}",
                self.index
            )),
        }
    }
}

/// Reads the `[x, y, z]` in an accessor's `min` or `max` property.
pub(crate) fn read_bound(value: Option<gltf_dep::json::Value>) -> Option<[f32; 3]> {
    let value = value?;
    let array = value.as_array()?;
    if array.len() < 3 {
        return None;
    }
    let mut out = [0.0f32; 3];
    for (slot, v) in out.iter_mut().zip(array) {
        *slot = v.as_f64()? as f32;
    }
    Some(out)
}

/// Everything needed to decode one primitive once its buffers are known.
#[derive(Debug, Clone)]
pub(crate) struct PrimitivePlan {
    pub mesh: usize,
    pub primitive: usize,
    pub label: String,
    pub topology: Result<PrimitiveTopology, String>,
    pub layout: Arc<VertexLayout>,
    pub attributes: Vec<(VertexAttribute, Result<AccessorPlan, String>)>,
    pub indices: Option<Result<AccessorPlan, String>>,
    pub material: Option<usize>,
    pub bounds: Option<BoundingBox>,
}

impl PrimitivePlan {
    /// Buffers the primitive reads from, deduplicated.
    pub(crate) fn buffers(&self) -> Vec<usize> {
        let mut buffers: Vec<usize> = self
            .attributes
            .iter()
            .filter_map(|(_, plan)| plan.as_ref().ok().map(|p| p.buffer))
            .chain(
                self.indices
                    .iter()
                    .filter_map(|plan| plan.as_ref().ok().map(|p| p.buffer)),
            )
            .collect();
        buffers.sort_unstable();
        buffers.dedup();
        buffers
    }

    /// Whether the primitive has vertex colors.
    pub(crate) fn has_colors(&self) -> bool {
        self.layout.has(VertexAttributeSemantic::Color)
    }

    /// Reads and interleaves all attributes.
    ///
    /// `buffer` returns the resolved bytes of a buffer index.
    pub(crate) fn decode<'b>(
        &self,
        buffer: impl Fn(usize) -> Option<&'b [u8]>,
    ) -> Result<PrimitiveGeometry, String> {
        let topology = self.topology.clone()?;
        let fetch = |plan: &AccessorPlan| {
            buffer(plan.buffer).ok_or_else(|| format!("buffer {} is not available", plan.buffer))
        };

        let vertex_count = self
            .attributes
            .iter()
            .find(|(attr, _)| attr.semantic == VertexAttributeSemantic::Position)
            .ok_or("primitive has no POSITION attribute")?
            .1
            .as_ref()
            .map_err(Clone::clone)?
            .count;

        // Every read is validated before the vertex stream is sized from `count`.
        let mut sources = Vec::with_capacity(self.attributes.len());
        for (attr, plan) in &self.attributes {
            let plan = plan.as_ref().map_err(Clone::clone)?;
            if plan.count != vertex_count {
                return Err(format!(
                    "{} has {} elements, POSITION has {vertex_count}",
                    attr.semantic.gltf_name(),
                    plan.count
                ));
            }
            let data = fetch(plan)?;
            plan.check_bounds(data.len())?;
            sources.push((attr, plan, data));
        }

        let stride = self.layout.stride() as usize;
        let size = vertex_count
            .checked_mul(stride)
            .ok_or_else(|| format!("{vertex_count} vertices of {stride} bytes overflow"))?;
        let mut vertices = vec![0u8; size];

        for (attr, plan, data) in sources {
            let offset = attr.offset as usize;
            match attr.format {
                VertexAttributeFormat::Uint16x4 => {
                    let joints = plan.read_joints(data)?;
                    for (v, chunk) in joints.chunks_exact(4).enumerate() {
                        let dst = v * stride + offset;
                        vertices[dst..dst + 8].copy_from_slice(bytemuck::cast_slice(chunk));
                    }
                }
                format => {
                    let n = format.components();
                    let floats = plan.read_floats(data, n)?;
                    for (v, chunk) in floats.chunks_exact(n).enumerate() {
                        let dst = v * stride + offset;
                        vertices[dst..dst + n * 4].copy_from_slice(bytemuck::cast_slice(chunk));
                    }
                }
            }
        }

        let indices = match &self.indices {
            Some(plan) => {
                let plan = plan.as_ref().map_err(Clone::clone)?;
                let indices = plan.read_indices(fetch(plan)?)?;
                if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertex_count) {
                    return Err(format!(
                        "index {bad} out of range for {vertex_count} vertices"
                    ));
                }
                Some(indices)
            }
            None => None,
        };

        Ok(PrimitiveGeometry {
            layout: Arc::clone(&self.layout),
            vertices,
            vertex_count: vertex_count as u32,
            indices,
            topology,
        })
    }
}

/// Find or create a shared layout.
///
/// Primitives of one asset with equal layouts share one `Arc`.
pub(crate) fn find_or_create_layout(
    layout: VertexLayout,
    layouts: &mut Vec<Arc<VertexLayout>>,
) -> Arc<VertexLayout> {
    if let Some(existing) = layouts.iter().find(|l| ***l == layout) {
        return Arc::clone(existing);
    }
    let arc = Arc::new(layout);
    layouts.push(Arc::clone(&arc));
    arc
}
