//! Decoded primitive data.
//!
//! This module provides:
//! - [`PrimitiveTopology`] - How vertices are assembled into primitives
//! - [`BoundingBox`] - Axis-aligned bounds of a primitive
//! - [`PrimitiveGeometry`] - Interleaved vertex bytes and `u32` indices ready
//!   for upload

use std::sync::Arc;

use super::layout::{VertexAttributeSemantic, VertexLayout};

/// Primitive topology describing how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each vertex is a separate point.
    PointList,
    /// Every two vertices form a line.
    LineList,
    /// Vertices form a connected strip of lines.
    LineStrip,
    /// Every three vertices form a triangle.
    #[default]
    TriangleList,
    /// Vertices form a connected strip of triangles.
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Get the number of vertices per primitive (for non-strip topologies).
    pub fn vertices_per_primitive(&self) -> Option<u32> {
        match self {
            Self::PointList => Some(1),
            Self::LineList => Some(2),
            Self::TriangleList => Some(3),
            Self::LineStrip | Self::TriangleStrip => None, // Variable
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

impl BoundingBox {
    /// An empty box at the origin.
    pub const ZERO: Self = Self {
        min: [0.0; 3],
        max: [0.0; 3],
    };

    /// Creates a box from its corners.
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point. `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = [f32; 3]>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Self::new(first, first);
        for p in points {
            for axis in 0..3 {
                bounds.min[axis] = bounds.min[axis].min(p[axis]);
                bounds.max[axis] = bounds.max[axis].max(p[axis]);
            }
        }
        Some(bounds)
    }

    /// Center point.
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Half size along each axis.
    pub fn half_extent(&self) -> [f32; 3] {
        [
            (self.max[0] - self.min[0]) * 0.5,
            (self.max[1] - self.min[1]) * 0.5,
            (self.max[2] - self.min[2]) * 0.5,
        ]
    }
}

/// Geometry of one primitive after its accessors have been read.
#[derive(Debug, Clone)]
pub struct PrimitiveGeometry {
    /// Layout of `vertices` (shared between primitives with equal layouts).
    pub layout: Arc<VertexLayout>,
    /// Interleaved vertex bytes, `vertex_count * layout.stride()` long.
    pub vertices: Vec<u8>,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Index list, if the primitive is indexed.
    pub indices: Option<Vec<u32>>,
    /// How vertices form primitives.
    pub topology: PrimitiveTopology,
}

impl PrimitiveGeometry {
    /// Iterates vertex positions, if the layout has them.
    pub fn positions(&self) -> Option<impl Iterator<Item = [f32; 3]> + '_> {
        let attr = self.layout.attribute(VertexAttributeSemantic::Position)?;
        let stride = self.layout.stride() as usize;
        let offset = attr.offset as usize;
        Some(self.vertices.chunks_exact(stride).map(move |vertex| {
            bytemuck::pod_read_unaligned::<[f32; 3]>(&vertex[offset..offset + 12])
        }))
    }

    /// Bounds computed from the decoded positions.
    pub fn compute_bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions()?)
    }
}
