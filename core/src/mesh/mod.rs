//! CPU-side mesh types.
//!
//! - [`VertexLayout`] - Describes the interleaved vertex stream of a primitive
//! - [`PrimitiveGeometry`] - Decoded vertex and index data awaiting upload
//! - [`BoundingBox`] - Axis-aligned primitive bounds

mod data;
mod layout;

pub use data::{BoundingBox, PrimitiveGeometry, PrimitiveTopology};
pub use layout::{VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic, VertexLayout};
