//! glTF 2.0 front end.
//!
//! Turns `.gltf` JSON or `.glb` containers into a validated
//! [`gltf_dep::Document`] and a [`ResourcePlan`] describing where every
//! buffer, image and primitive gets its bytes. Nothing here decodes images
//! or uploads anything; the resource loader drives the readers in
//! [`vertex`] once the bytes are available.
//!
//! Supported:
//! - JSON and GLB containers (one JSON chunk, optional BIN chunk)
//! - External, `data:` URI and GLB-embedded buffers
//! - Images by URI, `data:` URI or buffer view
//! - `KHR_materials_unlit`
//!
//! Sparse accessors and the `LINE_LOOP`/`TRIANGLE_FAN` modes are rejected
//! per primitive when the primitive is decoded.

mod document;
mod glb;
mod plan;
mod uri;
pub(crate) mod vertex;

#[cfg(test)]
mod tests;

pub(crate) use document::{SUPPORTED_EXTENSIONS, parse_document};
pub(crate) use glb::{Glb, is_glb};
pub(crate) use plan::{BufferSource, ImageSource, ResourcePlan};
pub(crate) use uri::{data_uri_mime, decode_data_uri};

#[cfg(test)]
pub(crate) use glb::write_glb;
#[cfg(test)]
pub(crate) use uri::encode_data_uri;
