//! Front-end tests on glTF documents built in code.

use serde_json::{Value, json};

use super::{ResourcePlan, parse_document};


/// Positions of one triangle followed by `u16` indices, padded to 44 bytes.
fn triangle_bytes() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bytes = bytemuck::cast_slice(&positions).to_vec();
    bytes.extend_from_slice(bytemuck::cast_slice(&indices));
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

/// One root with two children that share a triangle mesh.
///
/// The buffer has no `uri` when `buffer_uri` is `None` (GLB layout).
fn triangle_json(buffer_uri: Option<&str>) -> Value {
    let mut doc = json!({
        "asset": {"version": "2.0", "generator": "gltfio tests"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [
            {"name": "root", "children": [1, 2]},
            {"name": "left", "mesh": 0, "translation": [-1.0, 0.0, 0.0]},
            {"name": "right", "mesh": 0, "translation": [1.0, 0.0, 0.0]}
        ],
        "meshes": [{
            "name": "triangle",
            "primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]
        }],
        "materials": [{"pbrMetallicRoughness": {"baseColorFactor": [1.0, 0.0, 0.0, 1.0]}}],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
        ],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 6}
        ],
        "buffers": [{"byteLength": 44}]
    });
    if let Some(uri) = buffer_uri {
        doc["buffers"][0]["uri"] = uri.into();
    }
    doc
}

fn document(json: &Value) -> gltf_dep::Document {
    parse_document(&serde_json::to_vec(json).unwrap(), false, false).unwrap()
}

fn plan(json: &Value, has_bin: bool) -> ResourcePlan {
    ResourcePlan::from_document(&document(json), has_bin).unwrap()
}
