//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use redlilium_gltfio::{
    AssetLoader, HeadlessEngine, LoaderConfig, MaterialGenerator, ResourceConfig, ResourceLoader,
};
use serde_json::{Value, json};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Engine, asset loader and resource loader wired together.
pub struct Harness {
    pub engine: Arc<HeadlessEngine>,
    pub generator: Arc<MaterialGenerator>,
    pub assets: AssetLoader,
    pub resources: ResourceLoader,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default(), ResourceConfig::default())
    }

    pub fn with_config(loader: LoaderConfig, resources: ResourceConfig) -> Self {
        init_logging();
        let engine = Arc::new(HeadlessEngine::new());
        let generator = Arc::new(MaterialGenerator::new());
        Self {
            assets: AssetLoader::with_config(engine.clone(), generator.clone(), loader),
            resources: ResourceLoader::with_config(engine.clone(), resources),
            engine,
            generator,
        }
    }
}

/// One triangle: 36 bytes of positions, 6 bytes of `u16` indices, 2 bytes padding.
pub fn triangle_bytes() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bytes = bytemuck::cast_slice(&positions).to_vec();
    bytes.extend_from_slice(bytemuck::cast_slice(&indices));
    bytes.extend_from_slice(&[0, 0]);
    bytes
}

/// Root node with two children sharing one triangle mesh.
///
/// Buffer 0 is `mesh.bin` (drop the uri for GLB). The mesh material has a
/// base color texture from `tex.png`. Slots: buffer 0, image 1, primitive 2.
pub fn textured_scene() -> Value {
    json!({
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [
            {"name": "root", "children": [1, 2], "translation": [0.0, 2.0, 0.0]},
            {"name": "left", "mesh": 0, "translation": [-1.0, 0.0, 0.0]},
            {"name": "right", "mesh": 0, "translation": [1.0, 0.0, 0.0]}
        ],
        "meshes": [{
            "name": "triangle",
            "primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]
        }],
        "materials": [{
            "name": "red",
            "pbrMetallicRoughness": {
                "baseColorFactor": [1.0, 0.0, 0.0, 1.0],
                "baseColorTexture": {"index": 0}
            }
        }],
        "textures": [{"source": 0}],
        "images": [{"uri": "tex.png"}],
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
        "buffers": [{"uri": "mesh.bin", "byteLength": 44}]
    })
}

/// Three nested nodes without meshes. The leaf uses a matrix transform.
pub fn structure_only_scene() -> Value {
    json!({
        "asset": {"version": "2.0"},
        "nodes": [
            {"name": "root", "children": [1]},
            {"name": "child", "children": [2]},
            {"name": "leaf", "matrix": [
                1.0, 0.0, 0.0, 0.0,
                0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0,
                0.0, 0.0, 5.0, 1.0
            ]}
        ]
    })
}

pub fn to_bytes(json: &Value) -> Vec<u8> {
    serde_json::to_vec(json).unwrap()
}

/// Packs a GLB container: JSON padded with spaces, BIN padded with zeros.
pub fn glb(json: &Value, bin: Option<&[u8]>) -> Vec<u8> {
    let mut json_bytes = to_bytes(json);
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }
    let bin = bin.map(|bytes| {
        let mut bytes = bytes.to_vec();
        while bytes.len() % 4 != 0 {
            bytes.push(0);
        }
        bytes
    });

    let total = 12 + 8 + json_bytes.len() + bin.as_ref().map_or(0, |b| 8 + b.len());
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(b"glTF");
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(b"JSON");
    out.extend_from_slice(&json_bytes);
    if let Some(bin) = bin {
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
    }
    out
}

/// The textured scene as GLB with the triangle in the BIN chunk.
pub fn textured_glb() -> Vec<u8> {
    let mut json = textured_scene();
    json["buffers"][0].as_object_mut().unwrap().remove("uri");
    glb(&json, Some(&triangle_bytes()))
}

/// A solid-color PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let pixels: Vec<u8> = (0..width * height)
        .flat_map(|_| [255u8, 128, 0, 255])
        .collect();
    let image = image::RgbaImage::from_raw(width, height, pixels).unwrap();
    let mut out = std::io::Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// `data:` URI with a base64 payload.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    use base64::Engine as _;
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
