//! Resource resolution through the public API.

mod common;

use redlilium_gltfio::engine::UploadKind;
use redlilium_gltfio::{
    AssetError, ErrorKind, LoaderConfig, ResourceConfig, ResourceFailure, ResourceState, SlotId,
    SlotKind,
};
use serde_json::json;

use common::{
    Harness, data_uri, glb, png, structure_only_scene, textured_glb, textured_scene, to_bytes,
    triangle_bytes,
};

fn states(asset: &redlilium_gltfio::Asset) -> Vec<ResourceState> {
    asset
        .resource_states()
        .unwrap()
        .into_iter()
        .map(|slot| slot.state)
        .collect()
}

#[test]
fn no_external_resources_is_a_noop() {
    let mut h = Harness::new();
    let asset = h
        .assets
        .create_asset_from_json(&to_bytes(&structure_only_scene()))
        .unwrap();

    let report = h.resources.load_resources(&asset).unwrap();
    assert!(report.is_complete());
    assert!(report.resolved.is_empty());
    assert_eq!(report.uploads, 0);
    assert_eq!(h.engine.upload_count(), 0);
    assert!(asset.resource_states().unwrap().is_empty());
}

#[test]
fn resolves_buffers_images_and_primitives() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();

    let slots = asset.resource_states().unwrap();
    assert_eq!(slots.len(), 3);
    assert_eq!(slots[0].kind, SlotKind::Buffer(0));
    assert_eq!(slots[0].uri.as_deref(), Some("mesh.bin"));
    assert_eq!(slots[1].kind, SlotKind::Image(0));
    assert_eq!(slots[1].label, "tex.png");
    assert_eq!(
        slots[2].kind,
        SlotKind::Primitive {
            mesh: 0,
            primitive: 0
        }
    );
    assert!(slots.iter().all(|s| s.state == ResourceState::Unresolved));
    assert_eq!(asset.pending_uris().unwrap(), ["mesh.bin", "tex.png"]);
    assert_eq!(asset.unresolved_entities().unwrap().len(), 2);

    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(4, 2));
    let report = h.resources.load_resources(&asset).unwrap();

    assert!(report.is_complete(), "{:?}", report.failed);
    let mut resolved = report.resolved.clone();
    resolved.sort();
    assert_eq!(resolved, [SlotId(0), SlotId(1), SlotId(2)]);
    assert_eq!(report.uploads, 3);
    assert_eq!(h.engine.upload_count_of(UploadKind::Texture), 1);
    assert_eq!(h.engine.upload_count_of(UploadKind::Vertex), 1);
    assert_eq!(h.engine.upload_count_of(UploadKind::Index), 1);

    assert!(states(&asset).iter().all(|s| *s == ResourceState::Resolved));
    assert!(asset.pending_uris().unwrap().is_empty());
    assert!(asset.unresolved_entities().unwrap().is_empty());

    let texture = asset.gpu_texture(0).unwrap().unwrap();
    assert_eq!((texture.width, texture.height), (4, 2));
    let primitive = asset.gpu_primitive(SlotId(2)).unwrap().unwrap();
    assert_eq!(primitive.vertex_count, 3);
    assert_eq!(primitive.index_count, 3);
    assert!(primitive.index_buffer.is_some());
    assert_eq!(primitive.layout.stride(), 12);
}

#[test]
fn second_load_uploads_nothing() {
    let mut h = Harness::with_config(
        LoaderConfig::default(),
        ResourceConfig {
            retain_records: true,
            ..ResourceConfig::default()
        },
    );
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(2, 2));

    h.resources.load_resources(&asset).unwrap();
    let uploads = h.engine.upload_count();

    let again = h.resources.load_resources(&asset).unwrap();
    assert!(again.is_complete());
    assert!(again.resolved.is_empty());
    assert_eq!(again.uploads, 0);
    assert_eq!(again.skipped, 3);
    assert_eq!(h.engine.upload_count(), uploads);
}

#[test]
fn missing_record_fails_only_that_slot() {
    let mut h = Harness::new();
    let mut json = textured_scene();
    json["buffers"]
        .as_array_mut()
        .unwrap()
        .push(json!({"uri": "missing.bin", "byteLength": 4}));
    let asset = h.assets.create_asset_from_json(&to_bytes(&json)).unwrap();

    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(2, 2));
    let report = h.resources.load_resources(&asset).unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(
        report.failure(SlotId(1)),
        Some(&AssetError::MissingResource {
            uri: "missing.bin".into()
        })
    );
    assert_eq!(report.resolved.len(), 3);
    assert_eq!(
        states(&asset),
        [
            ResourceState::Resolved,
            ResourceState::Failed(ResourceFailure::Missing {
                uri: "missing.bin".into()
            }),
            ResourceState::Resolved,
            ResourceState::Resolved,
        ]
    );
}

#[test]
fn missing_buffer_fails_dependent_primitive() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("tex.png", png(2, 2));

    let report = h.resources.load_resources(&asset).unwrap();
    assert_eq!(report.resolved, [SlotId(1)]);
    assert_eq!(
        report.failure(SlotId(0)).map(AssetError::kind),
        Some(ErrorKind::MissingResource)
    );
    assert_eq!(
        report.failure(SlotId(2)).map(AssetError::kind),
        Some(ErrorKind::DecodeFailure)
    );
    assert_eq!(
        states(&asset)[2],
        ResourceState::Failed(ResourceFailure::MissingDependency {
            dependency: SlotId(0)
        })
    );
    assert!(asset.gpu_primitive(SlotId(2)).unwrap().is_none());
    assert!(asset.unresolved_entities().unwrap().is_empty());
}

#[test]
fn failed_slots_stay_failed() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    let first = h.resources.load_resources(&asset).unwrap();
    assert_eq!(first.failed.len(), 3);

    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(2, 2));
    let second = h.resources.load_resources(&asset).unwrap();
    assert_eq!(second.skipped, 3);
    assert_eq!(second.uploads, 0);
    assert!(
        states(&asset)
            .iter()
            .all(|s| matches!(s, ResourceState::Failed(_)))
    );
}

#[test]
fn corrupt_image_fails_with_decode_failure() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", &b"\x89PNG\r\n\x1a\nnot really"[..]);

    let report = h.resources.load_resources(&asset).unwrap();
    let err = report.failure(SlotId(1)).unwrap();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    assert!(err.to_string().contains("tex.png"));
    assert_eq!(states(&asset)[2], ResourceState::Resolved);
}

#[test]
fn short_buffer_is_a_decode_failure() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", &triangle_bytes()[..40]);
    h.resources.add_resource_data("tex.png", png(1, 1));

    let report = h.resources.load_resources(&asset).unwrap();
    let err = report.failure(SlotId(0)).unwrap();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
    assert!(err.to_string().contains("byteLength"), "{err}");
    assert!(matches!(
        states(&asset)[2],
        ResourceState::Failed(ResourceFailure::MissingDependency { .. })
    ));
}

#[test]
fn accessor_past_buffer_view_fails_primitive() {
    let mut h = Harness::new();
    let mut json = textured_scene();
    json["accessors"][0]["count"] = json!(4);
    let asset = h.assets.create_asset_from_json(&to_bytes(&json)).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(1, 1));

    let report = h.resources.load_resources(&asset).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(
        report.failure(SlotId(2)).map(AssetError::kind),
        Some(ErrorKind::DecodeFailure)
    );
    assert_eq!(h.engine.upload_count_of(UploadKind::Vertex), 0);
}

#[test]
fn huge_accessor_count_fails_without_allocating() {
    let mut h = Harness::new();
    let mut json = textured_scene();
    json["accessors"][0]["count"] = json!(4_000_000_000_000u64);
    let asset = h.assets.create_asset_from_json(&to_bytes(&json)).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(1, 1));

    let report = h.resources.load_resources(&asset).unwrap();
    let failure = report.failure(SlotId(2)).unwrap();
    assert_eq!(failure.kind(), ErrorKind::DecodeFailure);
    assert!(failure.to_string().contains("past the end"), "{failure}");
    assert_eq!(report.resolved.len(), 2);
    assert_eq!(h.engine.upload_count_of(UploadKind::Vertex), 0);
}

#[test]
fn overflowing_accessor_offset_fails_primitive() {
    let mut h = Harness::new();
    let mut json = textured_scene();
    json["bufferViews"][0]["byteOffset"] = json!(18_446_744_073_709_551_000u64);
    json["accessors"][0]["byteOffset"] = json!(1000);
    let asset = h.assets.create_asset_from_json(&to_bytes(&json)).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(1, 1));

    let report = h.resources.load_resources(&asset).unwrap();
    let failure = report.failure(SlotId(2)).unwrap();
    assert_eq!(failure.kind(), ErrorKind::DecodeFailure);
    assert!(failure.to_string().contains("overflows"), "{failure}");
    assert!(matches!(
        &states(&asset)[2],
        ResourceState::Failed(ResourceFailure::Decode { reason }) if reason.contains("overflows")
    ));
    assert_eq!(h.engine.upload_count_of(UploadKind::Vertex), 0);
}

#[test]
fn glb_uses_embedded_buffer() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_binary(&textured_glb()).unwrap();
    assert_eq!(asset.pending_uris().unwrap(), ["tex.png"]);
    assert_eq!(asset.resource_states().unwrap()[0].uri, None);

    h.resources.add_resource_data("tex.png", png(2, 2));
    let report = h.resources.load_resources(&asset).unwrap();
    assert!(report.is_complete(), "{:?}", report.failed);
    assert_eq!(report.resolved.len(), 3);
}

#[test]
fn data_uris_need_no_records() {
    let mut h = Harness::new();
    let mut json = textured_scene();
    json["buffers"][0]["uri"] = data_uri("application/octet-stream", &triangle_bytes()).into();
    json["images"][0]["uri"] = data_uri("image/png", &png(3, 3)).into();
    let asset = h.assets.create_asset_from_json(&to_bytes(&json)).unwrap();
    assert!(asset.pending_uris().unwrap().is_empty());

    let report = h.resources.load_resources(&asset).unwrap();
    assert!(report.is_complete(), "{:?}", report.failed);
    assert_eq!(asset.gpu_texture(0).unwrap().unwrap().width, 3);
}

#[test]
fn images_in_buffer_views() {
    let mut h = Harness::new();
    let image = png(5, 1);
    let mut bin = triangle_bytes();
    bin.extend_from_slice(&image);

    let mut json = textured_scene();
    json["buffers"] = json!([{"byteLength": bin.len()}]);
    json["bufferViews"]
        .as_array_mut()
        .unwrap()
        .push(json!({"buffer": 0, "byteOffset": 44, "byteLength": image.len()}));
    json["images"] = json!([{"bufferView": 2, "mimeType": "image/png"}]);

    let asset = h.assets.create_asset_from_binary(&glb(&json, Some(&bin))).unwrap();
    let report = h.resources.load_resources(&asset).unwrap();
    assert!(report.is_complete(), "{:?}", report.failed);
    assert_eq!(asset.gpu_texture(0).unwrap().unwrap().width, 5);
}

#[test]
fn records_clear_after_load_unless_retained() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.load_resources(&asset).unwrap();
    assert_eq!(h.resources.record_count(), 0);

    let mut kept = Harness::with_config(
        LoaderConfig::default(),
        ResourceConfig {
            retain_records: true,
            ..ResourceConfig::default()
        },
    );
    let asset = kept.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    kept.resources.add_resource_data("mesh.bin", triangle_bytes());
    kept.resources.load_resources(&asset).unwrap();
    assert!(kept.resources.has_resource_data("mesh.bin"));
}

#[test]
fn one_record_serves_many_assets() {
    let mut h = Harness::with_config(
        LoaderConfig::default(),
        ResourceConfig {
            retain_records: true,
            ..ResourceConfig::default()
        },
    );
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(2, 2));

    for _ in 0..3 {
        let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
        let report = h.resources.load_resources(&asset).unwrap();
        assert!(report.is_complete());
    }
    assert_eq!(h.engine.upload_count_of(UploadKind::Texture), 3);
}

#[test]
fn destroy_releases_uploads() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(2, 2));
    h.resources.load_resources(&asset).unwrap();
    let primitive = asset.gpu_primitive(SlotId(2)).unwrap().unwrap();

    h.assets.destroy_asset(&asset).unwrap();
    let released = h.engine.released_buffers();
    assert_eq!(released.len(), 2);
    assert!(released.contains(&primitive.vertex_buffer));
    assert_eq!(h.engine.released_textures().len(), 1);

    let err = h.resources.load_resources(&asset).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UseAfterDestroy);
}

#[test]
fn bounds_recomputed_on_request() {
    let mut json = textured_scene();
    json["accessors"][0]["max"] = json!([5.0, 5.0, 5.0]);

    for (recompute, expected) in [(false, [5.0, 5.0, 5.0]), (true, [1.0, 1.0, 0.0])] {
        let mut h = Harness::with_config(
            LoaderConfig::default(),
            ResourceConfig {
                recompute_bounding_boxes: recompute,
                ..ResourceConfig::default()
            },
        );
        let asset = h.assets.create_asset_from_json(&to_bytes(&json)).unwrap();
        h.resources.add_resource_data("mesh.bin", triangle_bytes());
        h.resources.load_resources(&asset).unwrap();
        let bounds = asset.gpu_primitive(SlotId(2)).unwrap().unwrap().bounds.unwrap();
        assert_eq!(bounds.max, expected);
    }
}

#[test]
fn parallel_image_decoding() {
    let mut h = Harness::with_config(
        LoaderConfig::default(),
        ResourceConfig {
            decode_threads: 4,
            ..ResourceConfig::default()
        },
    );
    let mut json = structure_only_scene();
    json["images"] = (0..8)
        .map(|i| json!({"uri": format!("tex{i}.png")}))
        .collect::<Vec<_>>()
        .into();
    let asset = h.assets.create_asset_from_json(&to_bytes(&json)).unwrap();
    for i in 0..8u32 {
        h.resources.add_resource_data(format!("tex{i}.png"), png(i + 1, 1));
    }

    let report = h.resources.load_resources(&asset).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.uploads, 8);
    for i in 0..8u32 {
        let texture = asset.gpu_texture(i as usize).unwrap().unwrap();
        assert_eq!(texture.width, i + 1);
    }
}
