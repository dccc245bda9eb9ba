//! Asynchronous resource loading.

mod common;

use std::time::{Duration, Instant};

use redlilium_gltfio::{ResourceFailure, ResourceState, SlotId};

use common::{Harness, png, structure_only_scene, textured_scene, to_bytes, triangle_bytes};

fn poll_until_finished(load: &mut redlilium_gltfio::AsyncLoad) {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut last = 0.0;
    while !load.is_finished() {
        let progress = load.update();
        assert!(progress >= last, "progress went backwards");
        assert!((0.0..=1.0).contains(&progress));
        last = progress;
        assert!(Instant::now() < deadline, "async load never finished");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn wait_matches_synchronous_load() {
    let mut sync = Harness::new();
    let asset = sync
        .assets
        .create_asset_from_json(&to_bytes(&textured_scene()))
        .unwrap();
    sync.resources.add_resource_data("mesh.bin", triangle_bytes());
    sync.resources.add_resource_data("tex.png", png(2, 2));
    let expected = sync.resources.load_resources(&asset).unwrap();

    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(2, 2));
    let report = h.resources.begin_async_load(&asset).unwrap().wait();

    let mut resolved = report.resolved.clone();
    resolved.sort();
    let mut expected_resolved = expected.resolved.clone();
    expected_resolved.sort();
    assert_eq!(resolved, expected_resolved);
    assert_eq!(report.uploads, expected.uploads);
    assert!(report.is_complete());
    assert_eq!(h.engine.upload_count(), sync.engine.upload_count());
    assert!(asset.gpu_texture(0).unwrap().is_some());
}

#[test]
fn polling_reaches_full_progress() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(8, 8));

    let mut load = h.resources.begin_async_load(&asset).unwrap();
    assert!(load.progress() < 1.0);
    poll_until_finished(&mut load);

    assert_eq!(load.progress(), 1.0);
    assert!(load.report().is_complete());
    assert_eq!(load.report().resolved.len(), 3);
    assert!(
        asset
            .resource_states()
            .unwrap()
            .iter()
            .all(|slot| slot.state == ResourceState::Resolved)
    );
}

#[test]
fn nothing_to_load_finishes_immediately() {
    let mut h = Harness::new();
    let asset = h
        .assets
        .create_asset_from_json(&to_bytes(&structure_only_scene()))
        .unwrap();

    let load = h.resources.begin_async_load(&asset).unwrap();
    assert!(load.is_finished());
    assert_eq!(load.progress(), 1.0);
    assert_eq!(load.wait().uploads, 0);
}

#[test]
fn cancel_fails_unapplied_slots() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(2, 2));

    let mut load = h.resources.begin_async_load(&asset).unwrap();
    load.cancel();
    assert!(load.is_finished());
    assert_eq!(load.report().failed.len(), 2);

    let cancelled = ResourceState::Failed(ResourceFailure::Cancelled);
    assert_eq!(asset.slot_state(SlotId(0)).unwrap(), Some(ResourceState::Resolved));
    assert_eq!(asset.slot_state(SlotId(1)).unwrap(), Some(cancelled.clone()));
    assert_eq!(asset.slot_state(SlotId(2)).unwrap(), Some(cancelled));
    assert_eq!(h.engine.upload_count(), 0);
}

#[test]
fn cancel_returns_after_decoding_stops() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(64, 64));

    let mut load = h.resources.begin_async_load(&asset).unwrap();
    load.cancel();
    let after_cancel = asset.resource_states().unwrap();
    drop(load);

    std::thread::sleep(std::time::Duration::from_millis(20));
    assert_eq!(asset.resource_states().unwrap(), after_cancel);
    assert_eq!(h.engine.upload_count(), 0);

    let other = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(2, 2));
    let report = h.resources.load_resources(&other).unwrap();
    assert!(report.is_complete(), "{:?}", report.failed);
}

#[test]
fn dropping_the_handle_cancels() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(2, 2));

    drop(h.resources.begin_async_load(&asset).unwrap());
    assert!(
        asset
            .resource_states()
            .unwrap()
            .iter()
            .all(|slot| slot.state.is_terminal())
    );
    assert_eq!(h.engine.upload_count(), 0);
}

#[test]
fn destroy_during_load_uploads_nothing() {
    let mut h = Harness::new();
    let asset = h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap();
    h.resources.add_resource_data("mesh.bin", triangle_bytes());
    h.resources.add_resource_data("tex.png", png(16, 16));

    let load = h.resources.begin_async_load(&asset).unwrap();
    h.assets.destroy_asset(&asset).unwrap();
    assert!(!asset.is_alive());

    let report = load.wait();
    assert_eq!(report.uploads, 0);
    assert_eq!(h.engine.upload_count(), 0);
}

#[test]
fn loads_in_parallel_for_several_assets() {
    let mut h = Harness::new();
    let assets: Vec<_> = (0..3)
        .map(|_| h.assets.create_asset_from_json(&to_bytes(&textured_scene())).unwrap())
        .collect();

    let mut loads = Vec::new();
    for asset in &assets {
        h.resources.add_resource_data("mesh.bin", triangle_bytes());
        h.resources.add_resource_data("tex.png", png(4, 4));
        loads.push(h.resources.begin_async_load(asset).unwrap());
    }
    for mut load in loads {
        poll_until_finished(&mut load);
        assert!(load.report().is_complete());
    }
    assert_eq!(h.engine.upload_count(), 9);
}
