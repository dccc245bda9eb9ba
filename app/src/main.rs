//! `gltfio-inspect`: loads a glTF asset from disk and prints what the
//! loader made of it.

mod args;
mod config;
mod print;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use redlilium_gltfio::{
    Asset, AssetLoader, GltfioConfig, HeadlessEngine, LoadReport, MaterialGenerator,
    ResourceLoader,
};

use args::InspectArgs;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = InspectArgs::parse();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every resource resolved.
fn run(args: &InspectArgs) -> Result<bool, String> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => GltfioConfig::default(),
    };
    args.apply(&mut config);

    let bytes = std::fs::read(&args.path)
        .map_err(|e| format!("failed to read {}: {e}", args.path.display()))?;

    let engine = Arc::new(HeadlessEngine::new());
    let assets = AssetLoader::with_config(
        engine.clone(),
        Arc::new(MaterialGenerator::new()),
        config.loader,
    );
    let mut resources = ResourceLoader::with_config(engine.clone(), config.resources);

    let asset = assets
        .create_asset(&bytes)
        .map_err(|e| format!("{}: {e}", args.path.display()))?;
    log::info!(
        "{}: {} entities",
        args.path.display(),
        asset.entities().map_err(|e| e.to_string())?.len()
    );

    let base = args.path.parent().unwrap_or(Path::new("."));
    for uri in asset.pending_uris().map_err(|e| e.to_string())? {
        if let Some(bytes) = read_sibling(base, &uri) {
            resources.add_resource_data(uri, bytes);
        }
    }

    let report = if args.background {
        load_in_background(&mut resources, &asset)
    } else {
        resources.load_resources(&asset)
    }
    .map_err(|e| e.to_string())?;

    println!("{}", print::hierarchy(&asset).map_err(|e| e.to_string())?);
    let slots = print::slots(&asset).map_err(|e| e.to_string())?;
    if !slots.is_empty() {
        println!("\n{slots}");
    }
    println!(
        "\n{} resolved, {} failed, {} uploads ({} bytes)",
        report.resolved.len(),
        report.failed.len(),
        report.uploads,
        engine.uploads().iter().map(|u| u.bytes).sum::<usize>()
    );

    assets.destroy_asset(&asset).map_err(|e| e.to_string())?;
    Ok(report.is_complete())
}

fn load_in_background(
    resources: &mut ResourceLoader,
    asset: &Asset,
) -> Result<LoadReport, redlilium_gltfio::AssetError> {
    let mut load = resources.begin_async_load(asset)?;
    let mut reported = 0;
    while !load.is_finished() {
        let percent = (load.update() * 100.0) as u32;
        if percent >= reported + 25 {
            log::info!("resolving resources: {percent}%");
            reported = percent;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    Ok(load.wait())
}

/// Reads a relative URI from the directory containing the asset.
fn read_sibling(base: &Path, uri: &str) -> Option<Vec<u8>> {
    if uri.contains("://") {
        log::warn!("skipping non-file URI {uri}");
        return None;
    }
    let path = base.join(uri);
    match std::fs::read(&path) {
        Ok(bytes) => {
            log::debug!("read {} ({} bytes)", path.display(), bytes.len());
            Some(bytes)
        }
        Err(e) => {
            log::warn!("{}: {e}", path.display());
            None
        }
    }
}
