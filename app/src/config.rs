use std::path::Path;

use redlilium_gltfio::GltfioConfig;

/// Loads loader settings from a TOML file.
///
/// Returns `Err` with a human-readable message if the file cannot be read
/// or parsed.
pub fn load_config(path: &Path) -> Result<GltfioConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    GltfioConfig::from_toml(&content).map_err(|e| format!("{}: {e}", path.display()))
}
