//! Loader configuration.
//!
//! Both structs deserialize from TOML with every field optional:
//!
//! ```toml
//! [loader]
//! diagnostics = true
//!
//! [resources]
//! decode_threads = 4
//! retain_records = false
//! ```

use serde::Deserialize;

/// Settings for [`AssetLoader`](crate::AssetLoader).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Start with verbose validation logging enabled.
    pub diagnostics: bool,
    /// Reject files whose `extensionsRequired` lists an extension this
    /// loader does not understand. When `false` such files load with a warning.
    pub strict_extensions: bool,
}

/// Settings for [`ResourceLoader`](crate::ResourceLoader).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Worker threads used for image decoding. `0` uses available parallelism.
    pub decode_threads: usize,
    /// Keep resource records after a load completes instead of clearing them.
    pub retain_records: bool,
    /// Recompute primitive bounding boxes from decoded positions instead of
    /// trusting the accessor's `min`/`max`.
    pub recompute_bounding_boxes: bool,
}

impl ResourceConfig {
    /// Resolved worker count (never zero).
    pub fn worker_count(&self) -> usize {
        if self.decode_threads == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            self.decode_threads
        }
    }
}

/// Both configurations as they appear in one TOML document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GltfioConfig {
    /// `[loader]` table.
    pub loader: LoaderConfig,
    /// `[resources]` table.
    pub resources: ResourceConfig,
}

impl GltfioConfig {
    /// Parses a configuration from TOML text.
    ///
    /// Returns `Err` with a human-readable message if parsing fails.
    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("failed to parse gltfio config: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = GltfioConfig::from_toml("").unwrap();
        assert_eq!(config, GltfioConfig::default());
        assert!(config.resources.worker_count() >= 1);
    }

    #[test]
    fn parses_both_tables() {
        let config = GltfioConfig::from_toml(
            "[loader]\ndiagnostics = true\n\n[resources]\ndecode_threads = 3\nretain_records = true\n",
        )
        .unwrap();
        assert!(config.loader.diagnostics);
        assert!(!config.loader.strict_extensions);
        assert_eq!(config.resources.worker_count(), 3);
        assert!(config.resources.retain_records);
    }

    #[test]
    fn rejects_wrong_types() {
        let err = GltfioConfig::from_toml("[resources]\ndecode_threads = \"many\"\n").unwrap_err();
        assert!(err.starts_with("failed to parse gltfio config"));
    }
}
