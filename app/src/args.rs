//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use redlilium_gltfio::GltfioConfig;

/// Inspector arguments.
#[derive(Parser, Debug)]
#[command(
    name = "gltfio-inspect",
    about = "Load a glTF asset and print its hierarchy and resource states",
    long_about = "Loads a .gltf or .glb file, resolves external buffers and images from \
        files next to it, and prints the entity hierarchy followed by the state of \
        every resource slot.\n\n\
        EXAMPLES:\n\
          # Inspect a model\n\
          gltfio-inspect model.gltf\n\
        \n\
          # Decode on four threads with validation warnings\n\
          gltfio-inspect model.glb --threads 4 --diagnostics\n\
        \n\
          # Settings from a file\n\
          gltfio-inspect model.gltf --config gltfio.toml",
    version
)]
pub struct InspectArgs {
    /// glTF or GLB file to load.
    pub path: PathBuf,

    /// TOML file with `[loader]` and `[resources]` tables.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log verbose validation warnings while loading.
    #[arg(long)]
    pub diagnostics: bool,

    /// Reject files requiring extensions the loader does not support.
    #[arg(long)]
    pub strict: bool,

    /// Image decoding threads (0 = available parallelism).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Resolve resources on a background thread and report progress.
    #[arg(long)]
    pub background: bool,
}

impl InspectArgs {
    /// Applies command line overrides on top of a loaded configuration.
    pub fn apply(&self, config: &mut GltfioConfig) {
        if self.diagnostics {
            config.loader.diagnostics = true;
        }
        if self.strict {
            config.loader.strict_extensions = true;
        }
        if let Some(threads) = self.threads {
            config.resources.decode_threads = threads;
        }
    }
}
