//! JSON parsing and document-level validation.

use crate::error::AssetError;

/// Extensions this loader interprets. Anything else listed in
/// `extensionsRequired` is unsupported.
pub(crate) const SUPPORTED_EXTENSIONS: &[&str] = &["KHR_materials_unlit"];

/// Parses glTF JSON into a validated document.
///
/// Checks the asset version, the required extensions and that the file has
/// at least one node, then runs the index validation of the `gltf` crate:
/// out-of-range indices surface as [`AssetError::UnresolvedReference`].
pub(crate) fn parse_document(
    json: &[u8],
    strict_extensions: bool,
    diagnostics: bool,
) -> Result<gltf_dep::Document, AssetError> {
    let mut root = gltf_dep::json::Root::from_slice(json)?;

    check_version(&root.asset.version, root.asset.min_version.as_deref())?;

    let unsupported: Vec<&String> = root
        .extensions_required
        .iter()
        .filter(|ext| !SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .collect();
    if !unsupported.is_empty() {
        let list = unsupported
            .iter()
            .map(|ext| ext.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        if strict_extensions {
            return Err(AssetError::malformed(format!(
                "unsupported required extensions: {list}"
            )));
        }
        log::warn!("loading despite unsupported required extensions: {list}");
        root.extensions_required
            .retain(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()));
    }

    if root.nodes.is_empty() {
        return Err(AssetError::malformed("asset has no nodes"));
    }

    if diagnostics {
        log::debug!(
            "glTF {} ({}): {} nodes, {} meshes, {} materials, {} images, {} buffers",
            root.asset.version,
            root.asset.generator.as_deref().unwrap_or("unknown generator"),
            root.nodes.len(),
            root.meshes.len(),
            root.materials.len(),
            root.images.len(),
            root.buffers.len(),
        );
    }

    Ok(gltf_dep::Document::from_json(root)?)
}

fn parse_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Accepts major version 2 whose `minVersion`, if any, is at most 2.0.
pub(crate) fn check_version(version: &str, min_version: Option<&str>) -> Result<(), AssetError> {
    let (major, _) = parse_version(version)
        .ok_or_else(|| AssetError::malformed(format!("invalid asset version '{version}'")))?;
    if major != 2 {
        return Err(AssetError::malformed(format!(
            "unsupported glTF version {version}"
        )));
    }
    if let Some(min) = min_version {
        let parsed = parse_version(min)
            .ok_or_else(|| AssetError::malformed(format!("invalid minVersion '{min}'")))?;
        if parsed > (2, 0) {
            return Err(AssetError::malformed(format!(
                "asset requires glTF {min}, newer than 2.0"
            )));
        }
    }
    Ok(())
}
