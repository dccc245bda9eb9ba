//! `data:` URI handling for embedded buffers and images.

use base64::Engine as _;

/// Whether a glTF URI embeds its payload.
pub(crate) fn is_data_uri(uri: &str) -> bool {
    uri.starts_with("data:")
}

/// Decodes a base64 `data:` URI (e.g. `data:image/png;base64,...`).
///
/// Returns `None` if `uri` is not a data URI, and `Some(Err)` if it is one
/// but cannot be decoded.
pub(crate) fn decode_data_uri(uri: &str) -> Option<Result<Vec<u8>, String>> {
    let rest = uri.strip_prefix("data:")?;
    let Some((header, payload)) = rest.split_once(',') else {
        return Some(Err("data URI has no ',' separator".into()));
    };
    if !header.ends_with(";base64") {
        return Some(Err(format!(
            "only base64 data URIs are supported, got '{header}'"
        )));
    }
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Some(
        base64::engine::general_purpose::STANDARD
            .decode(payload.as_bytes())
            .map_err(|e| format!("invalid base64 payload: {e}")),
    )
}

/// MIME type declared by a data URI, if any.
pub(crate) fn data_uri_mime(uri: &str) -> Option<&str> {
    let rest = uri.strip_prefix("data:")?;
    let (header, _) = rest.split_once(',')?;
    let mime = header.split(';').next()?;
    (!mime.is_empty()).then_some(mime)
}

/// Encodes bytes as a base64 `data:` URI.
#[cfg(test)]
pub(crate) fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
