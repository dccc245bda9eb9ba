//! Binary glTF (`.glb`) container parsing.
//!
//! Layout: a 12-byte header (`magic`, `version`, `length`) followed by a
//! `JSON` chunk and an optional `BIN\0` chunk. Every chunk starts with an
//! 8-byte header (`length`, `type`) and its length is a multiple of four.

use crate::error::AssetError;

/// `"glTF"` little-endian.
pub(crate) const GLB_MAGIC: u32 = 0x4654_6C67;
/// `"JSON"` little-endian.
pub(crate) const CHUNK_JSON: u32 = 0x4E4F_534A;
/// `"BIN\0"` little-endian.
pub(crate) const CHUNK_BIN: u32 = 0x004E_4942;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// The chunks of a validated GLB container, borrowed from the input.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Glb<'a> {
    pub json: &'a [u8],
    pub bin: Option<&'a [u8]>,
}

/// Whether `bytes` start with the GLB magic.
pub(crate) fn is_glb(bytes: &[u8]) -> bool {
    read_u32(bytes, 0) == Some(GLB_MAGIC)
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(4)?;
    let word = bytes.get(offset..end)?;
    Some(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
}

impl<'a> Glb<'a> {
    /// Validates the container layout and splits it into chunks.
    pub(crate) fn parse(bytes: &'a [u8]) -> Result<Self, AssetError> {
        if bytes.len() < HEADER_LEN {
            return Err(AssetError::malformed(format!(
                "GLB is {} bytes, shorter than its 12-byte header",
                bytes.len()
            )));
        }
        let magic = read_u32(bytes, 0).unwrap_or_default();
        if magic != GLB_MAGIC {
            return Err(AssetError::malformed(format!(
                "bad GLB magic 0x{magic:08x}"
            )));
        }
        let version = read_u32(bytes, 4).unwrap_or_default();
        if version != 2 {
            return Err(AssetError::malformed(format!(
                "unsupported GLB container version {version}"
            )));
        }
        let declared = read_u32(bytes, 8).unwrap_or_default() as usize;
        if declared != bytes.len() {
            return Err(AssetError::malformed(format!(
                "GLB header declares {declared} bytes but {} were given",
                bytes.len()
            )));
        }

        let mut chunks = Vec::with_capacity(2);
        let mut offset = HEADER_LEN;
        while offset < bytes.len() {
            let (Some(length), Some(kind)) = (read_u32(bytes, offset), read_u32(bytes, offset + 4))
            else {
                return Err(AssetError::malformed(format!(
                    "truncated GLB chunk header at byte {offset}"
                )));
            };
            let length = length as usize;
            let start = offset + CHUNK_HEADER_LEN;
            let end = start
                .checked_add(length)
                .filter(|&end| end <= bytes.len())
                .ok_or_else(|| {
                    AssetError::malformed(format!(
                        "GLB chunk {} declares {length} bytes past the end of the file",
                        chunks.len()
                    ))
                })?;
            if length % 4 != 0 {
                return Err(AssetError::malformed(format!(
                    "GLB chunk {} length {length} is not 4-byte aligned",
                    chunks.len()
                )));
            }
            chunks.push((kind, &bytes[start..end]));
            offset = end;
        }

        let mut chunks = chunks.into_iter();
        let json = match chunks.next() {
            Some((CHUNK_JSON, data)) => data,
            Some((kind, _)) => {
                return Err(AssetError::malformed(format!(
                    "first GLB chunk must be JSON, found 0x{kind:08x}"
                )));
            }
            None => return Err(AssetError::malformed("GLB has no JSON chunk")),
        };
        let bin = match chunks.next() {
            Some((CHUNK_BIN, data)) => Some(data),
            Some((kind, _)) => {
                return Err(AssetError::malformed(format!(
                    "second GLB chunk must be BIN, found 0x{kind:08x}"
                )));
            }
            None => None,
        };
        let extra = chunks.count();
        if extra > 0 {
            log::debug!("ignoring {extra} trailing GLB chunks");
        }

        Ok(Self { json, bin })
    }
}

/// Packs a JSON document and optional binary payload into a GLB container.
///
/// JSON is padded with spaces and the binary chunk with zeros.
#[cfg(test)]
pub(crate) fn write_glb(json: &[u8], bin: Option<&[u8]>) -> Vec<u8> {
    let json_pad = (4 - json.len() % 4) % 4;
    let json_chunk_len = json.len() + json_pad;
    let bin_chunk_len = bin.map(|b| b.len() + (4 - b.len() % 4) % 4);
    let total_length =
        HEADER_LEN + CHUNK_HEADER_LEN + json_chunk_len + bin_chunk_len.map_or(0, |l| l + 8);

    let mut glb = Vec::with_capacity(total_length);
    glb.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total_length as u32).to_le_bytes());

    glb.extend_from_slice(&(json_chunk_len as u32).to_le_bytes());
    glb.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    glb.extend_from_slice(json);
    glb.extend(std::iter::repeat_n(b' ', json_pad));

    if let (Some(bin), Some(len)) = (bin, bin_chunk_len) {
        glb.extend_from_slice(&(len as u32).to_le_bytes());
        glb.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        glb.extend_from_slice(bin);
        glb.extend(std::iter::repeat_n(0u8, len - bin.len()));
    }

    glb
}
