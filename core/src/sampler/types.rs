//! Sampler descriptor and filter/address mode definitions.

/// Texture filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    /// Nearest neighbor filtering.
    Nearest,
    /// Linear filtering.
    #[default]
    Linear,
}

/// Texture address mode (wrapping behavior).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Clamp to edge.
    ClampToEdge,
    /// Repeat.
    #[default]
    Repeat,
    /// Mirrored repeat.
    MirrorRepeat,
}

/// How a texture binding is sampled.
///
/// Defaults match a glTF texture with no sampler: linear filtering and
/// repeat wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Sampler {
    /// Magnification filter.
    pub mag_filter: FilterMode,
    /// Minification filter.
    pub min_filter: FilterMode,
    /// Mipmap filter. `None` when the texture is sampled without mipmaps.
    pub mipmap_filter: Option<FilterMode>,
    /// Address mode for U coordinate.
    pub address_mode_u: AddressMode,
    /// Address mode for V coordinate.
    pub address_mode_v: AddressMode,
}

impl Sampler {
    /// Create a nearest neighbor filtering sampler.
    pub fn nearest() -> Self {
        Self {
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            ..Default::default()
        }
    }

    /// Set address mode for both coordinates.
    #[must_use]
    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode_u = mode;
        self.address_mode_v = mode;
        self
    }

    /// Converts a glTF sampler. Unspecified filters fall back to linear.
    pub(crate) fn from_gltf(sampler: &gltf_dep::texture::Sampler<'_>) -> Self {
        use gltf_dep::texture::{MagFilter, MinFilter};

        let mag_filter = match sampler.mag_filter() {
            Some(MagFilter::Nearest) => FilterMode::Nearest,
            Some(MagFilter::Linear) | None => FilterMode::Linear,
        };
        let (min_filter, mipmap_filter) = match sampler.min_filter() {
            Some(MinFilter::Nearest) => (FilterMode::Nearest, None),
            Some(MinFilter::Linear) => (FilterMode::Linear, None),
            Some(MinFilter::NearestMipmapNearest) => {
                (FilterMode::Nearest, Some(FilterMode::Nearest))
            }
            Some(MinFilter::LinearMipmapNearest) => (FilterMode::Linear, Some(FilterMode::Nearest)),
            Some(MinFilter::NearestMipmapLinear) => (FilterMode::Nearest, Some(FilterMode::Linear)),
            Some(MinFilter::LinearMipmapLinear) | None => {
                (FilterMode::Linear, Some(FilterMode::Linear))
            }
        };

        Self {
            mag_filter,
            min_filter,
            mipmap_filter,
            address_mode_u: map_wrapping(sampler.wrap_s()),
            address_mode_v: map_wrapping(sampler.wrap_t()),
        }
    }
}

fn map_wrapping(wrap: gltf_dep::texture::WrappingMode) -> AddressMode {
    match wrap {
        gltf_dep::texture::WrappingMode::ClampToEdge => AddressMode::ClampToEdge,
        gltf_dep::texture::WrappingMode::MirroredRepeat => AddressMode::MirrorRepeat,
        gltf_dep::texture::WrappingMode::Repeat => AddressMode::Repeat,
    }
}
