//! Format-level material description, the cache key of the generator.

use std::hash::{Hash, Hasher};

use crate::sampler::Sampler;

use super::{AlphaMode, MaterialKey, ShadingModel};

/// Identifies the image a texture binding samples.
///
/// External images are identified by URI, so two assets that reference the
/// same file share bindings. Embedded images (data URIs, buffer views) are
/// scoped to the asset that owns them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageRef {
    /// Image loaded from an external URI.
    Uri(String),
    /// Image embedded in an asset.
    Embedded {
        /// Serial number of the owning asset.
        asset: u64,
        /// Index into the asset's image array.
        image: usize,
    },
}

impl ImageRef {
    pub(crate) fn from_gltf(image: &gltf_dep::Image<'_>, owner: u64) -> Self {
        match image.source() {
            gltf_dep::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
                Self::Uri(uri.to_owned())
            }
            _ => Self::Embedded {
                asset: owner,
                image: image.index(),
            },
        }
    }
}

/// Reference to a texture with sampler and UV set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureBinding {
    /// Source image.
    pub image: ImageRef,
    /// Sampling parameters.
    pub sampler: Sampler,
    /// Texture coordinate set index (0, 1, …).
    pub tex_coord: u32,
}

impl TextureBinding {
    fn from_gltf(texture: &gltf_dep::Texture<'_>, tex_coord: u32, owner: u64) -> Self {
        Self {
            image: ImageRef::from_gltf(&texture.source(), owner),
            sampler: Sampler::from_gltf(&texture.sampler()),
            tex_coord,
        }
    }
}

/// Everything that determines a [`MaterialInstance`](super::MaterialInstance).
///
/// Equality and hashing compare floats by bit pattern, so a description is a
/// usable `HashMap` key and two descriptions are interchangeable exactly when
/// every field matches.
#[derive(Debug, Clone)]
pub struct MaterialDescription {
    /// Base color factor `[r, g, b, a]`.
    pub base_color_factor: [f32; 4],
    /// Metallic factor (0.0–1.0).
    pub metallic_factor: f32,
    /// Roughness factor (0.0–1.0).
    pub roughness_factor: f32,
    /// Emissive factor `[r, g, b]`.
    pub emissive_factor: [f32; 3],
    /// Normal map scale.
    pub normal_scale: f32,
    /// Occlusion strength (0.0–1.0).
    pub occlusion_strength: f32,
    /// Alpha rendering mode.
    pub alpha_mode: AlphaMode,
    /// Whether the material is double-sided.
    pub double_sided: bool,
    /// `KHR_materials_unlit` present.
    pub unlit: bool,
    /// The primitive provides `COLOR_0`.
    pub vertex_colors: bool,
    /// Base color texture.
    pub base_color_texture: Option<TextureBinding>,
    /// Metallic-roughness texture (B=metallic, G=roughness).
    pub metallic_roughness_texture: Option<TextureBinding>,
    /// Normal map texture.
    pub normal_texture: Option<TextureBinding>,
    /// Occlusion texture.
    pub occlusion_texture: Option<TextureBinding>,
    /// Emissive texture.
    pub emissive_texture: Option<TextureBinding>,
}

impl Default for MaterialDescription {
    /// glTF defaults: white, fully metallic and rough, opaque.
    fn default() -> Self {
        Self {
            base_color_factor: [1.0; 4],
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            emissive_factor: [0.0; 3],
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
            unlit: false,
            vertex_colors: false,
            base_color_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
        }
    }
}

impl MaterialDescription {
    /// Extracts a description from a glTF material.
    ///
    /// `owner` is the serial of the asset the material belongs to; it scopes
    /// embedded images. `vertex_colors` is left `false`; the loader sets it
    /// per primitive with [`with_vertex_colors`](Self::with_vertex_colors).
    pub fn from_gltf(material: &gltf_dep::Material<'_>, owner: u64) -> Self {
        let pbr = material.pbr_metallic_roughness();
        let alpha_mode = match material.alpha_mode() {
            gltf_dep::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf_dep::material::AlphaMode::Mask => AlphaMode::Mask {
                cutoff: material.alpha_cutoff().unwrap_or(0.5),
            },
            gltf_dep::material::AlphaMode::Blend => AlphaMode::Blend,
        };

        Self {
            base_color_factor: pbr.base_color_factor(),
            metallic_factor: pbr.metallic_factor(),
            roughness_factor: pbr.roughness_factor(),
            emissive_factor: material.emissive_factor(),
            normal_scale: material.normal_texture().map_or(1.0, |t| t.scale()),
            occlusion_strength: material.occlusion_texture().map_or(1.0, |t| t.strength()),
            alpha_mode,
            double_sided: material.double_sided(),
            unlit: material.unlit(),
            vertex_colors: false,
            base_color_texture: pbr
                .base_color_texture()
                .map(|t| TextureBinding::from_gltf(&t.texture(), t.tex_coord(), owner)),
            metallic_roughness_texture: pbr
                .metallic_roughness_texture()
                .map(|t| TextureBinding::from_gltf(&t.texture(), t.tex_coord(), owner)),
            normal_texture: material
                .normal_texture()
                .map(|t| TextureBinding::from_gltf(&t.texture(), t.tex_coord(), owner)),
            occlusion_texture: material
                .occlusion_texture()
                .map(|t| TextureBinding::from_gltf(&t.texture(), t.tex_coord(), owner)),
            emissive_texture: material
                .emissive_texture()
                .map(|t| TextureBinding::from_gltf(&t.texture(), t.tex_coord(), owner)),
        }
    }

    /// Set whether vertex colors modulate the base color.
    #[must_use]
    pub fn with_vertex_colors(mut self, vertex_colors: bool) -> Self {
        self.vertex_colors = vertex_colors;
        self
    }

    /// The shader variant this description needs.
    pub fn key(&self) -> MaterialKey {
        let uv = |t: &Option<TextureBinding>| t.as_ref().map(|t| t.tex_coord);
        MaterialKey {
            shading: if self.unlit {
                ShadingModel::Unlit
            } else {
                ShadingModel::Lit
            },
            alpha_mode: self.alpha_mode.kind(),
            double_sided: self.double_sided,
            vertex_colors: self.vertex_colors,
            base_color_uv: uv(&self.base_color_texture),
            metallic_roughness_uv: uv(&self.metallic_roughness_texture),
            normal_uv: uv(&self.normal_texture),
            occlusion_uv: uv(&self.occlusion_texture),
            emissive_uv: uv(&self.emissive_texture),
        }
    }

    /// Texture bound to a material slot name such as `"normal_texture"`.
    pub fn texture(&self, slot: &str) -> Option<&TextureBinding> {
        match slot {
            "base_color_texture" => self.base_color_texture.as_ref(),
            "metallic_roughness_texture" => self.metallic_roughness_texture.as_ref(),
            "normal_texture" => self.normal_texture.as_ref(),
            "occlusion_texture" => self.occlusion_texture.as_ref(),
            "emissive_texture" => self.emissive_texture.as_ref(),
            _ => None,
        }
    }

    /// Every texture binding present, in slot order.
    pub fn textures(&self) -> impl Iterator<Item = &TextureBinding> {
        [
            &self.base_color_texture,
            &self.metallic_roughness_texture,
            &self.normal_texture,
            &self.occlusion_texture,
            &self.emissive_texture,
        ]
        .into_iter()
        .flatten()
    }

    fn float_bits(&self) -> [u32; 11] {
        let [r, g, b, a] = self.base_color_factor;
        let [er, eg, eb] = self.emissive_factor;
        [
            r,
            g,
            b,
            a,
            self.metallic_factor,
            self.roughness_factor,
            er,
            eg,
            eb,
            self.normal_scale,
            self.occlusion_strength,
        ]
        .map(f32::to_bits)
    }

    fn texture_slots(&self) -> [&Option<TextureBinding>; 5] {
        [
            &self.base_color_texture,
            &self.metallic_roughness_texture,
            &self.normal_texture,
            &self.occlusion_texture,
            &self.emissive_texture,
        ]
    }
}

impl PartialEq for MaterialDescription {
    fn eq(&self, other: &Self) -> bool {
        self.float_bits() == other.float_bits()
            && self.alpha_mode == other.alpha_mode
            && self.double_sided == other.double_sided
            && self.unlit == other.unlit
            && self.vertex_colors == other.vertex_colors
            && self.texture_slots() == other.texture_slots()
    }
}

impl Eq for MaterialDescription {}

impl Hash for MaterialDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.float_bits().hash(state);
        self.alpha_mode.hash(state);
        self.double_sided.hash(state);
        self.unlit.hash(state);
        self.vertex_colors.hash(state);
        self.texture_slots().hash(state);
    }
}
