//! Material declarations, instances and the generator that deduplicates them.
//!
//! Materials are split into two types:
//!
//! - [`Material`]: **Declaration** of a shader variant: pipeline state and
//!   binding layout, identified by a [`MaterialKey`]. Shared via `Arc` across
//!   every instance that uses the same variant.
//! - [`MaterialInstance`]: **Bindings** holding the values of one
//!   [`MaterialDescription`], indexed to match the parent material's
//!   binding definitions.
//!
//! [`MaterialGenerator`] owns both caches. Two equal descriptions always
//! produce the same `Arc<MaterialInstance>`.

mod description;
mod generator;

use std::hash::{Hash, Hasher};
use std::sync::Arc;

pub use description::{ImageRef, MaterialDescription, TextureBinding};
pub use generator::MaterialGenerator;

/// Type of value expected in a material binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialValueType {
    /// Single f32 value.
    Float,
    /// 3-component float vector.
    Vec3,
    /// 4-component float vector.
    Vec4,
    /// Texture reference.
    Texture,
}

/// Describes one binding slot in a [`Material`].
///
/// Each slot has a human-readable name, an expected value type, and a GPU
/// binding index. All scalar/vector uniforms are packed into binding 0,
/// while texture slots each get their own binding index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialBindingDef {
    /// Human-readable name (e.g., "base_color", "metallic_roughness_texture").
    pub name: &'static str,
    /// Expected value type for this slot.
    pub value_type: MaterialValueType,
    /// GPU binding slot index this maps to.
    pub binding: u32,
}

/// A typed material property value.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialValue {
    /// Single float (metallic, roughness, normal scale, occlusion strength).
    Float(f32),
    /// 3-component vector (emissive factor).
    Vec3([f32; 3]),
    /// 4-component vector (base color factor).
    Vec4([f32; 4]),
    /// Texture binding.
    Texture(TextureBinding),
}

/// Alpha rendering mode.
///
/// Affects pipeline state (blend configuration), not shader bindings.
/// Equality and hashing compare the cutoff by bit pattern.
#[derive(Debug, Clone, Copy, Default)]
pub enum AlphaMode {
    /// Fully opaque (alpha ignored).
    #[default]
    Opaque,
    /// Alpha masking with cutoff threshold.
    Mask {
        /// Cutoff value (0.0–1.0). Fragments with alpha below this are discarded.
        cutoff: f32,
    },
    /// Full alpha blending.
    Blend,
}

impl AlphaMode {
    /// The mode with its cutoff stripped, as used in shader variant keys.
    pub fn kind(&self) -> AlphaModeKind {
        match self {
            Self::Opaque => AlphaModeKind::Opaque,
            Self::Mask { .. } => AlphaModeKind::Mask,
            Self::Blend => AlphaModeKind::Blend,
        }
    }
}

impl PartialEq for AlphaMode {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Mask { cutoff: a }, Self::Mask { cutoff: b }) => a.to_bits() == b.to_bits(),
            _ => self.kind() == other.kind(),
        }
    }
}

impl Eq for AlphaMode {}

impl Hash for AlphaMode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        if let Self::Mask { cutoff } = self {
            cutoff.to_bits().hash(state);
        }
    }
}

/// [`AlphaMode`] without its cutoff value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaModeKind {
    /// Fully opaque.
    #[default]
    Opaque,
    /// Alpha tested.
    Mask,
    /// Alpha blended.
    Blend,
}

/// Lighting model of a shader variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShadingModel {
    /// PBR metallic-roughness.
    #[default]
    Lit,
    /// `KHR_materials_unlit`: base color only.
    Unlit,
}

/// Identifies a shader variant.
///
/// Every field changes either the generated shader or the pipeline state.
/// Texture slots store the UV set they sample from, `None` when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaterialKey {
    /// Lighting model.
    pub shading: ShadingModel,
    /// Blend configuration.
    pub alpha_mode: AlphaModeKind,
    /// Backface culling disabled.
    pub double_sided: bool,
    /// Multiply base color by `COLOR_0`.
    pub vertex_colors: bool,
    /// UV set of the base color texture.
    pub base_color_uv: Option<u32>,
    /// UV set of the metallic-roughness texture.
    pub metallic_roughness_uv: Option<u32>,
    /// UV set of the normal texture.
    pub normal_uv: Option<u32>,
    /// UV set of the occlusion texture.
    pub occlusion_uv: Option<u32>,
    /// UV set of the emissive texture.
    pub emissive_uv: Option<u32>,
}

/// Material declaration: the binding layout of one shader variant.
///
/// Shared via `Arc`. Two [`MaterialInstance`]s with the same `Material` use
/// the same shader variant and pipeline state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Material {
    /// Variant this declaration was built for.
    pub key: MaterialKey,
    /// Binding slot definitions, ordered list of expected properties.
    pub bindings: Vec<MaterialBindingDef>,
}

impl Material {
    /// Builds the binding layout for a shader variant.
    ///
    /// Uniform properties always map to binding 0. Texture bindings are
    /// assigned incrementally starting from binding 1.
    ///
    /// # Binding slot order (lit)
    ///
    /// | Index | Name | Type | Binding |
    /// |-------|------|------|---------|
    /// | 0 | `base_color` | Vec4 | 0 |
    /// | 1 | `metallic` | Float | 0 |
    /// | 2 | `roughness` | Float | 0 |
    /// | 3 | `emissive` | Vec3 | 0 |
    /// | 4 | `normal_scale` | Float | 0 |
    /// | 5 | `occlusion_strength` | Float | 0 |
    /// | (6) | `alpha_cutoff` | Float | 0 |
    /// | 6+ | texture slots | Texture | 1+ |
    ///
    /// Unlit variants only carry `base_color`, the optional cutoff and the
    /// base color texture.
    pub fn from_key(key: &MaterialKey) -> Self {
        use MaterialValueType::*;

        let uniform = |name, value_type| MaterialBindingDef {
            name,
            value_type,
            binding: 0,
        };

        let mut bindings = vec![uniform("base_color", Vec4)];
        if key.shading == ShadingModel::Lit {
            bindings.extend([
                uniform("metallic", Float),
                uniform("roughness", Float),
                uniform("emissive", Vec3),
                uniform("normal_scale", Float),
                uniform("occlusion_strength", Float),
            ]);
        }
        if key.alpha_mode == AlphaModeKind::Mask {
            bindings.push(uniform("alpha_cutoff", Float));
        }

        let mut textures = vec![(key.base_color_uv, "base_color_texture")];
        if key.shading == ShadingModel::Lit {
            textures.extend([
                (key.metallic_roughness_uv, "metallic_roughness_texture"),
                (key.normal_uv, "normal_texture"),
                (key.occlusion_uv, "occlusion_texture"),
                (key.emissive_uv, "emissive_texture"),
            ]);
        }

        let mut next_binding = 1u32;
        for (uv, name) in textures {
            if uv.is_some() {
                bindings.push(MaterialBindingDef {
                    name,
                    value_type: Texture,
                    binding: next_binding,
                });
                next_binding += 1;
            }
        }

        Self {
            key: *key,
            bindings,
        }
    }

    /// Find a binding definition by name.
    pub fn find_binding(&self, name: &str) -> Option<(usize, &MaterialBindingDef)> {
        self.bindings
            .iter()
            .enumerate()
            .find(|(_, b)| b.name == name)
    }
}

/// Material instance holding actual binding values.
///
/// `values[i]` corresponds to `material.bindings[i]`.
#[derive(Debug)]
pub struct MaterialInstance {
    /// The material declaration (pipeline state + binding layout).
    pub material: Arc<Material>,
    /// The description this instance was generated from.
    pub description: MaterialDescription,
    /// Values for each binding slot, indexed to match `material.bindings`.
    pub values: Vec<MaterialValue>,
}

impl MaterialInstance {
    /// Fills every binding slot of `material` from `description`.
    pub(crate) fn new(material: Arc<Material>, description: MaterialDescription) -> Self {
        let d = &description;
        let values = material
            .bindings
            .iter()
            .map(|binding| match binding.name {
                "base_color" => MaterialValue::Vec4(d.base_color_factor),
                "metallic" => MaterialValue::Float(d.metallic_factor),
                "roughness" => MaterialValue::Float(d.roughness_factor),
                "emissive" => MaterialValue::Vec3(d.emissive_factor),
                "normal_scale" => MaterialValue::Float(d.normal_scale),
                "occlusion_strength" => MaterialValue::Float(d.occlusion_strength),
                "alpha_cutoff" => MaterialValue::Float(match d.alpha_mode {
                    AlphaMode::Mask { cutoff } => cutoff,
                    _ => 0.5,
                }),
                name => d
                    .texture(name)
                    .cloned()
                    .map(MaterialValue::Texture)
                    .unwrap_or(MaterialValue::Float(0.0)),
            })
            .collect();
        Self {
            material,
            description,
            values,
        }
    }

    /// Get a value by binding name.
    pub fn get(&self, name: &str) -> Option<&MaterialValue> {
        let (idx, _) = self.material.find_binding(name)?;
        self.values.get(idx)
    }

    /// Get a float value by binding name.
    pub fn get_float(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            MaterialValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Get a vec3 value by binding name.
    pub fn get_vec3(&self, name: &str) -> Option<[f32; 3]> {
        match self.get(name)? {
            MaterialValue::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    /// Get a vec4 value by binding name.
    pub fn get_vec4(&self, name: &str) -> Option<[f32; 4]> {
        match self.get(name)? {
            MaterialValue::Vec4(v) => Some(*v),
            _ => None,
        }
    }

    /// Get a texture binding by name.
    pub fn get_texture(&self, name: &str) -> Option<&TextureBinding> {
        match self.get(name)? {
            MaterialValue::Texture(t) => Some(t),
            _ => None,
        }
    }

    /// Iterator over all texture values in this instance.
    pub fn textures(&self) -> impl Iterator<Item = &TextureBinding> {
        self.values.iter().filter_map(|v| match v {
            MaterialValue::Texture(t) => Some(t),
            _ => None,
        })
    }
}
