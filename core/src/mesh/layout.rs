//! Interleaved vertex layout description.

/// Semantic meaning of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexAttributeSemantic {
    /// Vertex position (`POSITION`).
    Position,
    /// Vertex normal (`NORMAL`).
    Normal,
    /// Tangent with handedness in `w` (`TANGENT`).
    Tangent,
    /// First texture coordinate set (`TEXCOORD_0`).
    TexCoord0,
    /// Second texture coordinate set (`TEXCOORD_1`).
    TexCoord1,
    /// Vertex color (`COLOR_0`).
    Color,
    /// Skinning joint indices (`JOINTS_0`).
    Joints,
    /// Skinning weights (`WEIGHTS_0`).
    Weights,
}

impl VertexAttributeSemantic {
    /// The glTF attribute name for this semantic.
    pub fn gltf_name(&self) -> &'static str {
        match self {
            Self::Position => "POSITION",
            Self::Normal => "NORMAL",
            Self::Tangent => "TANGENT",
            Self::TexCoord0 => "TEXCOORD_0",
            Self::TexCoord1 => "TEXCOORD_1",
            Self::Color => "COLOR_0",
            Self::Joints => "JOINTS_0",
            Self::Weights => "WEIGHTS_0",
        }
    }

    /// The format the attribute is stored as after decoding.
    ///
    /// Floating point attributes are widened to `f32` regardless of their
    /// stored component type; joints keep their integer form as `u16`.
    pub fn decoded_format(&self) -> VertexAttributeFormat {
        match self {
            Self::Position | Self::Normal => VertexAttributeFormat::Float3,
            Self::TexCoord0 | Self::TexCoord1 => VertexAttributeFormat::Float2,
            Self::Tangent | Self::Color | Self::Weights => VertexAttributeFormat::Float4,
            Self::Joints => VertexAttributeFormat::Uint16x4,
        }
    }
}

/// Storage format of one vertex attribute inside the interleaved stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeFormat {
    /// Two `f32`.
    Float2,
    /// Three `f32`.
    Float3,
    /// Four `f32`.
    Float4,
    /// Four `u16`.
    Uint16x4,
}

impl VertexAttributeFormat {
    /// Size in bytes.
    pub fn size(&self) -> usize {
        match self {
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::Uint16x4 => 8,
        }
    }

    /// Number of components.
    pub fn components(&self) -> usize {
        match self {
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 | Self::Uint16x4 => 4,
        }
    }
}

/// One attribute inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// What the attribute means.
    pub semantic: VertexAttributeSemantic,
    /// How it is stored.
    pub format: VertexAttributeFormat,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
}

/// Layout of a single interleaved vertex buffer.
///
/// Attributes are packed in the order they are added. Two layouts with the
/// same attributes in the same order compare equal, which lets primitives of
/// one asset share an `Arc<VertexLayout>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: u32,
}

impl VertexLayout {
    /// Creates an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute in its decoded format at the end of the vertex.
    #[must_use]
    pub fn with_attribute(mut self, semantic: VertexAttributeSemantic) -> Self {
        self.push(semantic);
        self
    }

    /// Appends an attribute in its decoded format at the end of the vertex.
    pub fn push(&mut self, semantic: VertexAttributeSemantic) {
        let format = semantic.decoded_format();
        self.attributes.push(VertexAttribute {
            semantic,
            format,
            offset: self.stride,
        });
        self.stride += format.size() as u32;
    }

    /// Bytes per vertex.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// All attributes in packing order.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Finds the attribute with the given semantic.
    pub fn attribute(&self, semantic: VertexAttributeSemantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.semantic == semantic)
    }

    /// Whether the layout contains the given semantic.
    pub fn has(&self, semantic: VertexAttributeSemantic) -> bool {
        self.attribute(semantic).is_some()
    }
}
