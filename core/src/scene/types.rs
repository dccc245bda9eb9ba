//! Scene graph node types.
//!
//! Transforms are authored as plain arrays (`[f32; 3]`, `[f32; 4]`) and
//! converted to `nalgebra` matrices for composition.

use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3};

/// Node transform decomposed into translation, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    /// Translation [x, y, z].
    pub translation: [f32; 3],
    /// Rotation quaternion [x, y, z, w].
    pub rotation: [f32; 4],
    /// Scale [x, y, z].
    pub scale: [f32; 3],
}

impl NodeTransform {
    /// Identity transform: no translation, identity rotation, unit scale.
    pub const IDENTITY: Self = Self {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    /// Returns this transform with a different translation.
    #[must_use]
    pub const fn with_translation(mut self, translation: [f32; 3]) -> Self {
        self.translation = translation;
        self
    }

    /// Returns this transform with a different rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: [f32; 4]) -> Self {
        self.rotation = rotation;
        self
    }

    /// Returns this transform with a different scale.
    #[must_use]
    pub const fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }

    /// Whether the rotation quaternion has unit length (within 1e-3).
    pub fn has_unit_rotation(&self) -> bool {
        let [x, y, z, w] = self.rotation;
        ((x * x + y * y + z * z + w * w).sqrt() - 1.0).abs() < 1e-3
    }

    /// Composes `T * R * S`. The rotation is normalized first.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        let [x, y, z, w] = self.rotation;
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(w, x, y, z));
        Matrix4::new_translation(&Vector3::from(self.translation))
            * rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&Vector3::from(self.scale))
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A node's transform relative to its parent, as authored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalTransform {
    /// Translation, rotation, scale.
    Trs(NodeTransform),
    /// Full column-major matrix.
    Matrix(Matrix4<f32>),
}

impl LocalTransform {
    /// The transform as a matrix.
    pub fn matrix(&self) -> Matrix4<f32> {
        match self {
            Self::Trs(trs) => trs.to_matrix(),
            Self::Matrix(m) => *m,
        }
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::Trs(NodeTransform::IDENTITY)
    }
}

/// Input to [`SceneGraphBuilder::add_node`](super::SceneGraphBuilder::add_node).
#[derive(Debug, Clone, Default)]
pub struct NodeDesc {
    /// Node name, if any.
    pub name: Option<String>,
    /// Local transform.
    pub transform: LocalTransform,
    /// Mesh index, if the node carries one.
    pub mesh: Option<usize>,
    /// Child node indices in declaration order.
    pub children: Vec<usize>,
}

impl NodeDesc {
    /// Creates a node with identity transform, no mesh and no children.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the node name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a TRS local transform.
    #[must_use]
    pub fn with_transform(mut self, transform: NodeTransform) -> Self {
        self.transform = LocalTransform::Trs(transform);
        self
    }

    /// Set a matrix local transform.
    #[must_use]
    pub fn with_matrix(mut self, matrix: Matrix4<f32>) -> Self {
        self.transform = LocalTransform::Matrix(matrix);
        self
    }

    /// Set the mesh index.
    #[must_use]
    pub fn with_mesh(mut self, mesh: usize) -> Self {
        self.mesh = Some(mesh);
        self
    }

    /// Set the child node indices.
    #[must_use]
    pub fn with_children(mut self, children: Vec<usize>) -> Self {
        self.children = children;
        self
    }
}

/// A node of a built [`SceneGraph`](super::SceneGraph).
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Node name, if any.
    pub name: Option<String>,
    /// Local transform relative to `parent`.
    pub local: LocalTransform,
    /// Parent-to-world composed transform.
    pub world: Matrix4<f32>,
    /// Mesh index, if the node carries one.
    pub mesh: Option<usize>,
    /// Parent node, `None` for top-level nodes.
    pub parent: Option<usize>,
    /// Children in declaration order.
    pub children: Vec<usize>,
}
