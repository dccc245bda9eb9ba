use nalgebra::Matrix4;

use crate::error::AssetError;

use super::types::{NodeDesc, SceneNode};

/// Collects node descriptions and turns them into a validated [`SceneGraph`].
///
/// Node indices are assigned in insertion order, so a loader adds nodes in
/// the order its source format declares them and child indices keep their
/// meaning.
///
/// # Example
///
/// ```
/// use redlilium_gltfio::scene::{NodeDesc, SceneGraphBuilder};
///
/// let mut builder = SceneGraphBuilder::new(3);
/// builder.add_node(NodeDesc::new().with_name("root").with_children(vec![1, 2]));
/// builder.add_node(NodeDesc::new().with_name("left"));
/// builder.add_node(NodeDesc::new().with_name("right"));
///
/// let roots = builder.find_roots();
/// let graph = builder.build(&roots).unwrap();
/// assert_eq!(graph.depth_first(), &[0, 1, 2]);
/// assert_eq!(graph.parent(2), Some(0));
/// ```
#[derive(Debug, Default)]
pub struct SceneGraphBuilder {
    nodes: Vec<NodeDesc>,
}

impl SceneGraphBuilder {
    /// Creates a builder with room for `node_count` nodes.
    pub fn new(node_count: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(node_count),
        }
    }

    /// Adds a node and returns its index.
    pub fn add_node(&mut self, node: NodeDesc) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Number of nodes added so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes have been added.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes that are nobody's child, in index order.
    ///
    /// Out-of-range child indices are ignored here; [`build`](Self::build)
    /// reports them.
    pub fn find_roots(&self) -> Vec<usize> {
        let mut is_child = vec![false; self.nodes.len()];
        for node in &self.nodes {
            for &child in &node.children {
                if let Some(flag) = is_child.get_mut(child) {
                    *flag = true;
                }
            }
        }
        (0..self.nodes.len()).filter(|&i| !is_child[i]).collect()
    }

    /// Validates the hierarchy and builds the graph.
    ///
    /// `roots` are the nodes to instantiate; duplicates are ignored. Fails
    /// with [`AssetError::UnresolvedReference`] if a child or root index is
    /// out of range, a node has more than one parent, the hierarchy contains
    /// a cycle, or a root is itself somebody's child.
    pub fn build(self, roots: &[usize]) -> Result<SceneGraph, AssetError> {
        let count = self.nodes.len();
        let parents = self.link_parents()?;

        // Every node must hang off a parentless node; anything left over sits
        // on a cycle or below one.
        let mut world = vec![None::<Matrix4<f32>>; count];
        let mut stack: Vec<usize> = (0..count).filter(|&i| parents[i].is_none()).collect();
        while let Some(index) = stack.pop() {
            let local = self.nodes[index].transform.matrix();
            let parent_world = parents[index].and_then(|p| world[p]);
            world[index] = Some(match parent_world {
                Some(parent) => parent * local,
                None => local,
            });
            stack.extend(self.nodes[index].children.iter().copied());
        }
        if let Some(index) = world.iter().position(Option::is_none) {
            return Err(AssetError::unresolved(format!(
                "node hierarchy contains a cycle through node {index}"
            )));
        }

        let mut unique_roots = Vec::with_capacity(roots.len());
        for &root in roots {
            if root >= count {
                return Err(AssetError::unresolved(format!(
                    "scene root {root} out of range ({count} nodes)"
                )));
            }
            if let Some(parent) = parents[root] {
                return Err(AssetError::unresolved(format!(
                    "scene root {root} is a child of node {parent}"
                )));
            }
            if unique_roots.contains(&root) {
                log::warn!("scene root {root} listed more than once");
                continue;
            }
            unique_roots.push(root);
        }

        let mut order = Vec::new();
        let mut stack: Vec<usize> = unique_roots.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.nodes[index].children.iter().rev().copied());
        }

        let nodes = self
            .nodes
            .into_iter()
            .zip(parents)
            .zip(world)
            .map(|((desc, parent), world)| SceneNode {
                name: desc.name,
                local: desc.transform,
                world: world.unwrap_or_else(Matrix4::identity),
                mesh: desc.mesh,
                parent,
                children: desc.children,
            })
            .collect();

        Ok(SceneGraph {
            nodes,
            roots: unique_roots,
            order,
        })
    }

    fn link_parents(&self) -> Result<Vec<Option<usize>>, AssetError> {
        let count = self.nodes.len();
        let mut parents = vec![None; count];
        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                if child >= count {
                    return Err(AssetError::unresolved(format!(
                        "node {index} references child {child} out of range ({count} nodes)"
                    )));
                }
                if child == index {
                    return Err(AssetError::unresolved(format!(
                        "node {index} lists itself as a child"
                    )));
                }
                if let Some(previous) = parents[child] {
                    return Err(AssetError::unresolved(format!(
                        "node {child} has multiple parents ({previous} and {index})"
                    )));
                }
                parents[child] = Some(index);
            }
        }
        Ok(parents)
    }
}

/// A validated node hierarchy.
///
/// Holds every node of the source, not only the instantiated ones;
/// [`depth_first`](Self::depth_first) lists the nodes reachable from the
/// chosen roots.
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    roots: Vec<usize>,
    order: Vec<usize>,
}

impl SceneGraph {
    /// All nodes, indexed as added to the builder.
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// A single node.
    pub fn node(&self, index: usize) -> Option<&SceneNode> {
        self.nodes.get(index)
    }

    /// Instantiated roots in scene order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Parent of a node, `None` for top-level or unknown nodes.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes.get(index)?.parent
    }

    /// Children of a node in declaration order.
    pub fn children(&self, index: usize) -> &[usize] {
        self.nodes
            .get(index)
            .map_or(&[], |node| node.children.as_slice())
    }

    /// Instantiated nodes in depth-first pre-order, children in declaration
    /// order.
    pub fn depth_first(&self) -> &[usize] {
        &self.order
    }

    /// World transform of a node.
    pub fn world_transform(&self, index: usize) -> Option<Matrix4<f32>> {
        self.nodes.get(index).map(|node| node.world)
    }
}
