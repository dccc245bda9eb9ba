//! Scene graph construction.
//!
//! - [`SceneGraphBuilder`]: Collects node descriptions, validates the
//!   hierarchy and produces a [`SceneGraph`]
//! - [`SceneGraph`]: Flat node arena with parent/child links, depth-first
//!   instantiation order and world transforms
//! - [`NodeTransform`] / [`LocalTransform`]: TRS or matrix local transforms

mod builder;
mod types;

pub use builder::{SceneGraph, SceneGraphBuilder};
pub use types::{LocalTransform, NodeDesc, NodeTransform, SceneNode};
