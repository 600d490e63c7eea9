//! Scene graph
//!
//! A [`Scene`] owns every node, texture and environment map that a frame
//! draws. Loaders build subtrees into it; the renderer walks it once per
//! frame to resolve world matrices and collect draws and lights.

mod graph;

pub use graph::{MeshNode, Node, NodeId, NodeKind, Scene, ShadowFlags};
