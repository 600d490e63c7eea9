//! Arena-backed scene graph
//!
//! Nodes live in a [`SlotMap`] and refer to each other by [`NodeId`], so
//! loaders can hand out ids to subtrees before they are attached and stale
//! ids resolve to `None` instead of dangling.

use std::sync::Arc;

use bitflags::bitflags;
use slotmap::SlotMap;

use crate::foundation::math::{utils, Mat4, Transform, Vec3};
use crate::render::{
    environment::EnvironmentMap, helpers::CameraHelper, light::DirectionalLight, material::StandardMaterial,
    mesh::Geometry, texture::TextureStore,
};

slotmap::new_key_type! {
    /// Handle to a node inside a [`Scene`]
    pub struct NodeId;
}

bitflags! {
    /// Shadow participation of a mesh
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShadowFlags: u8 {
        /// Mesh is drawn into shadow maps
        const CAST = 1 << 0;
        /// Mesh samples shadow maps when shaded
        const RECEIVE = 1 << 1;
    }
}

/// Drawable surface: shared geometry plus a material
#[derive(Debug, Clone)]
pub struct MeshNode {
    /// Geometry, shared between instances
    pub geometry: Arc<Geometry>,
    /// Surface material
    pub material: StandardMaterial,
    /// Shadow participation
    pub shadow: ShadowFlags,
}

impl MeshNode {
    /// Mesh that neither casts nor receives shadows
    pub fn new(geometry: Arc<Geometry>, material: StandardMaterial) -> Self {
        Self {
            geometry,
            material,
            shadow: ShadowFlags::empty(),
        }
    }
}

/// What a node contributes to the frame
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Pure transform
    Group,
    /// Drawable mesh
    Mesh(MeshNode),
    /// Directional light; its position is the node transform
    DirectionalLight(Box<DirectionalLight>),
    /// Shadow frustum outline
    CameraHelper(CameraHelper),
}

/// One entry of the scene graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Label, from the source asset when loaded
    pub name: String,
    /// Transform relative to the parent
    pub transform: Transform,
    /// Node payload
    pub kind: NodeKind,
    /// Hidden nodes and their subtrees are skipped when rendering
    pub visible: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    world_matrix: Mat4,
}

impl Node {
    /// Node with identity transform and no parent
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::identity(),
            kind,
            visible: true,
            parent: None,
            children: Vec::new(),
            world_matrix: Mat4::identity(),
        }
    }

    /// Empty group
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    /// Mesh node
    pub fn mesh(name: impl Into<String>, mesh: MeshNode) -> Self {
        Self::new(name, NodeKind::Mesh(mesh))
    }

    /// Directional light node
    pub fn directional_light(name: impl Into<String>, light: DirectionalLight) -> Self {
        Self::new(name, NodeKind::DirectionalLight(Box::new(light)))
    }

    /// Replace the local transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the local position
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    /// Parent node, `None` for the root and detached nodes
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// World matrix as of the last [`Scene::update_world_matrices`]
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// Mesh payload, if this is a mesh
    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Mutable mesh payload, if this is a mesh
    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Light payload, if this is a directional light
    pub fn as_light(&self) -> Option<&DirectionalLight> {
        match &self.kind {
            NodeKind::DirectionalLight(light) => Some(&**light),
            _ => None,
        }
    }

    /// Mutable light payload, if this is a directional light
    pub fn as_light_mut(&mut self) -> Option<&mut DirectionalLight> {
        match &mut self.kind {
            NodeKind::DirectionalLight(light) => Some(&mut **light),
            _ => None,
        }
    }
}

/// Root container for everything rendered
#[derive(Debug)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    /// Backdrop drawn behind geometry
    pub background: Option<Arc<EnvironmentMap>>,
    /// Source of ambient image-based lighting
    pub environment: Option<Arc<EnvironmentMap>>,
    /// Scale on the ambient environment contribution
    pub environment_intensity: f32,
    /// Textures referenced by materials in this scene
    pub textures: TextureStore,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Empty scene holding only the root group
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::group("Scene"));
        Self {
            nodes,
            root,
            background: None,
            environment: None,
            environment_intensity: 1.0,
            textures: TextureStore::new(),
        }
    }

    /// The root group
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether only the root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Attach a node under the root
    pub fn add(&mut self, node: Node) -> NodeId {
        self.add_child(self.root, node)
    }

    /// Attach a node under `parent`; an unknown parent falls back to the root
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        let parent = if self.nodes.contains_key(parent) {
            parent
        } else {
            log::warn!("Parent of '{}' no longer exists, attaching to scene root", node.name);
            self.root
        };
        node.parent = Some(parent);
        node.children.clear();
        let id = self.nodes.insert(node);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(id);
        }
        id
    }

    /// Detach and drop a node with its whole subtree; the root cannot be removed
    pub fn remove(&mut self, id: NodeId) -> bool {
        if id == self.root || !self.nodes.contains_key(id) {
            return false;
        }
        let subtree = self.descendants(id);
        if let Some(parent) = self.nodes.get(id).and_then(Node::parent) {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|&child| child != id);
            }
        }
        for node in subtree {
            self.nodes.remove(node);
        }
        true
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node mutably
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// First node with the given name, in traversal order
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| self.nodes.get(id).is_some_and(|n| n.name == name))
    }

    /// `start` and every node below it, depth-first pre-order
    pub fn descendants(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// Visit `start` and its descendants, depth-first pre-order
    pub fn traverse(&self, start: NodeId, mut visit: impl FnMut(NodeId, &Node)) {
        for id in self.descendants(start) {
            if let Some(node) = self.nodes.get(id) {
                visit(id, node);
            }
        }
    }

    /// Mutable visit of `start` and its descendants
    ///
    /// The set of visited nodes is fixed before the first callback.
    pub fn traverse_mut(&mut self, start: NodeId, mut visit: impl FnMut(NodeId, &mut Node)) {
        for id in self.descendants(start) {
            if let Some(node) = self.nodes.get_mut(id) {
                visit(id, node);
            }
        }
    }

    /// Recompute every world matrix from local transforms
    pub fn update_world_matrices(&mut self) {
        let mut stack = vec![(self.root, Mat4::identity())];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            node.world_matrix = parent_world * node.transform.to_matrix();
            let world = node.world_matrix;
            stack.extend(node.children.iter().map(|&child| (child, world)));
        }
    }

    /// World position as of the last matrix update
    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.nodes.get(id).map(|n| utils::translation_of(&n.world_matrix))
    }

    /// Directional light stored at `id`
    pub fn light(&self, id: NodeId) -> Option<&DirectionalLight> {
        self.nodes.get(id)?.as_light()
    }

    /// Mutable directional light stored at `id`
    pub fn light_mut(&mut self, id: NodeId) -> Option<&mut DirectionalLight> {
        self.nodes.get_mut(id)?.as_light_mut()
    }

    /// Number of mesh nodes below `start`
    pub fn mesh_count(&self, start: NodeId) -> usize {
        let mut count = 0;
        self.traverse(start, |_, node| {
            if node.as_mesh().is_some() {
                count += 1;
            }
        });
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quad() -> MeshNode {
        MeshNode::new(Arc::new(Geometry::plane(1.0, 1.0)), StandardMaterial::new())
    }

    #[test]
    fn test_world_matrices_compose() {
        let mut scene = Scene::new();
        let mut parent_transform = Transform::from_position(Vec3::new(5.0, 1.0, 0.0));
        parent_transform.set_uniform_scale(0.5);
        let parent = scene.add(Node::group("parent").with_transform(parent_transform));
        let child = scene.add_child(parent, Node::mesh("child", quad()).with_position(Vec3::new(2.0, 0.0, 0.0)));

        assert_relative_eq!(scene.world_position(child).unwrap(), Vec3::zeros());
        scene.update_world_matrices();
        assert_relative_eq!(scene.world_position(child).unwrap(), Vec3::new(6.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_traversal_is_preorder() {
        let mut scene = Scene::new();
        let a = scene.add(Node::group("a"));
        let b = scene.add_child(a, Node::group("b"));
        let c = scene.add(Node::group("c"));

        let order = scene.descendants(scene.root());
        assert_eq!(order, vec![scene.root(), a, b, c]);
        assert_eq!(scene.find_by_name("b"), Some(b));
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut scene = Scene::new();
        let a = scene.add(Node::group("a"));
        let b = scene.add_child(a, Node::mesh("b", quad()));

        assert!(scene.remove(a));
        assert!(scene.node(a).is_none());
        assert!(scene.node(b).is_none());
        assert!(scene.is_empty());
        assert!(!scene.remove(scene.root()));
    }

    #[test]
    fn test_unknown_parent_falls_back_to_root() {
        let mut scene = Scene::new();
        let a = scene.add(Node::group("a"));
        scene.remove(a);
        let orphan = scene.add_child(a, Node::group("orphan"));
        assert_eq!(scene.node(orphan).unwrap().parent(), Some(scene.root()));
    }

    #[test]
    fn test_mesh_count_and_flags() {
        let mut scene = Scene::new();
        let group = scene.add(Node::group("model"));
        scene.add_child(group, Node::mesh("m1", quad()));
        scene.add_child(group, Node::mesh("m2", quad()));
        assert_eq!(scene.mesh_count(group), 2);

        scene.traverse_mut(group, |_, node| {
            if let Some(mesh) = node.as_mesh_mut() {
                mesh.shadow = ShadowFlags::CAST | ShadowFlags::RECEIVE;
            }
        });
        scene.traverse(group, |_, node| {
            if let Some(mesh) = node.as_mesh() {
                assert!(mesh.shadow.is_all());
            }
        });
    }
}
