use std::rc::Rc;

use cgmath::SquareMatrix;

use crate::material::MaterialHandle;
use crate::math::{Mat4, Quat, identity_quat};
use crate::mesh::{GpuMeshId, MeshData};
use crate::transform::Transform;
use crate::{Result, SceneError};

/// Generational handle into a [`SceneGraph`]. A handle outlives its node safely: once the slot is
/// reused the old handle stops resolving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshRole {
    Model,
    BoneMarker,
    BoneConnector,
    Ruler,
    Particles,
}

#[derive(Clone, Debug)]
pub struct Skin {
    pub joints: Vec<NodeId>,
    pub inverse_bind: Vec<Mat4>,
}

#[derive(Clone, Debug)]
pub struct MeshNode {
    pub mesh: Rc<MeshData>,
    pub materials: Vec<MaterialHandle>,
    pub gpu: Option<GpuMeshId>,
    pub skin: Option<Skin>,
    pub role: MeshRole,
}

impl MeshNode {
    pub fn new(mesh: Rc<MeshData>, materials: Vec<MaterialHandle>, role: MeshRole) -> Self {
        Self {
            mesh,
            materials,
            gpu: None,
            skin: None,
            role,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Ambient,
    /// Shines along the node's local -Z axis.
    Directional,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Clone, Debug)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
    Light(Light),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub local: Transform,
    pub visible: bool,
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            local: Transform::IDENTITY,
            visible: true,
            kind,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn with_transform(mut self, local: Transform) -> Self {
        self.local = local;
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    root: NodeId,
    live: usize,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let root = NodeId {
            index: 0,
            generation: 0,
        };
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node::group("scene")),
            }],
            free: Vec::new(),
            root,
            live: 1,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live <= 1
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId> {
        if !self.contains(parent) {
            return Err(SceneError::StaleNode(parent));
        }
        node.parent = Some(parent);
        node.children.clear();
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };
        if let Some(parent) = self.get_mut(parent) {
            parent.children.push(id);
        }
        self.live += 1;
        Ok(id)
    }

    /// Detaches `id` from its parent and removes its whole subtree, returning the removed nodes
    /// parent-first so the caller can release whatever they own.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<(NodeId, Node)>> {
        if id == self.root {
            return Err(SceneError::RootRemoval);
        }
        let parent = self.get(id).ok_or(SceneError::StaleNode(id))?.parent;
        if let Some(parent) = parent.and_then(|parent| self.get_mut(parent)) {
            parent.children.retain(|child| *child != id);
        }
        let mut removed = Vec::new();
        for node_id in self.descendants(id) {
            let slot = &mut self.slots[node_id.index as usize];
            if let Some(node) = slot.node.take() {
                self.free.push(node_id.index);
                self.live -= 1;
                removed.push((node_id, node));
            }
        }
        tracing::trace!(count = removed.len(), "removed scene subtree");
        Ok(removed)
    }

    /// `id` and everything below it, parent-first. Empty when `id` is stale.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(node) = self.get(current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    pub fn find_by_name(&self, start: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(start)
            .into_iter()
            .find(|id| self.get(*id).is_some_and(|node| node.name == name))
    }

    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        self.relative_matrix(id, None)
    }

    /// Transform of `id` expressed in the space of `ancestor` (exclusive). Falls back to world
    /// space when `ancestor` is `None` or not on the parent chain.
    pub fn relative_matrix(&self, id: NodeId, ancestor: Option<NodeId>) -> Option<Mat4> {
        let mut node = self.get(id)?;
        let mut matrix = node.local.matrix();
        while let Some(parent_id) = node.parent {
            if Some(parent_id) == ancestor {
                break;
            }
            node = self.get(parent_id)?;
            matrix = node.local.matrix() * matrix;
        }
        Some(matrix)
    }

    /// Accumulated rotation of `id` relative to `ancestor`, ignoring scale and translation.
    pub fn relative_rotation(&self, id: NodeId, ancestor: Option<NodeId>) -> Option<Quat> {
        let mut node = self.get(id)?;
        let mut rotation = node.local.rotation;
        while let Some(parent_id) = node.parent {
            if Some(parent_id) == ancestor {
                break;
            }
            node = self.get(parent_id)?;
            rotation = node.local.rotation * rotation;
        }
        Some(rotation)
    }

    /// Depth-first walk over visible nodes with their world matrices.
    pub fn walk_visible(&self, mut visit: impl FnMut(NodeId, &Node, &Mat4)) {
        let mut stack = vec![(self.root, Mat4::identity())];
        while let Some((id, parent_world)) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let world = parent_world * node.local.matrix();
            visit(id, node, &world);
            stack.extend(node.children.iter().rev().map(|child| (*child, world)));
        }
    }

    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.get(id).and_then(|node| node.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.get(parent).and_then(|node| node.parent);
        }
        false
    }

    pub fn rotation_or_identity(&self, id: Option<NodeId>, ancestor: Option<NodeId>) -> Quat {
        id.and_then(|id| self.relative_rotation(id, ancestor))
            .unwrap_or_else(identity_quat)
    }
}
