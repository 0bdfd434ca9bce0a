use std::collections::HashSet;
use std::rc::Rc;

use cgmath::InnerSpace;
use figura_scene::math::{UP, Vec3, translation_of};
use figura_scene::{
    Material, MaterialHandle, MeshData, MeshNode, MeshRole, Node, NodeId, NodeKind, Quat,
    SceneGraph, Transform,
};
use tracing::debug;

use super::gpu;
use super::model::LoadedModel;
use crate::backend::RenderBackend;
use crate::error::Result;

const MARKER_RADIUS: f32 = 0.015;
const CONNECTOR_WIDTH: f32 = 0.008;
const MIN_BONE_LENGTH: f32 = 1.0e-5;

/// Marker and connector meshes hung off the model's joints. They carry no transform state of
/// their own, so they follow whatever pose the joints are in.
#[derive(Debug, Default)]
pub struct SkeletonOverlay {
    markers: Vec<NodeId>,
    connectors: Vec<NodeId>,
}

impl SkeletonOverlay {
    pub fn build(
        graph: &mut SceneGraph,
        backend: &mut dyn RenderBackend,
        model: &LoadedModel,
    ) -> Result<Self> {
        let size = model.height.max(figura_io::MIN_EXTENT);
        let marker_mesh = Rc::new(MeshData::uv_sphere(MARKER_RADIUS * size, 6, 8));
        let connector_mesh = Rc::new(MeshData::cuboid(
            Vec3::new(-0.5, 0.0, -0.5),
            Vec3::new(0.5, 1.0, 0.5),
        ));
        let marker_material = MaterialHandle::new(Material::unlit("bone-marker", [1.0, 0.55, 0.1, 1.0]));
        let connector_material =
            MaterialHandle::new(Material::unlit("bone-connector", [0.2, 0.75, 1.0, 1.0]));

        let joint_nodes: HashSet<NodeId> = model.joints.values().copied().collect();
        let mut overlay = Self::default();
        for (bone, joint) in &model.joints {
            let compensation = 1.0 / world_scale(graph, *joint);
            let marker = MeshNode::new(
                Rc::clone(&marker_mesh),
                vec![marker_material.clone()],
                MeshRole::BoneMarker,
            );
            let transform = Transform {
                scale: Vec3::new(compensation, compensation, compensation),
                ..Transform::IDENTITY
            };
            let id = graph.add_child(
                *joint,
                Node::new(format!("{bone}.marker"), NodeKind::Mesh(marker)).with_transform(transform),
            )?;
            overlay.markers.push(id);

            let Some(parent) = parent_joint(graph, *joint, &joint_nodes, model.content) else {
                continue;
            };
            let Some(offset) = graph.relative_matrix(*joint, Some(parent)).map(|m| translation_of(&m))
            else {
                continue;
            };
            let length = offset.magnitude();
            if !length.is_finite() || length < MIN_BONE_LENGTH {
                continue;
            }
            let width = CONNECTOR_WIDTH * size / world_scale(graph, parent);
            let connector = MeshNode::new(
                Rc::clone(&connector_mesh),
                vec![connector_material.clone()],
                MeshRole::BoneConnector,
            );
            let transform = Transform {
                translation: figura_scene::math::ZERO,
                rotation: Quat::from_arc(UP, offset / length, Some(Vec3::unit_x())),
                scale: Vec3::new(width, length, width),
            };
            let id = graph.add_child(
                parent,
                Node::new(format!("{bone}.connector"), NodeKind::Mesh(connector)).with_transform(transform),
            )?;
            overlay.connectors.push(id);
        }
        for id in overlay.nodes().collect::<Vec<_>>() {
            gpu::upload_subtree(graph, backend, id)?;
        }
        debug!(
            markers = overlay.markers.len(),
            connectors = overlay.connectors.len(),
            "skeleton overlay built"
        );
        Ok(overlay)
    }

    pub fn markers(&self) -> &[NodeId] {
        &self.markers
    }

    pub fn connectors(&self) -> &[NodeId] {
        &self.connectors
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.markers.iter().chain(&self.connectors).copied()
    }

    /// Detaches every marker and connector and releases their GPU meshes.
    pub fn dispose(self, graph: &mut SceneGraph, backend: &mut dyn RenderBackend) -> usize {
        self.nodes()
            .map(|id| gpu::remove_subtree(graph, backend, id))
            .sum()
    }
}

fn world_scale(graph: &SceneGraph, id: NodeId) -> f32 {
    let scale = graph
        .world_matrix(id)
        .map(|m| m.x.truncate().magnitude())
        .unwrap_or(1.0);
    if scale.is_finite() && scale > f32::EPSILON { scale } else { 1.0 }
}

/// Closest ancestor of `joint` that is itself a humanoid joint, searching no higher than `stop`.
fn parent_joint(
    graph: &SceneGraph,
    joint: NodeId,
    joints: &HashSet<NodeId>,
    stop: NodeId,
) -> Option<NodeId> {
    let mut current = graph.get(joint)?.parent();
    while let Some(id) = current {
        if id == stop {
            return None;
        }
        if joints.contains(&id) {
            return Some(id);
        }
        current = graph.get(id)?.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use figura_base::HumanBone;
    use figura_io::procedural::mannequin;
    use figura_scene::math::{approx_eq, transform_point, yaw};

    fn setup() -> anyhow::Result<(SceneGraph, HeadlessBackend, LoadedModel)> {
        let mut graph = SceneGraph::new();
        let scene = graph.root();
        let model = LoadedModel::instantiate(&mut graph, scene, &mannequin("m.glb", 1.0))?;
        let mut backend = HeadlessBackend::new();
        backend.create_context(64, 64)?;
        Ok((graph, backend, model))
    }

    fn world_origin(graph: &SceneGraph, id: NodeId) -> anyhow::Result<Vec3> {
        graph
            .world_matrix(id)
            .map(|m| translation_of(&m))
            .ok_or_else(|| anyhow::anyhow!("stale node"))
    }

    #[test]
    fn markers_sit_on_joints_and_connectors_span_bones() -> anyhow::Result<()> {
        let (mut graph, mut backend, model) = setup()?;
        let overlay = SkeletonOverlay::build(&mut graph, &mut backend, &model)?;
        assert_eq!(overlay.markers().len(), 19);
        assert_eq!(overlay.connectors().len(), 18);
        assert_eq!(backend.stats().live_meshes.len(), 37);

        let arm = model.joints[&HumanBone::LeftUpperArm];
        let forearm = model.joints[&HumanBone::LeftLowerArm];
        if let Some(node) = graph.get_mut(arm) {
            node.local.rotation = yaw(0.7) * node.local.rotation;
        }
        for marker in overlay.markers() {
            let joint = graph.get(*marker).and_then(|node| node.parent()).ok_or_else(|| anyhow::anyhow!("orphan"))?;
            assert!(approx_eq(world_origin(&graph, *marker)?, world_origin(&graph, joint)?, 1.0e-5));
        }

        let connector = overlay
            .connectors()
            .iter()
            .copied()
            .find(|id| graph.get(*id).is_some_and(|node| node.parent() == Some(arm)))
            .ok_or_else(|| anyhow::anyhow!("no arm connector"))?;
        let tip = graph
            .world_matrix(connector)
            .map(|m| transform_point(&m, UP))
            .ok_or_else(|| anyhow::anyhow!("stale connector"))?;
        assert!(approx_eq(tip, world_origin(&graph, forearm)?, 1.0e-5));
        Ok(())
    }

    #[test]
    fn dispose_detaches_and_releases_everything() -> anyhow::Result<()> {
        let (mut graph, mut backend, model) = setup()?;
        let before = graph.len();
        let overlay = SkeletonOverlay::build(&mut graph, &mut backend, &model)?;
        let ids: Vec<NodeId> = overlay.nodes().collect();
        assert_eq!(overlay.dispose(&mut graph, &mut backend), 37);
        assert_eq!(graph.len(), before);
        assert!(ids.iter().all(|id| !graph.contains(*id)));
        let stats = backend.stats();
        assert!(stats.live_meshes.is_empty());
        assert_eq!(stats.double_releases, 0);
        Ok(())
    }
}
