use std::f32::consts::TAU;
use std::rc::Rc;

use figura_scene::math::{Vec3, yaw};
use figura_scene::{
    Material, MaterialHandle, MeshData, MeshNode, MeshRole, Node, NodeId, NodeKind, SceneGraph,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::gpu;
use crate::backend::RenderBackend;
use crate::error::Result;

const INNER_RADIUS: f32 = 0.8;
const OUTER_RADIUS: f32 = 2.5;
const CEILING: f32 = 1.4;
const SPIN_RATE: f32 = 0.05;
const BOB_RATE: f32 = 0.6;
const BOB_AMPLITUDE: f32 = 0.03;

/// Dust drifting around the model. Points are generated once; motion comes from the node.
#[derive(Debug)]
pub struct ParticleField {
    node: NodeId,
    count: usize,
    scale: f32,
    time: f32,
}

/// Points in a ring around the origin, sized to a figure `scale` tall.
pub fn scatter(count: usize, seed: u64, scale: f32) -> Vec<Vec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let radius = rng.random_range(INNER_RADIUS..OUTER_RADIUS) * scale;
            let angle = rng.random_range(0.0..TAU);
            let y = rng.random_range(0.0..CEILING) * scale;
            Vec3::new(radius * angle.cos(), y, radius * angle.sin())
        })
        .collect()
}

impl ParticleField {
    pub fn build(
        graph: &mut SceneGraph,
        backend: &mut dyn RenderBackend,
        parent: NodeId,
        height: f32,
        count: usize,
        seed: u64,
    ) -> Result<Self> {
        let scale = if height.is_finite() && height > 0.0 { height } else { 1.0 };
        let mesh = MeshData {
            positions: scatter(count, seed, scale),
            ..MeshData::default()
        };
        let material = MaterialHandle::new(Material::unlit("particles", [1.0, 1.0, 1.0, 0.55]));
        let node = graph.add_child(
            parent,
            Node::new(
                "particles",
                NodeKind::Mesh(MeshNode::new(Rc::new(mesh), vec![material], MeshRole::Particles)),
            ),
        )?;
        gpu::upload_subtree(graph, backend, node)?;
        debug!(count, seed, "particle field built");
        Ok(Self {
            node,
            count,
            scale,
            time: 0.0,
        })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn update(&mut self, graph: &mut SceneGraph, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.time += dt;
        }
        if let Some(node) = graph.get_mut(self.node) {
            node.local.rotation = yaw(self.time * SPIN_RATE);
            node.local.translation.y = (self.time * BOB_RATE).sin() * BOB_AMPLITUDE * self.scale;
        }
    }

    pub fn dispose(self, graph: &mut SceneGraph, backend: &mut dyn RenderBackend) -> usize {
        gpu::remove_subtree(graph, backend, self.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;
    use cgmath::InnerSpace;

    #[test]
    fn same_seed_same_field() {
        let a = scatter(32, 7, 1.8);
        assert_eq!(a, scatter(32, 7, 1.8));
        assert_ne!(a, scatter(32, 8, 1.8));
        for p in &a {
            let radius = Vec3::new(p.x, 0.0, p.z).magnitude();
            assert!((INNER_RADIUS * 1.8 - 1.0e-4..=OUTER_RADIUS * 1.8 + 1.0e-4).contains(&radius));
            assert!((0.0..=CEILING * 1.8).contains(&p.y));
        }
    }

    #[test]
    fn the_node_drifts_while_points_stay_put() -> anyhow::Result<()> {
        let mut graph = SceneGraph::new();
        let scene = graph.root();
        let mut backend = HeadlessBackend::new();
        backend.create_context(64, 64)?;
        let mut field = ParticleField::build(&mut graph, &mut backend, scene, 1.0, 16, 3)?;
        let uploads = backend.stats().mesh_uploads;
        field.update(&mut graph, 1.0);
        let local = graph
            .get(field.node())
            .map(|node| node.local)
            .ok_or_else(|| anyhow::anyhow!("gone"))?;
        assert!(local.translation.y > 0.0);
        assert_eq!(backend.stats().mesh_uploads, uploads);
        assert_eq!(field.dispose(&mut graph, &mut backend), 1);
        Ok(())
    }
}
