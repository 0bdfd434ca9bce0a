use std::rc::Rc;

use figura_base::LengthUnit;
use figura_scene::math::Vec3;
use figura_scene::{
    Aabb, Material, MaterialHandle, MeshData, MeshNode, MeshRole, Node, NodeId, NodeKind, SceneGraph,
};
use tracing::debug;

use super::gpu;
use crate::backend::{Label, RenderBackend};
use crate::error::Result;

const TICK_STEP: f32 = 0.1;
const MAX_TICKS: usize = 100;
const BAR_WIDTH: f32 = 0.006;
const TICK_LENGTH: f32 = 0.03;
const GAP: f32 = 0.15;

/// Spacing between ticks; grows tenfold until no more than a hundred ticks are needed.
pub fn tick_step(height: f32) -> f32 {
    let mut step = TICK_STEP;
    while height.is_finite() && height / step > MAX_TICKS as f32 {
        step *= 10.0;
    }
    step
}

/// A floor-to-crown measuring bar standing beside the model.
#[derive(Debug)]
pub struct Ruler {
    node: NodeId,
    label: Label,
    ticks: usize,
}

impl Ruler {
    pub fn build(
        graph: &mut SceneGraph,
        backend: &mut dyn RenderBackend,
        parent: NodeId,
        bounds: &Aabb,
        height: f32,
        unit: LengthUnit,
    ) -> Result<Self> {
        let height = if height.is_finite() { height.max(0.0) } else { 0.0 };
        let scale = height.max(1.0);
        let x = bounds.max.x + GAP * scale;
        let half = BAR_WIDTH * scale * 0.5;

        let mut mesh = MeshData::default();
        mesh.append(
            &MeshData::cuboid(Vec3::new(x - half, 0.0, -half), Vec3::new(x + half, height, half)),
            0,
        );
        let step = tick_step(height);
        let ticks = (height / step + 1.0e-4).floor() as usize + 1;
        for i in 0..ticks {
            let y = i as f32 * step;
            let length = scale * if i % 5 == 0 { TICK_LENGTH * 2.0 } else { TICK_LENGTH };
            mesh.append(
                &MeshData::cuboid(
                    Vec3::new(x - half - length, y - half, -half),
                    Vec3::new(x - half, y + half, half),
                ),
                0,
            );
        }
        let material = MaterialHandle::new(Material::unlit("ruler", [0.95, 0.85, 0.2, 1.0]));
        let node = graph.add_child(
            parent,
            Node::new(
                "ruler",
                NodeKind::Mesh(MeshNode::new(Rc::new(mesh), vec![material], MeshRole::Ruler)),
            ),
        )?;
        gpu::upload_subtree(graph, backend, node)?;
        let label = Label {
            anchor: Vec3::new(x, height + 0.02 * scale, 0.0),
            text: unit.format(height),
        };
        debug!(ticks, step, text = %label.text, "ruler built");
        Ok(Self { node, label, ticks })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn dispose(self, graph: &mut SceneGraph, backend: &mut dyn RenderBackend) -> usize {
        gpu::remove_subtree(graph, backend, self.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    fn figure(height: f32) -> Aabb {
        Aabb::new(Vec3::new(-0.3, 0.0, -0.2), Vec3::new(0.3, height, 0.2))
    }

    #[test]
    fn ticks_every_ten_centimetres() -> anyhow::Result<()> {
        let mut graph = SceneGraph::new();
        let scene = graph.root();
        let mut backend = HeadlessBackend::new();
        backend.create_context(64, 64)?;
        let ruler = Ruler::build(&mut graph, &mut backend, scene, &figure(1.72), 1.72, LengthUnit::Meter)?;
        assert_eq!(ruler.ticks(), 18);
        assert_eq!(ruler.label().text, "1.72 m");
        assert!(ruler.label().anchor.x > 0.3);
        let bounds = graph
            .get(ruler.node())
            .and_then(|node| node.as_mesh())
            .and_then(|mesh| mesh.mesh.bounds())
            .ok_or_else(|| anyhow::anyhow!("ruler has no mesh"))?;
        assert!((bounds.max.y - 1.72).abs() < 1.0e-3);
        assert_eq!(ruler.dispose(&mut graph, &mut backend), 1);
        assert!(backend.stats().live_meshes.is_empty());
        Ok(())
    }

    #[test]
    fn tall_figures_get_coarser_ticks() {
        assert!((tick_step(1.7) - 0.1).abs() < 1.0e-6);
        assert!((tick_step(10.0) - 0.1).abs() < 1.0e-6);
        assert!((tick_step(50.0) - 1.0).abs() < 1.0e-5);
        assert!((tick_step(f32::INFINITY) - 0.1).abs() < 1.0e-6);
    }
}
