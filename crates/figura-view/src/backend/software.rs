use std::collections::HashMap;

use cgmath::InnerSpace;
use figura_io::TextureAsset;
use figura_scene::math::{Vec3, safe_normalize, transform_point};
use figura_scene::skinning::world_positions;
use figura_scene::{GpuMeshId, GpuTextureId, MeshData, MeshNode, MeshRole, NodeId};
use tracing::{debug, info};

use super::{FrameView, RenderBackend};
use crate::error::{Result, ViewerError};
use crate::viewer::overlay::{OverlayCollector, OverlayPainter, OverlayShape};
use crate::viewer::ui::{Align2, Color32, Point2, Stroke};

const AMBIENT: f32 = 0.35;
const PARTICLE_RADIUS: f32 = 1.5;
const LABEL_SIZE: f32 = 14.0;

/// Projects the scene on the CPU into flat 2D shapes, painter-sorted back to front.
#[derive(Debug)]
pub struct SoftwareBackend {
    context: bool,
    size: (u32, u32),
    next_id: u64,
    meshes: HashMap<GpuMeshId, MeshData>,
    textures: HashMap<GpuTextureId, (u32, u32)>,
    light: Vec3,
    frame: OverlayCollector,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self {
            context: false,
            size: (1, 1),
            next_id: 0,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            light: Vec3::new(0.4, 0.8, 0.45).normalize(),
            frame: OverlayCollector::default(),
        }
    }
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shapes of the last rendered frame.
    pub fn shapes(&self) -> &[OverlayShape] {
        &self.frame.shapes
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn resident_meshes(&self) -> usize {
        self.meshes.len()
    }

    fn allocate(&mut self) -> Result<u64> {
        if !self.context {
            return Err(ViewerError::ContextLost);
        }
        self.next_id += 1;
        Ok(self.next_id)
    }
}

struct Drawn {
    depth: f32,
    shape: OverlayShape,
}

impl RenderBackend for SoftwareBackend {
    fn create_context(&mut self, width: u32, height: u32) -> Result<()> {
        self.context = true;
        self.size = (width.max(1), height.max(1));
        self.meshes.clear();
        self.textures.clear();
        info!(width, height, "software context created");
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
    }

    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<GpuMeshId> {
        let id = GpuMeshId(self.allocate()?);
        self.meshes.insert(id, mesh.clone());
        Ok(id)
    }

    fn release_mesh(&mut self, id: GpuMeshId) {
        self.meshes.remove(&id);
    }

    fn upload_texture(&mut self, texture: &TextureAsset) -> Result<GpuTextureId> {
        let id = GpuTextureId(self.allocate()?);
        self.textures.insert(id, (texture.width, texture.height));
        Ok(id)
    }

    fn release_texture(&mut self, id: GpuTextureId) {
        self.textures.remove(&id);
    }

    fn render(&mut self, frame: &FrameView<'_>) -> Result<()> {
        if !self.context {
            return Err(ViewerError::ContextLost);
        }
        let mut drawn = Vec::new();
        frame.graph.walk_visible(|id, node, _| {
            let Some(mesh) = node.as_mesh() else {
                return;
            };
            let Some(data) = mesh.gpu.and_then(|gpu| self.meshes.get(&gpu)) else {
                return;
            };
            draw_mesh(frame, id, mesh, data, self.light, &mut drawn);
        });
        drawn.sort_by(|a, b| b.depth.total_cmp(&a.depth));

        self.frame.shapes.clear();
        self.frame.shapes.extend(drawn.into_iter().map(|item| item.shape));
        for label in frame.labels {
            if let Some((pos, _)) = frame.camera.project(label.anchor, frame.viewport) {
                self.frame
                    .text(pos, Align2::CenterBottom, label.text.clone(), LABEL_SIZE, Color32::WHITE);
            }
        }
        debug!(shapes = self.frame.shapes.len(), "software frame");
        Ok(())
    }

    fn destroy_context(&mut self) {
        self.context = false;
        self.meshes.clear();
        self.textures.clear();
        self.frame.shapes.clear();
    }

    fn paint(&self, painter: &mut dyn OverlayPainter) {
        self.frame.replay(painter);
    }
}

fn draw_mesh(
    frame: &FrameView<'_>,
    id: NodeId,
    mesh: &MeshNode,
    data: &MeshData,
    light: Vec3,
    out: &mut Vec<Drawn>,
) {
    let positions = if mesh.skin.is_some() {
        world_positions(frame.graph, id).unwrap_or_default()
    } else {
        let Some(world) = frame.graph.world_matrix(id) else {
            return;
        };
        data.positions.iter().map(|p| transform_point(&world, *p)).collect()
    };
    let camera = &frame.camera;
    let rect = frame.viewport;
    let base = |slot: usize| {
        mesh.materials
            .get(slot)
            .map(|material| {
                let material = material.borrow();
                (
                    Color32::from_rgba_f32(material.base_color),
                    material.unlit,
                    material.wireframe,
                    material.double_sided,
                )
            })
            .unwrap_or((Color32::from_gray(200), false, false, false))
    };

    if mesh.role == MeshRole::Particles || data.indices.is_empty() {
        let (color, ..) = base(0);
        for p in &positions {
            if let Some((pos, depth)) = camera.project(*p, rect) {
                out.push(Drawn {
                    depth,
                    shape: OverlayShape::Circle {
                        center: pos,
                        radius: PARTICLE_RADIUS,
                        fill: color,
                    },
                });
            }
        }
        return;
    }

    for primitive in &data.primitives {
        let (color, unlit, wireframe, double_sided) = base(primitive.material_slot);
        let end = (primitive.first_index + primitive.index_count).min(data.indices.len());
        let indices = data.indices.get(primitive.first_index..end).unwrap_or(&[]);
        for tri in indices.chunks_exact(3) {
            let corners = [tri[0], tri[1], tri[2]].map(|i| positions.get(i as usize).copied());
            let [Some(a), Some(b), Some(c)] = corners else {
                continue;
            };
            let normal = safe_normalize((b - a).cross(c - a));
            let centroid = (a + b + c) / 3.0;
            if !wireframe && !double_sided {
                if let Some(normal) = normal {
                    if normal.dot(camera.eye - centroid) <= 0.0 {
                        continue;
                    }
                }
            }
            let projected = [a, b, c].map(|p| camera.project(p, rect));
            let [Some((pa, da)), Some((pb, db)), Some((pc, dc))] = projected else {
                continue;
            };
            let depth = (da + db + dc) / 3.0;
            if wireframe {
                let stroke = Stroke::new(1.0, color);
                for (start, end) in [(pa, pb), (pb, pc), (pc, pa)] {
                    out.push(line(start, end, stroke, depth));
                }
                continue;
            }
            let shade = if unlit {
                1.0
            } else {
                let facing = normal.map_or(1.0, |n| n.dot(light).abs());
                AMBIENT + (1.0 - AMBIENT) * facing
            };
            out.push(Drawn {
                depth,
                shape: OverlayShape::Polygon {
                    points: vec![pa, pb, pc],
                    fill: color.shaded(shade),
                    stroke: None,
                },
            });
        }
    }
}

fn line(start: Point2, end: Point2, stroke: Stroke, depth: f32) -> Drawn {
    Drawn {
        depth,
        shape: OverlayShape::Line { start, end, stroke },
    }
}
