use cgmath::SquareMatrix;

use crate::graph::{NodeId, SceneGraph, Skin};
use crate::math::{Mat4, Vec3, ZERO, transform_point};
use crate::mesh::MeshData;

/// One matrix per skin joint: joint world transform times its inverse bind matrix.
pub fn joint_palette(graph: &SceneGraph, skin: &Skin) -> Vec<Mat4> {
    skin.joints
        .iter()
        .enumerate()
        .map(|(i, joint)| {
            let world = graph.world_matrix(*joint).unwrap_or_else(Mat4::identity);
            let inverse_bind = skin.inverse_bind.get(i).copied().unwrap_or_else(Mat4::identity);
            world * inverse_bind
        })
        .collect()
}

/// Linear blend skinning on the CPU. Vertices without weights pass through `fallback`.
pub fn skin_positions(mesh: &MeshData, palette: &[Mat4], fallback: &Mat4) -> Vec<Vec3> {
    let Some(skin) = mesh.skin.as_ref() else {
        return mesh.positions.iter().map(|p| transform_point(fallback, *p)).collect();
    };
    mesh.positions
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let (Some(joints), Some(weights)) = (skin.joints.get(i), skin.weights.get(i)) else {
                return transform_point(fallback, *p);
            };
            let mut out = ZERO;
            let mut total = 0.0;
            for (joint, weight) in joints.iter().zip(weights) {
                if *weight <= 0.0 {
                    continue;
                }
                if let Some(m) = palette.get(*joint as usize) {
                    out += transform_point(m, *p) * *weight;
                    total += *weight;
                }
            }
            if total > f32::EPSILON {
                out / total
            } else {
                transform_point(fallback, *p)
            }
        })
        .collect()
}

/// Current world-space vertex positions of a mesh node, skinned when it carries a skin.
pub fn world_positions(graph: &SceneGraph, id: NodeId) -> Option<Vec<Vec3>> {
    let node = graph.get(id)?;
    let mesh = node.as_mesh()?;
    let world = graph.world_matrix(id)?;
    Some(match &mesh.skin {
        Some(skin) => skin_positions(&mesh.mesh, &joint_palette(graph, skin), &world),
        None => mesh.mesh.positions.iter().map(|p| transform_point(&world, *p)).collect(),
    })
}
