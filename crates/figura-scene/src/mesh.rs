use cgmath::InnerSpace;

use crate::bounds::Aabb;
use crate::math::{Vec3, ZERO};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuMeshId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuTextureId(pub u64);

/// A contiguous index range drawn with one material slot of the owning mesh node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Primitive {
    pub first_index: usize,
    pub index_count: usize,
    pub material_slot: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkinWeights {
    pub joints: Vec<[u16; 4]>,
    pub weights: Vec<[f32; 4]>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub primitives: Vec<Primitive>,
    pub skin: Option<SkinWeights>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.len() < 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|tri| [tri[0] as usize, tri[1] as usize, tri[2] as usize])
            .filter(|tri| tri.iter().all(|&i| i < self.positions.len()))
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }

    /// Appends `other` as a new primitive drawn with `material_slot`.
    pub fn append(&mut self, other: &MeshData, material_slot: usize) {
        let base = self.positions.len() as u32;
        let first_index = self.indices.len();
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(other.indices.iter().map(|i| i + base));
        self.primitives.push(Primitive {
            first_index,
            index_count: other.indices.len(),
            material_slot,
        });
    }

    pub fn recompute_normals(&mut self) {
        let mut normals = vec![ZERO; self.positions.len()];
        for [a, b, c] in self.triangles().collect::<Vec<_>>() {
            let n = (self.positions[b] - self.positions[a]).cross(self.positions[c] - self.positions[a]);
            normals[a] += n;
            normals[b] += n;
            normals[c] += n;
        }
        self.normals = normals
            .into_iter()
            .map(|n| {
                if n.magnitude2() > f32::EPSILON {
                    n.normalize()
                } else {
                    Vec3::new(0.0, 1.0, 0.0)
                }
            })
            .collect();
    }

    /// Axis-aligned box spanning `min..max`.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let corners = Aabb::new(min, max).corners();
        let faces: [[usize; 4]; 6] = [
            [0, 2, 3, 1],
            [4, 5, 7, 6],
            [0, 1, 5, 4],
            [2, 6, 7, 3],
            [0, 4, 6, 2],
            [1, 3, 7, 5],
        ];
        let mut mesh = MeshData::default();
        for face in faces {
            let base = mesh.positions.len() as u32;
            for idx in face {
                mesh.positions.push(corners[idx]);
            }
            mesh.indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh.primitives.push(Primitive {
            first_index: 0,
            index_count: mesh.indices.len(),
            material_slot: 0,
        });
        mesh.recompute_normals();
        mesh
    }

    /// Unit cube centred on the origin.
    pub fn unit_box() -> Self {
        Self::cuboid(Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, 0.5))
    }

    pub fn uv_sphere(radius: f32, rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);
        let mut mesh = MeshData::default();
        for ring in 0..=rings {
            let phi = std::f32::consts::PI * ring as f32 / rings as f32;
            for seg in 0..=segments {
                let theta = std::f32::consts::TAU * seg as f32 / segments as f32;
                let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                mesh.positions.push(n * radius);
                mesh.normals.push(n);
            }
        }
        let stride = segments + 1;
        for ring in 0..rings {
            for seg in 0..segments {
                let a = ring * stride + seg;
                let b = a + stride;
                mesh.indices.extend_from_slice(&[a, a + 1, b, a + 1, b + 1, b]);
            }
        }
        mesh.primitives.push(Primitive {
            first_index: 0,
            index_count: mesh.indices.len(),
            material_slot: 0,
        });
        mesh
    }
}
