use std::cmp::Ordering;

use cgmath::InnerSpace;

use crate::bounds::Aabb;
use crate::math::{Mat4, Vec3, safe_normalize, transform_point, transform_vector};

const BVH_LEAF_SIZE: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Option<Self> {
        safe_normalize(dir).map(|dir| Self { origin, dir })
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Maps the ray through `m`; the direction is left unnormalised so hit distances stay
    /// comparable with the source space.
    pub fn transformed(&self, m: &Mat4) -> Self {
        Self {
            origin: transform_point(m, self.origin),
            dir: transform_vector(m, self.dir),
        }
    }
}

pub fn ray_intersect_triangle(origin: Vec3, dir: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
    let eps = 1.0e-7;
    let edge1 = b - a;
    let edge2 = c - a;
    let pvec = dir.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < eps {
        return None;
    }
    let inv_det = 1.0 / det;
    let tvec = origin - a;
    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let qvec = tvec.cross(edge1);
    let v = dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(qvec) * inv_det;
    if t > eps { Some(t) } else { None }
}

#[derive(Clone, Copy, Debug)]
struct BvhNode {
    bounds: Aabb,
    left: Option<usize>,
    right: Option<usize>,
    start: usize,
    count: usize,
}

/// Triangle soup with a bounding volume hierarchy for ray queries.
#[derive(Clone, Debug, Default)]
pub struct PickMesh {
    positions: Vec<Vec3>,
    triangles: Vec<[usize; 3]>,
    bvh_nodes: Vec<BvhNode>,
    bvh_indices: Vec<usize>,
}

impl PickMesh {
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[usize; 3]>) -> Self {
        let triangles: Vec<_> = triangles
            .into_iter()
            .filter(|tri| tri.iter().all(|&i| i < positions.len()))
            .collect();
        let (bvh_nodes, bvh_indices) = build_bvh(&positions, &triangles);
        Self {
            positions,
            triangles,
            bvh_nodes,
            bvh_indices,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.bvh_nodes.first().map(|node| node.bounds)
    }

    /// Nearest hit distance along `ray`.
    pub fn ray_pick(&self, ray: &Ray) -> Option<f32> {
        let (origin, dir) = (ray.origin, ray.dir);
        let root = self.bvh_nodes.first()?;
        ray_aabb_interval(origin, dir, root.bounds, f32::INFINITY)?;

        let mut best_t = f32::INFINITY;
        let mut stack = vec![0usize];
        while let Some(node_idx) = stack.pop() {
            let node = &self.bvh_nodes[node_idx];
            if ray_aabb_interval(origin, dir, node.bounds, best_t).is_none() {
                continue;
            }

            if node.count > 0 {
                for &tri_idx in &self.bvh_indices[node.start..node.start + node.count] {
                    let [a, b, c] = self.triangles[tri_idx];
                    if let Some(t) = ray_intersect_triangle(
                        origin,
                        dir,
                        self.positions[a],
                        self.positions[b],
                        self.positions[c],
                    ) {
                        best_t = best_t.min(t);
                    }
                }
                continue;
            }

            let left_hit = node.left.and_then(|idx| {
                ray_aabb_interval(origin, dir, self.bvh_nodes[idx].bounds, best_t)
                    .map(|(tmin, _)| (idx, tmin))
            });
            let right_hit = node.right.and_then(|idx| {
                ray_aabb_interval(origin, dir, self.bvh_nodes[idx].bounds, best_t)
                    .map(|(tmin, _)| (idx, tmin))
            });
            match (left_hit, right_hit) {
                (Some((left_idx, left_t)), Some((right_idx, right_t))) => {
                    if left_t <= right_t {
                        stack.push(right_idx);
                        stack.push(left_idx);
                    } else {
                        stack.push(left_idx);
                        stack.push(right_idx);
                    }
                }
                (Some((left_idx, _)), None) => stack.push(left_idx),
                (None, Some((right_idx, _))) => stack.push(right_idx),
                (None, None) => {}
            }
        }

        best_t.is_finite().then_some(best_t)
    }
}

/// Brute-force nearest hit over an index list, for geometry that changes every frame.
pub fn ray_pick_triangles(ray: &Ray, positions: &[Vec3], triangles: &[[usize; 3]]) -> Option<f32> {
    triangles
        .iter()
        .filter(|tri| tri.iter().all(|&i| i < positions.len()))
        .filter_map(|&[a, b, c]| {
            ray_intersect_triangle(ray.origin, ray.dir, positions[a], positions[b], positions[c])
        })
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}

fn build_bvh(positions: &[Vec3], triangles: &[[usize; 3]]) -> (Vec<BvhNode>, Vec<usize>) {
    if triangles.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let mut tri_bounds = Vec::with_capacity(triangles.len());
    let mut centroids = Vec::with_capacity(triangles.len());
    for &[a, b, c] in triangles {
        let (p0, p1, p2) = (positions[a], positions[b], positions[c]);
        let mut bounds = Aabb::new(p0, p1);
        bounds.include(p2);
        tri_bounds.push(bounds);
        centroids.push((p0 + p1 + p2) * (1.0 / 3.0));
    }

    let mut indices: Vec<usize> = (0..triangles.len()).collect();
    let mut nodes = Vec::new();
    let mut out_indices = Vec::with_capacity(triangles.len());
    build_bvh_node(&mut indices, &tri_bounds, &centroids, &mut nodes, &mut out_indices);
    (nodes, out_indices)
}

fn build_bvh_node(
    indices: &mut [usize],
    tri_bounds: &[Aabb],
    centroids: &[Vec3],
    nodes: &mut Vec<BvhNode>,
    out_indices: &mut Vec<usize>,
) -> usize {
    let node_index = nodes.len();
    let mut bounds = tri_bounds[indices[0]];
    let mut cbounds = Aabb::new(centroids[indices[0]], centroids[indices[0]]);
    for &idx in &indices[1..] {
        bounds = bounds.union(tri_bounds[idx]);
        cbounds.include(centroids[idx]);
    }
    nodes.push(BvhNode {
        bounds,
        left: None,
        right: None,
        start: 0,
        count: 0,
    });

    if indices.len() <= BVH_LEAF_SIZE {
        nodes[node_index].start = out_indices.len();
        nodes[node_index].count = indices.len();
        out_indices.extend_from_slice(indices);
        return node_index;
    }

    let extent = cbounds.size();
    let axis = if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    };
    indices.sort_unstable_by(|a, b| {
        centroids[*a][axis]
            .partial_cmp(&centroids[*b][axis])
            .unwrap_or(Ordering::Equal)
    });
    let mid = indices.len() / 2;
    let (left, right) = indices.split_at_mut(mid);
    let left_idx = build_bvh_node(left, tri_bounds, centroids, nodes, out_indices);
    let right_idx = build_bvh_node(right, tri_bounds, centroids, nodes, out_indices);
    nodes[node_index].left = Some(left_idx);
    nodes[node_index].right = Some(right_idx);
    node_index
}

fn ray_aabb_interval(origin: Vec3, dir: Vec3, bounds: Aabb, max_t: f32) -> Option<(f32, f32)> {
    let mut tmin: f32 = 0.0;
    let mut tmax: f32 = max_t;

    for axis in 0..3 {
        let (o, d, min, max) = (origin[axis], dir[axis], bounds.min[axis], bounds.max[axis]);
        if d.abs() <= 1.0e-9 {
            if o < min || o > max {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let t1 = (min - o) * inv;
        let t2 = (max - o) * inv;
        tmin = tmin.max(t1.min(t2));
        tmax = tmax.min(t1.max(t2));
        if tmax < tmin {
            return None;
        }
    }
    if tmax < 0.0 {
        return None;
    }
    Some((tmin, tmax))
}
