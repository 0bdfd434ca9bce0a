//! Plain-data results of parsing. They are `Send` so they can be produced off the frame thread
//! and instantiated into a scene graph later.

use std::collections::{BTreeMap, BTreeSet};

use cgmath::SquareMatrix;
use figura_anim::{Facing, SourceAnimation};
use figura_base::HumanBone;
use figura_scene::math::{Mat4, Vec3, transform_point, translation_of};
use figura_scene::skinning::skin_positions;
use figura_scene::{Material, MeshData, Transform};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq)]
pub struct AssetNode {
    pub name: String,
    pub transform: Transform,
    pub children: Vec<usize>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetMesh {
    pub data: MeshData,
    /// Asset material per primitive slot; `None` draws with the default material.
    pub materials: Vec<Option<usize>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetSkin {
    pub joints: Vec<usize>,
    pub inverse_bind: Vec<Mat4>,
}

/// Declared avatar format, read from embedded extensions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SpecVersion {
    Vrm0(String),
    Vrm1(String),
    #[default]
    Unknown,
}

impl SpecVersion {
    pub fn facing(&self) -> Facing {
        match self {
            Self::Vrm0(_) => Facing::NegativeZ,
            Self::Vrm1(_) | Self::Unknown => Facing::PositiveZ,
        }
    }
}

impl std::fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vrm0(version) | Self::Vrm1(version) if !version.is_empty() => {
                write!(f, "VRM {version}")
            }
            Self::Vrm0(_) => write!(f, "VRM 0.x"),
            Self::Vrm1(_) => write!(f, "VRM 1.0"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LicenseInfo {
    pub license: Option<String>,
    pub author: Option<String>,
    pub allowed_users: Option<String>,
    pub title: Option<String>,
}

/// What the page around the viewer gets after each successful load.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub url: String,
    pub triangle_count: usize,
    pub material_count: usize,
    pub detected_spec_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_users: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub height: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelAsset {
    pub url: String,
    pub nodes: Vec<AssetNode>,
    pub roots: Vec<usize>,
    pub meshes: Vec<AssetMesh>,
    pub skins: Vec<AssetSkin>,
    pub materials: Vec<Material>,
    pub humanoid: BTreeMap<HumanBone, usize>,
    pub spec_version: SpecVersion,
    pub license: LicenseInfo,
}

impl ModelAsset {
    pub fn facing(&self) -> Facing {
        self.spec_version.facing()
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.nodes.iter().position(|node| node.children.contains(&index))
    }

    /// Triangles drawn, counting every node instance of a shared mesh.
    pub fn triangle_count(&self) -> usize {
        self.nodes
            .iter()
            .filter_map(|node| node.mesh)
            .filter_map(|mesh| self.meshes.get(mesh))
            .map(|mesh| mesh.data.triangle_count())
            .sum()
    }

    /// Distinct materials referenced by drawn primitives; the default material counts once.
    pub fn material_count(&self) -> usize {
        let used: BTreeSet<Option<usize>> = self
            .nodes
            .iter()
            .filter_map(|node| node.mesh)
            .filter_map(|mesh| self.meshes.get(mesh))
            .flat_map(|mesh| {
                mesh.data
                    .primitives
                    .iter()
                    .map(|primitive| mesh.materials.get(primitive.material_slot).copied().flatten())
            })
            .collect();
        used.len()
    }

    /// Rest-pose world matrix of every node, in asset space.
    pub fn world_matrices(&self) -> Vec<Mat4> {
        let mut world = vec![Mat4::identity(); self.nodes.len()];
        let mut stack: Vec<(usize, Mat4)> =
            self.roots.iter().map(|root| (*root, Mat4::identity())).collect();
        let mut visited = vec![false; self.nodes.len()];
        while let Some((index, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(index) else {
                continue;
            };
            if std::mem::replace(&mut visited[index], true) {
                continue;
            }
            let matrix = parent * node.transform.matrix();
            world[index] = matrix;
            stack.extend(node.children.iter().map(|child| (*child, matrix)));
        }
        world
    }

    /// Every drawn vertex in its rest-pose world position, skinned where the mesh has a skin.
    /// Falls back to the humanoid joint positions for skeleton-only files.
    pub fn rest_points(&self) -> Vec<Vec3> {
        let world = self.world_matrices();
        let mut points = Vec::new();
        for (index, node) in self.nodes.iter().enumerate() {
            let Some(mesh) = node.mesh.and_then(|mesh| self.meshes.get(mesh)) else {
                continue;
            };
            let node_world = world[index];
            match node.skin.and_then(|skin| self.skins.get(skin)) {
                Some(skin) if mesh.data.skin.is_some() => {
                    let palette: Vec<Mat4> = skin
                        .joints
                        .iter()
                        .enumerate()
                        .map(|(i, joint)| {
                            let joint_world = world.get(*joint).copied().unwrap_or(node_world);
                            let inverse_bind =
                                skin.inverse_bind.get(i).copied().unwrap_or_else(Mat4::identity);
                            joint_world * inverse_bind
                        })
                        .collect();
                    points.extend(skin_positions(&mesh.data, &palette, &node_world));
                }
                _ => points.extend(mesh.data.positions.iter().map(|p| transform_point(&node_world, *p))),
            }
        }
        if points.is_empty() {
            points.extend(
                self.humanoid
                    .values()
                    .filter_map(|index| world.get(*index))
                    .map(translation_of),
            );
        }
        points
    }

    pub fn metadata(&self, height: f32) -> ModelMetadata {
        ModelMetadata {
            url: self.url.clone(),
            triangle_count: self.triangle_count(),
            material_count: self.material_count(),
            detected_spec_version: self.spec_version.to_string(),
            license: self.license.license.clone(),
            author: self.license.author.clone(),
            allowed_users: self.license.allowed_users.clone(),
            title: self.license.title.clone(),
            height,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnimationAsset {
    pub url: String,
    pub animation: SourceAnimation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use figura_scene::math::approx_eq;

    fn node(name: &str, transform: Transform, children: Vec<usize>, mesh: Option<usize>) -> AssetNode {
        AssetNode {
            name: name.to_string(),
            transform,
            children,
            mesh,
            skin: None,
        }
    }

    fn two_instances() -> ModelAsset {
        let mut quad = MeshData::cuboid(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        quad.append(&MeshData::unit_box(), 1);
        ModelAsset {
            nodes: vec![
                node("root", Transform::IDENTITY, vec![1, 2], None),
                node("a", Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)), vec![], Some(0)),
                node("b", Transform::IDENTITY, vec![], Some(0)),
            ],
            roots: vec![0],
            meshes: vec![AssetMesh {
                data: quad,
                materials: vec![None, Some(0)],
            }],
            materials: vec![Material::default()],
            ..ModelAsset::default()
        }
    }

    #[test]
    fn counts_follow_node_instances_and_distinct_materials() {
        let asset = two_instances();
        assert_eq!(asset.triangle_count(), 48);
        assert_eq!(asset.material_count(), 2);
    }

    #[test]
    fn rest_points_are_in_world_space() {
        let asset = two_instances();
        let points = asset.rest_points();
        let top = points.iter().fold(f32::MIN, |acc, p| acc.max(p.y));
        assert!((top - 3.0).abs() < 1.0e-5);
        assert_eq!(asset.parent_of(2), Some(0));
    }

    #[test]
    fn skeleton_only_assets_fall_back_to_joints() {
        let asset = ModelAsset {
            nodes: vec![node("hips", Transform::from_translation(Vec3::new(0.0, 0.9, 0.0)), vec![], None)],
            roots: vec![0],
            humanoid: BTreeMap::from([(HumanBone::Hips, 0)]),
            ..ModelAsset::default()
        };
        let points = asset.rest_points();
        assert_eq!(points.len(), 1);
        assert!(approx_eq(points[0], Vec3::new(0.0, 0.9, 0.0), 1.0e-6));
    }

    #[test]
    fn spec_version_labels() {
        assert_eq!(SpecVersion::Vrm1("1.0".into()).to_string(), "VRM 1.0");
        assert_eq!(SpecVersion::Vrm0(String::new()).to_string(), "VRM 0.x");
        assert_eq!(SpecVersion::Unknown.to_string(), "Unknown");
        assert_eq!(SpecVersion::Vrm0("0.0".into()).facing(), Facing::NegativeZ);
    }
}
