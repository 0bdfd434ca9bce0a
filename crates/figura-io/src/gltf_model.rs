use std::collections::BTreeMap;
use std::path::Path;

use cgmath::SquareMatrix;

use figura_anim::AliasTable;
use figura_base::HumanBone;
use figura_scene::math::{Mat4, Vec3};
use figura_scene::{Material, MeshData, Primitive, SkinWeights, Transform};
use gltf::mesh::Mode;
use tracing::{debug, info};

use crate::asset::{AssetMesh, AssetNode, AssetSkin, ModelAsset};
use crate::{LoadError, Result, vrm};

pub(crate) fn import(
    bytes: &[u8],
    base: Option<&Path>,
    url: &str,
) -> Result<(gltf::Document, Vec<gltf::buffer::Data>)> {
    let gltf = gltf::Gltf::from_slice(bytes).map_err(|err| LoadError::parse(url, err))?;
    let gltf::Gltf { document, blob } = gltf;
    let buffers = gltf::import_buffers(&document, base, blob).map_err(|err| LoadError::parse(url, err))?;
    Ok((document, buffers))
}

pub(crate) fn node_name(node: &gltf::Node<'_>) -> String {
    node.name()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("node{}", node.index()))
}

pub(crate) fn node_transform(node: &gltf::Node<'_>) -> Transform {
    let (t, r, s) = node.transform().decomposed();
    Transform::from_trs(t, r, s)
}

pub(crate) fn scene_roots(document: &gltf::Document) -> Vec<usize> {
    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        return scene.nodes().map(|node| node.index()).collect();
    }
    let mut has_parent = vec![false; document.nodes().len()];
    for node in document.nodes() {
        for child in node.children() {
            has_parent[child.index()] = true;
        }
    }
    (0..has_parent.len()).filter(|i| !has_parent[*i]).collect()
}

fn read_mesh(mesh: gltf::Mesh<'_>, buffers: &[gltf::buffer::Data]) -> AssetMesh {
    let mut data = MeshData::default();
    let mut materials = Vec::new();
    let mut joints = Vec::new();
    let mut weights = Vec::new();
    let mut any_skin = false;

    for prim in mesh.primitives() {
        if prim.mode() != Mode::Triangles {
            debug!(mesh = mesh.index(), mode = ?prim.mode(), "skipping non-triangle primitive");
            continue;
        }
        let reader = prim.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let positions: Vec<Vec3> = positions.map(Vec3::from).collect();
        let count = positions.len();
        let normals: Vec<Vec3> = reader
            .read_normals()
            .map(|it| it.map(Vec3::from).collect())
            .filter(|normals: &Vec<Vec3>| normals.len() == count)
            .unwrap_or_else(|| vec![Vec3::new(0.0, 1.0, 0.0); count]);
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..count as u32).collect(),
        };

        let prim_joints: Option<Vec<[u16; 4]>> = reader.read_joints(0).map(|it| it.into_u16().collect());
        let prim_weights: Option<Vec<[f32; 4]>> = reader.read_weights(0).map(|it| it.into_f32().collect());
        match (prim_joints, prim_weights) {
            (Some(j), Some(w)) if j.len() == count && w.len() == count => {
                any_skin = true;
                joints.extend(j);
                weights.extend(w);
            }
            _ => {
                joints.extend(std::iter::repeat_n([0u16; 4], count));
                weights.extend(std::iter::repeat_n([0.0f32; 4], count));
            }
        }

        let base = data.positions.len() as u32;
        let first_index = data.indices.len();
        data.positions.extend(positions);
        data.normals.extend(normals);
        data.indices.extend(indices.iter().map(|i| i + base));
        data.primitives.push(Primitive {
            first_index,
            index_count: indices.len(),
            material_slot: materials.len(),
        });
        materials.push(prim.material().index());
    }

    if any_skin {
        data.skin = Some(SkinWeights { joints, weights });
    }
    AssetMesh { data, materials }
}

fn read_material(material: gltf::Material<'_>) -> Material {
    let pbr = material.pbr_metallic_roughness();
    Material {
        name: material.name().unwrap_or("material").to_string(),
        base_color: pbr.base_color_factor(),
        texture: pbr.base_color_texture().map(|info| info.texture().index()),
        double_sided: material.double_sided(),
        ..Material::default()
    }
}

fn read_skin(skin: gltf::Skin<'_>, buffers: &[gltf::buffer::Data]) -> AssetSkin {
    let joints: Vec<usize> = skin.joints().map(|joint| joint.index()).collect();
    let reader = skin.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
    let inverse_bind = match reader.read_inverse_bind_matrices() {
        Some(iter) => iter.map(Mat4::from).collect(),
        None => vec![Mat4::identity(); joints.len()],
    };
    AssetSkin { joints, inverse_bind }
}

/// Bones resolved from node names when the file carries no humanoid extension.
fn humanoid_from_names(nodes: &[AssetNode]) -> BTreeMap<HumanBone, usize> {
    let aliases = AliasTable::standard();
    let mut mapping = BTreeMap::new();
    for (index, node) in nodes.iter().enumerate() {
        if let Some(bone) = aliases.resolve(&node.name) {
            mapping.entry(bone).or_insert(index);
        }
    }
    mapping
}

/// Parses a glTF, GLB or VRM file into a model asset. `base` resolves relative buffer URIs.
pub fn parse_model(bytes: &[u8], base: Option<&Path>, url: &str) -> Result<ModelAsset> {
    let json = vrm::raw_json(bytes, url)?;
    let (document, buffers) = import(bytes, base, url)?;

    let nodes: Vec<AssetNode> = document
        .nodes()
        .map(|node| AssetNode {
            name: node_name(&node),
            transform: node_transform(&node),
            children: node.children().map(|child| child.index()).collect(),
            mesh: node.mesh().map(|mesh| mesh.index()),
            skin: node.skin().map(|skin| skin.index()),
        })
        .collect();

    let mut humanoid = vrm::humanoid(&json, nodes.len());
    if humanoid.is_empty() {
        humanoid = humanoid_from_names(&nodes);
    }
    if !humanoid.contains_key(&HumanBone::Hips) {
        return Err(LoadError::NoSkeletonData {
            url: url.to_string(),
        });
    }

    let asset = ModelAsset {
        url: url.to_string(),
        roots: scene_roots(&document),
        meshes: document.meshes().map(|mesh| read_mesh(mesh, &buffers)).collect(),
        skins: document.skins().map(|skin| read_skin(skin, &buffers)).collect(),
        materials: document.materials().map(read_material).collect(),
        nodes,
        humanoid,
        spec_version: vrm::spec_version(&json),
        license: vrm::license(&json),
    };
    info!(
        url = %url,
        nodes = asset.nodes.len(),
        bones = asset.humanoid.len(),
        spec = %asset.spec_version,
        "parsed model"
    );
    Ok(asset)
}
