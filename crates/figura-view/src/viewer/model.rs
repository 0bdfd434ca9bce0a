use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use figura_anim::TargetRig;
use figura_base::HumanBone;
use figura_io::{ModelAsset, ModelMetadata, normalize};
use figura_scene::skinning::world_positions;
use figura_scene::{
    Aabb, Material, MaterialHandle, MeshNode, MeshRole, Node, NodeId, NodeKind, PickMesh, Ray,
    SceneGraph, Skin, Transform,
};
use tracing::debug;

/// The model currently attached to the scene.
///
/// `root` is the node the user spins; `content` carries the normalisation that puts the feet on
/// y = 0 and turns the model towards +Z. Everything below `content` comes from the asset.
#[derive(Debug)]
pub struct LoadedModel {
    pub url: String,
    pub root: NodeId,
    pub content: NodeId,
    pub meshes: Vec<NodeId>,
    pub joints: BTreeMap<HumanBone, NodeId>,
    /// Bounds in the root's space.
    pub bounds: Aabb,
    pub height: f32,
    pub rig: TargetRig,
    pub metadata: ModelMetadata,
    original_materials: Option<HashMap<NodeId, Vec<MaterialHandle>>>,
}

impl LoadedModel {
    pub fn instantiate(
        graph: &mut SceneGraph,
        parent: NodeId,
        asset: &ModelAsset,
    ) -> figura_scene::Result<Self> {
        let norm = normalize(&asset.rest_points(), asset.facing());
        let root = graph.add_child(parent, Node::group("model"))?;
        let content =
            graph.add_child(root, Node::group("content").with_transform(norm.transform))?;

        let materials: Vec<MaterialHandle> =
            asset.materials.iter().cloned().map(MaterialHandle::new).collect();
        let fallback = MaterialHandle::new(Material::default());
        let shared_meshes: Vec<_> = asset.meshes.iter().map(|mesh| Rc::new(mesh.data.clone())).collect();

        let mut ids: Vec<Option<NodeId>> = vec![None; asset.nodes.len()];
        let mut meshes = Vec::new();
        let mut stack: Vec<(usize, NodeId)> =
            asset.roots.iter().rev().map(|index| (*index, content)).collect();
        while let Some((index, parent_id)) = stack.pop() {
            let Some(asset_node) = asset.nodes.get(index) else {
                continue;
            };
            if ids[index].is_some() {
                continue;
            }
            let kind = match asset_node.mesh.and_then(|mesh| Some((mesh, asset.meshes.get(mesh)?))) {
                Some((mesh_index, mesh)) => {
                    let mut slots: Vec<MaterialHandle> = mesh
                        .materials
                        .iter()
                        .map(|slot| {
                            slot.and_then(|i| materials.get(i))
                                .cloned()
                                .unwrap_or_else(|| fallback.clone())
                        })
                        .collect();
                    if slots.is_empty() {
                        slots.push(fallback.clone());
                    }
                    NodeKind::Mesh(MeshNode::new(
                        Rc::clone(&shared_meshes[mesh_index]),
                        slots,
                        MeshRole::Model,
                    ))
                }
                None => NodeKind::Group,
            };
            let is_mesh = matches!(kind, NodeKind::Mesh(_));
            let id = graph.add_child(
                parent_id,
                Node::new(asset_node.name.clone(), kind).with_transform(asset_node.transform),
            )?;
            ids[index] = Some(id);
            if is_mesh {
                meshes.push(id);
            }
            stack.extend(asset_node.children.iter().rev().map(|child| (*child, id)));
        }

        for (index, asset_node) in asset.nodes.iter().enumerate() {
            let (Some(id), Some(skin)) = (ids[index], asset_node.skin.and_then(|s| asset.skins.get(s)))
            else {
                continue;
            };
            let joints = skin
                .joints
                .iter()
                .map(|joint| ids.get(*joint).copied().flatten().unwrap_or(id))
                .collect();
            if let Some(mesh) = graph.get_mut(id).and_then(|node| node.as_mesh_mut()) {
                mesh.skin = Some(Skin {
                    joints,
                    inverse_bind: skin.inverse_bind.clone(),
                });
            }
        }

        let joints: BTreeMap<HumanBone, NodeId> = asset
            .humanoid
            .iter()
            .filter_map(|(bone, index)| Some((*bone, ids.get(*index).copied().flatten()?)))
            .collect();
        let rig = TargetRig::capture(graph, root, &joints);
        debug!(
            url = %asset.url,
            nodes = asset.nodes.len(),
            meshes = meshes.len(),
            joints = joints.len(),
            "instantiated model"
        );
        Ok(Self {
            url: asset.url.clone(),
            root,
            content,
            meshes,
            joints,
            bounds: norm.bounds,
            height: norm.height,
            rig,
            metadata: asset.metadata(norm.height),
            original_materials: None,
        })
    }

    /// Records every mesh's material references the first time it is called. Later calls keep
    /// the first snapshot.
    pub fn snapshot_materials(&mut self, graph: &SceneGraph) -> &HashMap<NodeId, Vec<MaterialHandle>> {
        self.original_materials.get_or_insert_with(|| {
            self.meshes
                .iter()
                .filter_map(|id| Some((*id, graph.get(*id)?.as_mesh()?.materials.clone())))
                .collect()
        })
    }

    pub fn original_materials(&self) -> Option<&HashMap<NodeId, Vec<MaterialHandle>>> {
        self.original_materials.as_ref()
    }

    /// Puts every captured joint back to its rest transform.
    pub fn restore_rest_pose(&self, graph: &mut SceneGraph) {
        for joint in self.rig.joints.values() {
            if let Some(node) = graph.get_mut(joint.node) {
                node.local = joint.rest;
            }
        }
    }

    /// Resets the in-place spin applied by the user.
    pub fn reset_spin(&self, graph: &mut SceneGraph) {
        if let Some(node) = graph.get_mut(self.root) {
            node.local = Transform::IDENTITY;
        }
    }

    /// Distance along `ray` to the nearest posed triangle of the model.
    pub fn hit_test(&self, graph: &SceneGraph, ray: &Ray) -> Option<f32> {
        self.meshes
            .iter()
            .filter(|id| graph.get(**id).is_some_and(|node| node.visible))
            .filter_map(|id| {
                let positions = world_positions(graph, *id)?;
                let triangles = graph.get(*id)?.as_mesh()?.mesh.triangles().collect();
                PickMesh::new(positions, triangles).ray_pick(ray)
            })
            .min_by(|a, b| a.total_cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figura_io::procedural::mannequin;
    use figura_scene::math::{Vec3, approx_eq, translation_of};

    #[test]
    fn mannequin_stands_on_the_floor_under_its_root() -> anyhow::Result<()> {
        let mut graph = SceneGraph::new();
        let scene = graph.root();
        let asset = mannequin("m.glb", 1.7);
        let model = LoadedModel::instantiate(&mut graph, scene, &asset)?;
        assert!((model.height - 1.7).abs() < 1.0e-4);
        assert!(model.bounds.min.y.abs() < 1.0e-5);
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.joints.len(), 19);
        assert!(graph.is_ancestor(model.content, model.joints[&HumanBone::Hips]));
        let hips = graph
            .world_matrix(model.joints[&HumanBone::Hips])
            .map(|m| translation_of(&m))
            .ok_or_else(|| anyhow::anyhow!("hips missing"))?;
        // Feet reach further forward than the chest reaches back, so the body is shifted in z.
        assert!(approx_eq(hips, Vec3::new(0.0, 0.53 * 1.7, -0.02 * 1.7), 1.0e-4));
        assert_eq!(model.metadata.triangle_count, 180);
        Ok(())
    }

    #[test]
    fn material_snapshot_is_taken_once() -> anyhow::Result<()> {
        let mut graph = SceneGraph::new();
        let scene = graph.root();
        let mut model = LoadedModel::instantiate(&mut graph, scene, &mannequin("m.glb", 1.0))?;
        let first = model.snapshot_materials(&graph).clone();
        let body = model.meshes[0];
        if let Some(mesh) = graph.get_mut(body).and_then(|node| node.as_mesh_mut()) {
            mesh.materials = vec![MaterialHandle::new(Material::wireframe_overlay())];
        }
        let second = model.snapshot_materials(&graph);
        assert!(first[&body][0].ptr_eq(&second[&body][0]));
        Ok(())
    }

    #[test]
    fn rays_hit_the_body_and_miss_beside_it() -> anyhow::Result<()> {
        let mut graph = SceneGraph::new();
        let scene = graph.root();
        let model = LoadedModel::instantiate(&mut graph, scene, &mannequin("m.glb", 1.0))?;
        let towards = Ray::new(Vec3::new(0.0, 0.7, 5.0), Vec3::new(0.0, 0.0, -1.0))
            .ok_or_else(|| anyhow::anyhow!("bad ray"))?;
        let hit = model.hit_test(&graph, &towards).ok_or_else(|| anyhow::anyhow!("no hit"))?;
        assert!((hit - (5.0 - 0.07)).abs() < 1.0e-3);
        let beside = Ray::new(Vec3::new(2.0, 0.7, 5.0), Vec3::new(0.0, 0.0, -1.0))
            .ok_or_else(|| anyhow::anyhow!("bad ray"))?;
        assert_eq!(model.hit_test(&graph, &beside), None);
        Ok(())
    }
}
