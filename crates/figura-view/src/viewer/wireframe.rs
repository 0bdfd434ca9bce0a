use figura_scene::{Material, MaterialHandle, SceneGraph};
use tracing::debug;

use super::model::LoadedModel;

/// Swaps model materials for one shared wireframe material and back again.
#[derive(Debug)]
pub struct WireframeToggle {
    enabled: bool,
    material: MaterialHandle,
}

impl Default for WireframeToggle {
    fn default() -> Self {
        Self {
            enabled: false,
            material: MaterialHandle::new(Material::wireframe_overlay()),
        }
    }
}

impl WireframeToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn material(&self) -> &MaterialHandle {
        &self.material
    }

    pub fn toggle(&mut self, graph: &mut SceneGraph, model: Option<&mut LoadedModel>) -> bool {
        self.set(graph, model, !self.enabled);
        self.enabled
    }

    pub fn set(&mut self, graph: &mut SceneGraph, model: Option<&mut LoadedModel>, enabled: bool) {
        self.enabled = enabled;
        if let Some(model) = model {
            self.apply(graph, model);
        }
    }

    /// Brings `model` in line with the current state; a freshly attached model is a no-op while
    /// the toggle is off.
    pub fn apply(&self, graph: &mut SceneGraph, model: &mut LoadedModel) {
        if self.enabled {
            let originals = model.snapshot_materials(graph);
            for (id, handles) in originals {
                if let Some(mesh) = graph.get_mut(*id).and_then(|node| node.as_mesh_mut()) {
                    mesh.materials = vec![self.material.clone(); handles.len()];
                }
            }
            debug!(meshes = model.meshes.len(), "wireframe on");
        } else if let Some(originals) = model.original_materials() {
            for (id, handles) in originals {
                if let Some(mesh) = graph.get_mut(*id).and_then(|node| node.as_mesh_mut()) {
                    mesh.materials = handles.clone();
                }
            }
            debug!(meshes = model.meshes.len(), "wireframe off");
        }
    }
}
