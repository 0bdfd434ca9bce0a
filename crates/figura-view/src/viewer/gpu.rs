use std::rc::Rc;

use figura_scene::{MeshData, Node, NodeId, NodeKind, SceneGraph};
use tracing::{trace, warn};

use crate::backend::RenderBackend;
use crate::error::Result;

/// Uploads every mesh under `root` that has no GPU copy yet.
pub fn upload_subtree(
    graph: &mut SceneGraph,
    backend: &mut dyn RenderBackend,
    root: NodeId,
) -> Result<usize> {
    let pending: Vec<(NodeId, Rc<MeshData>)> = graph
        .descendants(root)
        .into_iter()
        .filter_map(|id| {
            let mesh = graph.get(id)?.as_mesh()?;
            mesh.gpu.is_none().then(|| (id, Rc::clone(&mesh.mesh)))
        })
        .collect();
    let count = pending.len();
    for (id, data) in pending {
        let gpu = backend.upload_mesh(&data)?;
        if let Some(mesh) = graph.get_mut(id).and_then(|node| node.as_mesh_mut()) {
            mesh.gpu = Some(gpu);
        }
    }
    trace!(count, "uploaded meshes");
    Ok(count)
}

/// Forgets every GPU id under `root`; used after a lost context made them meaningless.
pub fn forget_subtree(graph: &mut SceneGraph, root: NodeId) {
    for id in graph.descendants(root) {
        if let Some(mesh) = graph.get_mut(id).and_then(|node| node.as_mesh_mut()) {
            mesh.gpu = None;
        }
    }
}

/// Releases whatever the removed nodes held on the GPU. Returns how many meshes were released.
pub fn release_nodes(backend: &mut dyn RenderBackend, removed: Vec<(NodeId, Node)>) -> usize {
    let mut released = 0;
    for (_, node) in removed {
        if let NodeKind::Mesh(mesh) = node.kind {
            if let Some(gpu) = mesh.gpu {
                backend.release_mesh(gpu);
                released += 1;
            }
        }
    }
    released
}

/// Detaches `id` with its subtree and releases its GPU resources. Stale ids release nothing.
pub fn remove_subtree(
    graph: &mut SceneGraph,
    backend: &mut dyn RenderBackend,
    id: NodeId,
) -> usize {
    match graph.remove(id) {
        Ok(removed) => release_nodes(backend, removed),
        Err(err) => {
            warn!(%err, "subtree already gone");
            0
        }
    }
}
