use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use figura_io::TextureAsset;
use figura_scene::{GpuMeshId, GpuTextureId, MeshData, NodeKind};
use tracing::{debug, warn};

use super::{FrameView, RenderBackend};
use crate::error::{Result, ViewerError};

/// Allocation bookkeeping, readable from any clone of the backend.
#[derive(Clone, Debug, Default)]
pub struct HeadlessStats {
    pub context_live: bool,
    pub contexts_created: usize,
    pub size: (u32, u32),
    pub live_meshes: HashSet<GpuMeshId>,
    pub live_textures: HashSet<GpuTextureId>,
    pub mesh_uploads: usize,
    pub mesh_releases: usize,
    pub texture_uploads: usize,
    pub texture_releases: usize,
    /// Releases of ids that were never handed out or were already released.
    pub double_releases: usize,
    pub frames: usize,
    pub last_draw_count: usize,
    /// Drawn mesh nodes whose id the backend does not know.
    pub stale_draws: usize,
}

#[derive(Debug, Default)]
struct Shared {
    stats: HeadlessStats,
    next_id: u64,
    fail_init: Option<String>,
    lose_on_next_frame: bool,
    orphaned_meshes: HashSet<GpuMeshId>,
    orphaned_textures: HashSet<GpuTextureId>,
}

impl Shared {
    /// Every id handed out so far becomes an orphan: releasing it later is not a double release.
    fn lose(&mut self) {
        self.stats.context_live = false;
        self.orphaned_meshes.extend(self.stats.live_meshes.drain());
        self.orphaned_textures.extend(self.stats.live_textures.drain());
    }
}

/// Draws nothing and counts everything. Clones share state so a test can keep a handle while
/// the engine owns the backend.
#[derive(Clone, Debug, Default)]
pub struct HeadlessBackend {
    shared: Rc<RefCell<Shared>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose context creation always fails.
    pub fn failing(reason: &str) -> Self {
        let backend = Self::default();
        backend.shared.borrow_mut().fail_init = Some(reason.to_string());
        backend
    }

    /// Makes the next rendered frame report a lost context.
    pub fn lose_context(&self) {
        self.shared.borrow_mut().lose_on_next_frame = true;
    }

    /// Loses the context right away; the engine finds out on its next upload or frame.
    pub fn drop_context(&self) {
        self.shared.borrow_mut().lose();
    }

    pub fn stats(&self) -> HeadlessStats {
        self.shared.borrow().stats.clone()
    }

    fn next_id(&self) -> u64 {
        let mut shared = self.shared.borrow_mut();
        shared.next_id += 1;
        shared.next_id
    }

    fn require_context(&self) -> Result<()> {
        if self.shared.borrow().stats.context_live {
            Ok(())
        } else {
            Err(ViewerError::ContextLost)
        }
    }
}

impl RenderBackend for HeadlessBackend {
    fn create_context(&mut self, width: u32, height: u32) -> Result<()> {
        let mut shared = self.shared.borrow_mut();
        if let Some(reason) = shared.fail_init.clone() {
            return Err(ViewerError::InitializationFailed(reason));
        }
        shared.stats.context_live = true;
        shared.stats.contexts_created += 1;
        shared.stats.size = (width, height);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.shared.borrow_mut().stats.size = (width, height);
    }

    fn upload_mesh(&mut self, _mesh: &MeshData) -> Result<GpuMeshId> {
        self.require_context()?;
        let id = GpuMeshId(self.next_id());
        let mut shared = self.shared.borrow_mut();
        shared.stats.live_meshes.insert(id);
        shared.stats.mesh_uploads += 1;
        Ok(id)
    }

    fn release_mesh(&mut self, id: GpuMeshId) {
        let mut shared = self.shared.borrow_mut();
        if shared.stats.live_meshes.remove(&id) || shared.orphaned_meshes.remove(&id) {
            shared.stats.mesh_releases += 1;
        } else {
            warn!(?id, "mesh released twice");
            shared.stats.double_releases += 1;
        }
    }

    fn upload_texture(&mut self, _texture: &TextureAsset) -> Result<GpuTextureId> {
        self.require_context()?;
        let id = GpuTextureId(self.next_id());
        let mut shared = self.shared.borrow_mut();
        shared.stats.live_textures.insert(id);
        shared.stats.texture_uploads += 1;
        Ok(id)
    }

    fn release_texture(&mut self, id: GpuTextureId) {
        let mut shared = self.shared.borrow_mut();
        if shared.stats.live_textures.remove(&id) || shared.orphaned_textures.remove(&id) {
            shared.stats.texture_releases += 1;
        } else {
            warn!(?id, "texture released twice");
            shared.stats.double_releases += 1;
        }
    }

    fn render(&mut self, frame: &FrameView<'_>) -> Result<()> {
        let mut shared = self.shared.borrow_mut();
        if std::mem::take(&mut shared.lose_on_next_frame) {
            shared.lose();
        }
        if !shared.stats.context_live {
            return Err(ViewerError::ContextLost);
        }
        let mut drawn = 0;
        let mut stale = 0;
        frame.graph.walk_visible(|_, node, _| {
            if let NodeKind::Mesh(mesh) = &node.kind {
                match mesh.gpu {
                    Some(id) if shared.stats.live_meshes.contains(&id) => drawn += 1,
                    _ => stale += 1,
                }
            }
        });
        shared.stats.frames += 1;
        shared.stats.last_draw_count = drawn;
        shared.stats.stale_draws += stale;
        debug!(drawn, "headless frame");
        Ok(())
    }

    fn destroy_context(&mut self) {
        let mut shared = self.shared.borrow_mut();
        shared.stats.context_live = false;
    }
}
