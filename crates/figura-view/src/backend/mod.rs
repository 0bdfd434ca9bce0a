//! The seam between the engine and whatever draws its scene.

mod headless;
mod software;

pub use headless::{HeadlessBackend, HeadlessStats};
pub use software::SoftwareBackend;

use figura_io::TextureAsset;
use figura_scene::math::Vec3;
use figura_scene::{GpuMeshId, GpuTextureId, MeshData, SceneGraph};

use crate::error::Result;
use crate::viewer::camera::CameraView;
use crate::viewer::overlay::OverlayPainter;
use crate::viewer::ui::Rect;

/// Screen-facing text pinned to a point in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub anchor: Vec3,
    pub text: String,
}

/// Everything a backend needs to draw one frame.
pub struct FrameView<'a> {
    pub graph: &'a SceneGraph,
    pub camera: CameraView,
    pub viewport: Rect,
    pub environment: Option<GpuTextureId>,
    pub labels: &'a [Label],
}

/// GPU-side resource management and drawing. Every id handed out by `upload_*` is released at
/// most once; a lost context invalidates all of them.
pub trait RenderBackend {
    /// Fails with [`crate::ViewerError::InitializationFailed`] when no context is available.
    fn create_context(&mut self, width: u32, height: u32) -> Result<()>;
    fn resize(&mut self, width: u32, height: u32);
    fn upload_mesh(&mut self, mesh: &MeshData) -> Result<GpuMeshId>;
    fn release_mesh(&mut self, id: GpuMeshId);
    fn upload_texture(&mut self, texture: &TextureAsset) -> Result<GpuTextureId>;
    fn release_texture(&mut self, id: GpuTextureId);
    /// Fails with [`crate::ViewerError::ContextLost`] once the context is gone.
    fn render(&mut self, frame: &FrameView<'_>) -> Result<()>;
    fn destroy_context(&mut self);

    /// Replays the last rendered frame as 2D shapes, for backends that produce them.
    fn paint(&self, _painter: &mut dyn OverlayPainter) {}
}
