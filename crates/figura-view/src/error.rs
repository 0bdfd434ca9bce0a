use figura_anim::RetargetError;
use figura_io::LoadError;
use figura_scene::SceneError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    #[error("viewer could not start: {0}")]
    InitializationFailed(String),
    #[error("render context lost")]
    ContextLost,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Retarget(#[from] RetargetError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("loading {url} did not finish within {seconds:.0} s")]
    LoadTimeout { url: String, seconds: f32 },
    #[error("animation {index} does not exist ({len} configured)")]
    AnimationIndex { index: usize, len: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ViewerError {
    /// Everything except a failed start leaves the viewer running.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InitializationFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;
