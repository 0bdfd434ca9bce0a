use figura_io::ModelMetadata;

use crate::error::ViewerError;

/// Requests from the surrounding page or window.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerCommand {
    ToggleWireframe,
    ToggleSkeleton,
    ToggleRuler,
    SelectAnimation(usize),
    RandomReframe,
    LoadModel(String),
    LoadAnimation(String),
    SetEnvironment(String),
}

/// What happened since the host last drained the queue.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerEvent {
    LoadingChanged(bool),
    ModelLoaded(ModelMetadata),
    LoadFailed(ViewerError),
    AnimationStarted {
        name: String,
        duration: f32,
        /// Source joints with no counterpart on the model.
        dropped: Vec<String>,
    },
    AnimationFailed(ViewerError),
    ContextLost,
    ContextRestored,
}
