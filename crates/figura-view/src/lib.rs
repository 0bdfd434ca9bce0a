//! Avatar viewer engine: loads a humanoid model, frames it, retargets clips onto it and draws
//! it through a [`RenderBackend`].

pub mod backend;
pub mod config;
pub mod error;
pub mod viewer;

pub use backend::{FrameView, HeadlessBackend, HeadlessStats, Label, RenderBackend, SoftwareBackend};
pub use config::{AnimationEntry, ViewerConfig};
pub use error::{Result, ViewerError};
pub use viewer::clock::{Clock, ManualClock, SystemClock};
pub use viewer::engine::{EngineState, MetadataCallback, ViewerEngine};
pub use viewer::events::{ViewerCommand, ViewerEvent};
pub use viewer::input::{PointerButton, PointerEvent};
pub use viewer::interaction::InteractionMode;
pub use viewer::ui::{Point2, Rect};
