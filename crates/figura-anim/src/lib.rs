pub mod alias;
pub mod player;
pub mod retarget;
pub mod rig;
pub mod track;

pub use alias::{AliasTable, normalize_joint_name};
pub use player::{AnimationPlayer, LoopMode};
pub use retarget::{
    BoundRotationTrack, BoundTranslationTrack, RetargetedClip, TargetJoint, TargetRig, retarget,
    retarget_with,
};
pub use rig::{Facing, JointTrack, SourceAnimation, SourceClip, SourceJoint, SourceRig};
pub use track::{Interpolate, Interpolation, Track};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetargetError {
    #[error("target model has no hips joint to bind the animation to")]
    MissingRootJoint,
    #[error("clip `{clip}` has no track that maps onto the target skeleton")]
    EmptyClip { clip: String },
    #[error("clip index {index} out of range ({len} clips)")]
    ClipOutOfRange { index: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, RetargetError>;
