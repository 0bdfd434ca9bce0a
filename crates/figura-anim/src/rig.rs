use std::collections::HashMap;

use cgmath::SquareMatrix;
use figura_base::HumanBone;
use figura_scene::math::{Mat4, Quat, Vec3, identity_quat, yaw};
use figura_scene::Transform;
use serde::{Deserialize, Serialize};

use crate::track::Track;

/// Which way a rig's front faces in its own space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    PositiveZ,
    NegativeZ,
}

impl Facing {
    /// Yaw that turns this facing into +Z.
    pub fn correction(self) -> Quat {
        match self {
            Self::PositiveZ => identity_quat(),
            Self::NegativeZ => yaw(std::f32::consts::PI),
        }
    }

    pub fn correction_angle(self) -> f32 {
        match self {
            Self::PositiveZ => 0.0,
            Self::NegativeZ => std::f32::consts::PI,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceJoint {
    pub name: String,
    pub parent: Option<usize>,
    pub rest: Transform,
}

/// Skeleton an animation was authored against, in its own naming and rest pose.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceRig {
    pub joints: Vec<SourceJoint>,
    /// Explicit joint -> bone assignments shipped with the file; these win over name aliases.
    pub humanoid: HashMap<usize, HumanBone>,
    pub facing: Facing,
}

impl SourceRig {
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|joint| joint.name == name)
    }

    pub fn world_rotation(&self, index: usize) -> Quat {
        let mut rotation = identity_quat();
        let mut current = Some(index);
        let mut guard = self.joints.len();
        while let (Some(i), true) = (current, guard > 0) {
            let Some(joint) = self.joints.get(i) else {
                break;
            };
            rotation = joint.rest.rotation * rotation;
            current = joint.parent;
            guard -= 1;
        }
        rotation
    }

    pub fn parent_world_rotation(&self, index: usize) -> Quat {
        self.joints
            .get(index)
            .and_then(|joint| joint.parent)
            .map(|parent| self.world_rotation(parent))
            .unwrap_or_else(identity_quat)
    }

    pub fn world_matrix(&self, index: usize) -> Mat4 {
        let mut matrix = Mat4::identity();
        let mut current = Some(index);
        let mut guard = self.joints.len();
        while let (Some(i), true) = (current, guard > 0) {
            let Some(joint) = self.joints.get(i) else {
                break;
            };
            matrix = joint.rest.matrix() * matrix;
            current = joint.parent;
            guard -= 1;
        }
        matrix
    }

    pub fn parent_world_matrix(&self, index: usize) -> Mat4 {
        self.joints
            .get(index)
            .and_then(|joint| joint.parent)
            .map(|parent| self.world_matrix(parent))
            .unwrap_or_else(Mat4::identity)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct JointTrack<T> {
    pub joint: usize,
    pub track: Track<T>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceClip {
    pub name: String,
    pub duration: f32,
    pub rotations: Vec<JointTrack<Quat>>,
    pub translations: Vec<JointTrack<Vec3>>,
}

impl SourceClip {
    pub fn is_empty(&self) -> bool {
        self.rotations.iter().all(|t| t.track.is_empty())
            && self.translations.iter().all(|t| t.track.is_empty())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceAnimation {
    pub rig: SourceRig,
    pub clips: Vec<SourceClip>,
}
