use cgmath::{InnerSpace, Matrix4, SquareMatrix};

use crate::math::{IDENTITY_QUAT, Mat4, Quat, Vec3, ZERO, identity_quat};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: ZERO,
        rotation: IDENTITY_QUAT,
        scale: Vec3 {
            x: 1.0,
            y: 1.0,
            z: 1.0,
        },
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    pub fn from_trs(translation: [f32; 3], rotation_xyzw: [f32; 4], scale: [f32; 3]) -> Self {
        let [x, y, z, w] = rotation_xyzw;
        Self {
            translation: translation.into(),
            rotation: normalized_or_identity(Quat::new(w, x, y, z)),
            scale: scale.into(),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Matrix4::from_translation(self.translation)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn inverse_matrix(&self) -> Mat4 {
        self.matrix().invert().unwrap_or_else(Mat4::identity)
    }
}

pub fn normalized_or_identity(q: Quat) -> Quat {
    let len = q.magnitude();
    if len.is_finite() && len > f32::EPSILON {
        q / len
    } else {
        identity_quat()
    }
}
