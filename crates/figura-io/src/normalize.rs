use figura_anim::Facing;
use figura_scene::math::{Vec3, ZERO};
use figura_scene::{Aabb, Transform};

/// Smallest box extent used for framing; keeps degenerate models finite.
pub const MIN_EXTENT: f32 = 0.01;

/// Placement of a model under its root: facing +Z, horizontally centred, standing on y = 0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalization {
    pub transform: Transform,
    /// Bounds after the transform is applied.
    pub bounds: Aabb,
    pub height: f32,
}

impl Normalization {
    pub fn identity() -> Self {
        Self {
            transform: Transform::IDENTITY,
            bounds: Aabb::new(ZERO, ZERO),
            height: 0.0,
        }
    }
}

pub fn normalize(points: &[Vec3], facing: Facing) -> Normalization {
    let rotation = facing.correction();
    let Some(rotated) = Aabb::from_points(points.iter().map(|p| rotation * *p)) else {
        return Normalization {
            transform: Transform::from_rotation(rotation),
            ..Normalization::identity()
        };
    };
    let center = rotated.center();
    let offset = Vec3::new(-center.x, -rotated.min.y, -center.z);
    let bounds = rotated.translated(offset);
    Normalization {
        transform: Transform {
            translation: offset,
            rotation,
            scale: Vec3::new(1.0, 1.0, 1.0),
        },
        height: bounds.height(),
        bounds,
    }
}
