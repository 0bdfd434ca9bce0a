use cgmath::{InnerSpace, Matrix4, Quaternion, Rad, Rotation3, Vector3, Vector4};

pub type Vec3 = Vector3<f32>;
pub type Quat = Quaternion<f32>;
pub type Mat4 = Matrix4<f32>;

pub const ZERO: Vec3 = Vec3 {
    x: 0.0,
    y: 0.0,
    z: 0.0,
};
pub const UP: Vec3 = Vec3 {
    x: 0.0,
    y: 1.0,
    z: 0.0,
};
pub const IDENTITY_QUAT: Quat = Quat { s: 1.0, v: ZERO };

pub fn identity_quat() -> Quat {
    IDENTITY_QUAT
}

pub fn yaw(angle: f32) -> Quat {
    Quat::from_angle_y(Rad(angle))
}

pub fn transform_point(m: &Mat4, p: Vec3) -> Vec3 {
    let v = m * Vector4::new(p.x, p.y, p.z, 1.0);
    if v.w.abs() > f32::EPSILON && (v.w - 1.0).abs() > f32::EPSILON {
        Vec3::new(v.x / v.w, v.y / v.w, v.z / v.w)
    } else {
        v.truncate()
    }
}

pub fn transform_vector(m: &Mat4, v: Vec3) -> Vec3 {
    (m * v.extend(0.0)).truncate()
}

pub fn translation_of(m: &Mat4) -> Vec3 {
    m.w.truncate()
}

pub fn safe_normalize(v: Vec3) -> Option<Vec3> {
    let len = v.magnitude();
    if len.is_finite() && len > f32::EPSILON {
        Some(v / len)
    } else {
        None
    }
}

/// Keeps `q` in the same hemisphere as `reference` so interpolation takes the short arc.
pub fn align_hemisphere(q: Quat, reference: Quat) -> Quat {
    if q.dot(reference) < 0.0 { -q } else { q }
}

pub fn rotate_around_axis(point: Vec3, origin: Vec3, axis: Vec3, angle: f32) -> Vec3 {
    let Some(axis) = safe_normalize(axis) else {
        return point;
    };
    let v = point - origin;
    let cos = angle.cos();
    let sin = angle.sin();
    let rotated = v * cos + axis.cross(v) * sin + axis * (axis.dot(v)) * (1.0 - cos);
    origin + rotated
}

pub fn approx_eq(a: Vec3, b: Vec3, eps: f32) -> bool {
    (a - b).magnitude() <= eps
}

pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn rotate_quarter_turn_about_up() {
        let p = rotate_around_axis(Vec3::new(1.0, 0.0, 0.0), ZERO, UP, FRAC_PI_2);
        assert!(approx_eq(p, Vec3::new(0.0, 0.0, -1.0), 1.0e-6));
    }

    #[test]
    fn degenerate_axis_leaves_point() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(rotate_around_axis(p, ZERO, ZERO, 1.0), p);
    }

    #[test]
    fn smoothstep_is_clamped_and_symmetric() {
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(2.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1.0e-6);
        assert!(smoothstep(0.25) < 0.25);
    }

    #[test]
    fn hemisphere_alignment_flips_sign() {
        let q = yaw(0.3);
        let flipped = align_hemisphere(-q, q);
        assert!((flipped.s - q.s).abs() < 1.0e-6);
    }
}
