use cgmath::InnerSpace;
use figura_io::MIN_EXTENT;
use figura_scene::math::{UP, Vec3, ZERO, rotate_around_axis, safe_normalize, smoothstep};
use figura_scene::{Aabb, Ray};
use rand::Rng;

use super::ui::{Point2, Rect, pos2};
use crate::config::ViewerConfig;

/// Largest box extent considered when framing.
pub const MAX_EXTENT: f32 = 1.0e6;
const MAX_ELEVATION: f32 = 85.0 * std::f32::consts::PI / 180.0;
const NEAR: f32 = 1.0e-4;

/// Where the camera should end up for one model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFrame {
    pub target: Vec3,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

/// Fits `bounds` into the vertical field of view. Distance limits scale with the model height.
pub fn frame(bounds: &Aabb, config: &ViewerConfig) -> CameraFrame {
    let size = bounds.clamped_size(MIN_EXTENT);
    let extent = |v: f32| v.min(MAX_EXTENT);
    let height = extent(size.y);
    let max_dim = extent(size.x).max(height).max(extent(size.z));
    let half_fov = config.fov_deg.to_radians() * 0.5;
    let min_distance = height * config.min_distance_factor;
    let max_distance = height * config.max_distance_factor;
    let fit = max_dim / half_fov.sin() * config.tightness;
    let distance = if fit.is_finite() {
        fit.clamp(min_distance, max_distance)
    } else {
        min_distance
    };
    let center = bounds.center();
    let floor = if bounds.min.y.is_finite() { bounds.min.y } else { 0.0 };
    let target = Vec3::new(center.x, floor + height * config.target_height_ratio, center.z);
    CameraFrame {
        target: if is_finite(target) { target } else { ZERO },
        distance,
        min_distance,
        max_distance,
    }
}

fn is_finite(v: Vec3) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

/// Unit vector from the target towards the eye. Azimuth 0 looks at the model's front (+Z).
pub fn direction_from_angles(azimuth: f32, elevation: f32) -> Vec3 {
    Vec3::new(
        elevation.cos() * azimuth.sin(),
        elevation.sin(),
        elevation.cos() * azimuth.cos(),
    )
}

pub fn elevation_of(direction: Vec3) -> f32 {
    direction.y.clamp(-1.0, 1.0).asin()
}

#[derive(Clone, Copy, Debug)]
struct CameraBasis {
    pos: Vec3,
    right: Vec3,
    up: Vec3,
    forward: Vec3,
}

/// Read-only camera snapshot handed to the renderer each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraView {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_deg: f32,
}

impl CameraView {
    fn basis(&self) -> CameraBasis {
        let forward = safe_normalize(self.target - self.eye).unwrap_or(Vec3::new(0.0, 0.0, -1.0));
        let right = safe_normalize(forward.cross(self.up))
            .or_else(|| safe_normalize(forward.cross(Vec3::new(0.0, 0.0, 1.0))))
            .unwrap_or(Vec3::new(1.0, 0.0, 0.0));
        let up = right.cross(forward).normalize();
        CameraBasis {
            pos: self.eye,
            right,
            up,
            forward,
        }
    }

    /// Pixels per unit at depth 1.
    fn focal(&self, rect: Rect) -> f32 {
        rect.height().max(1.0) * 0.5 / (self.fov_deg.to_radians() * 0.5).tan()
    }

    /// Screen position and view depth of `point`; `None` behind the near plane.
    pub fn project(&self, point: Vec3, rect: Rect) -> Option<(Point2, f32)> {
        let basis = self.basis();
        let rel = point - basis.pos;
        let camera = Vec3::new(rel.dot(basis.right), rel.dot(basis.up), rel.dot(basis.forward));
        project_camera(camera, rect.center(), self.focal(rect), NEAR)
    }

    pub fn screen_ray(&self, pos: Point2, rect: Rect) -> Option<Ray> {
        if !rect.contains(pos) {
            return None;
        }
        let basis = self.basis();
        let focal = self.focal(rect);
        let center = rect.center();
        let dx = (pos.x - center.x) / focal;
        let dy = (center.y - pos.y) / focal;
        Ray::new(basis.pos, basis.forward + basis.right * dx + basis.up * dy)
    }

    /// World units per pixel at `point`'s depth.
    pub fn pixel_size_at(&self, point: Vec3, rect: Rect) -> f32 {
        let depth = (point - self.eye).dot(self.basis().forward).max(NEAR);
        depth / self.focal(rect)
    }
}

fn project_camera(camera: Vec3, center: Point2, focal: f32, near: f32) -> Option<(Point2, f32)> {
    if camera.z <= near {
        return None;
    }
    let sx = center.x + camera.x / camera.z * focal;
    let sy = center.y - camera.y / camera.z * focal;
    Some((pos2(sx, sy), camera.z))
}

/// Each component is `(from, to)`; input cancels only the component it overrides.
#[derive(Clone, Copy, Debug)]
struct CameraTween {
    target: Option<(Vec3, Vec3)>,
    distance: Option<(f32, f32)>,
    direction: Option<(Vec3, Vec3)>,
    elapsed: f32,
    duration: f32,
}

impl CameraTween {
    fn is_empty(&self) -> bool {
        self.target.is_none() && self.distance.is_none() && self.direction.is_none()
    }
}

#[derive(Clone, Debug)]
pub struct OrbitCamera {
    target: Vec3,
    direction: Vec3,
    distance: f32,
    min_distance: f32,
    max_distance: f32,
    framed_distance: f32,
    fov_deg: f32,
    tween: Option<CameraTween>,
}

impl OrbitCamera {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            target: Vec3::new(0.0, 1.0, 0.0),
            direction: direction_from_angles(
                config.first_azimuth_deg.to_radians(),
                config.first_elevation_deg.to_radians(),
            ),
            distance: 4.0,
            min_distance: 0.6,
            max_distance: 16.0,
            framed_distance: 4.0,
            fov_deg: config.fov_deg,
            tween: None,
        }
    }

    /// First load snaps to the configured viewing angle and centre. Later loads keep the
    /// viewing direction and any horizontal pan, easing only distance and target height.
    pub fn apply_frame(&mut self, frame: CameraFrame, first_load: bool, config: &ViewerConfig) {
        self.min_distance = frame.min_distance;
        self.max_distance = frame.max_distance;
        self.framed_distance = frame.distance;
        if first_load {
            self.direction = direction_from_angles(
                config.first_azimuth_deg.to_radians(),
                config.first_elevation_deg.to_radians(),
            );
            self.target = frame.target;
            self.distance = frame.distance;
            self.tween = None;
            return;
        }
        let target = Vec3::new(self.target.x, frame.target.y, self.target.z);
        if config.swap_tween_secs <= 0.0 {
            self.target = target;
            self.distance = frame.distance;
            self.tween = None;
            return;
        }
        self.tween = Some(CameraTween {
            target: Some((self.target, target)),
            distance: Some((self.distance, frame.distance)),
            direction: None,
            elapsed: 0.0,
            duration: config.swap_tween_secs,
        });
    }

    /// Eases to a random viewpoint around the current target.
    pub fn random_reframe(&mut self, rng: &mut impl Rng, config: &ViewerConfig) {
        let azimuth = rng.random_range(0.0..std::f32::consts::TAU);
        let [low, high] = config.reframe_elevation_deg;
        let elevation = rng
            .random_range(low..=high)
            .to_radians()
            .clamp(-MAX_ELEVATION, MAX_ELEVATION);
        let [near, far] = config.reframe_distance_factor;
        let factor = rng.random_range(near..=far);
        let distance = (self.framed_distance * factor).clamp(self.min_distance, self.max_distance);
        self.tween = Some(CameraTween {
            target: None,
            distance: Some((self.distance, distance)),
            direction: Some((self.direction, direction_from_angles(azimuth, elevation))),
            elapsed: 0.0,
            duration: config.swap_tween_secs.max(f32::EPSILON),
        });
    }

    /// Advances any running tween. Returns true while one is active.
    pub fn update(&mut self, dt: f32) -> bool {
        let Some(tween) = self.tween else {
            return false;
        };
        let elapsed = tween.elapsed + dt.max(0.0);
        let t = if tween.duration <= 0.0 {
            1.0
        } else {
            (elapsed / tween.duration).clamp(0.0, 1.0)
        };
        let s = smoothstep(t);
        if let Some((from, to)) = tween.target {
            self.target = if t >= 1.0 { to } else { from + (to - from) * s };
        }
        if let Some((from, to)) = tween.distance {
            self.distance = if t >= 1.0 { to } else { from + (to - from) * s };
        }
        if let Some((from, to)) = tween.direction {
            self.direction = if t >= 1.0 {
                to
            } else {
                safe_normalize(from * (1.0 - s) + to * s).unwrap_or(to)
            };
        }
        if t >= 1.0 {
            self.tween = None;
        } else {
            self.tween = Some(CameraTween { elapsed, ..tween });
        }
        self.tween.is_some()
    }

    /// Rotates the eye around the target. Pitch stops short of the poles.
    pub fn orbit(&mut self, yaw_delta: f32, pitch_delta: f32) {
        if let Some(tween) = self.tween.as_mut() {
            tween.direction = None;
        }
        self.drop_empty_tween();
        if yaw_delta != 0.0 {
            self.direction = rotate_around_axis(self.direction, ZERO, UP, yaw_delta);
        }
        if pitch_delta != 0.0 {
            if let Some(right) = safe_normalize(UP.cross(self.direction)) {
                let pitched = rotate_around_axis(self.direction, ZERO, right, -pitch_delta);
                if elevation_of(pitched).abs() <= MAX_ELEVATION {
                    self.direction = pitched;
                }
            }
        }
        self.direction = safe_normalize(self.direction).unwrap_or(Vec3::new(0.0, 0.0, 1.0));
    }

    /// Positive `amount` moves closer.
    pub fn zoom(&mut self, amount: f32) {
        if let Some(tween) = self.tween.as_mut() {
            tween.distance = None;
        }
        self.drop_empty_tween();
        let distance = self.distance * (-amount).exp();
        if distance.is_finite() {
            self.distance = distance.clamp(self.min_distance, self.max_distance);
        }
    }

    /// Slides target and eye together, in screen-aligned units of `distance`.
    pub fn pan(&mut self, dx: f32, dy: f32, sensitivity: f32) {
        if let Some(tween) = self.tween.as_mut() {
            tween.target = None;
        }
        self.drop_empty_tween();
        let basis = self.view().basis();
        let scale = self.distance * sensitivity;
        self.target += -basis.right * (dx * scale) + basis.up * (dy * scale);
    }

    fn drop_empty_tween(&mut self) {
        if self.tween.is_some_and(|tween| tween.is_empty()) {
            self.tween = None;
        }
    }

    pub fn view(&self) -> CameraView {
        CameraView {
            eye: self.eye(),
            target: self.target,
            up: UP,
            fov_deg: self.fov_deg,
        }
    }

    pub fn eye(&self) -> Vec3 {
        self.target + self.direction * self.distance
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn distance_bounds(&self) -> (f32, f32) {
        (self.min_distance, self.max_distance)
    }

    pub fn is_tweening(&self) -> bool {
        self.tween.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figura_scene::math::approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn figure(height: f32) -> Aabb {
        Aabb::new(
            Vec3::new(-0.25 * height, 0.0, -0.1 * height),
            Vec3::new(0.25 * height, height, 0.1 * height),
        )
    }

    #[test]
    fn distance_follows_the_fit_formula() {
        let config = ViewerConfig::default();
        let framed = frame(&figure(1.8), &config);
        let expected = 1.8 / (17.5f32).to_radians().sin() * 0.85;
        assert!((framed.distance - expected).abs() < 1.0e-4);
        assert!((framed.target.y - 1.8 * 0.55).abs() < 1.0e-5);
        assert!((framed.min_distance - 1.08).abs() < 1.0e-5);
        assert!((framed.max_distance - 14.4).abs() < 1.0e-4);
    }

    #[test]
    fn degenerate_and_extreme_boxes_stay_bounded() {
        let config = ViewerConfig::default();
        let boxes = [
            Aabb::new(ZERO, ZERO),
            Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0)),
            Aabb::new(Vec3::new(-1.0e30, 0.0, 0.0), Vec3::new(1.0e30, 1.0e-9, 0.0)),
            Aabb::new(Vec3::new(0.0, -1.0e38, 0.0), Vec3::new(0.0, 1.0e38, 0.0)),
            Aabb {
                min: Vec3::new(f32::NAN, 0.0, 0.0),
                max: Vec3::new(1.0, 1.0, 1.0),
            },
        ];
        for bounds in boxes {
            let framed = frame(&bounds, &config);
            assert!(framed.distance.is_finite() && framed.distance > 0.0, "{bounds:?}");
            assert!(framed.distance >= framed.min_distance, "{bounds:?}");
            assert!(framed.distance <= framed.max_distance, "{bounds:?}");
            assert!(is_finite(framed.target), "{bounds:?}");
        }
    }

    #[test]
    fn first_load_uses_the_configured_angle() {
        let config = ViewerConfig::default();
        let mut camera = OrbitCamera::new(&config);
        camera.apply_frame(frame(&figure(1.0), &config), true, &config);
        assert!(!camera.is_tweening());
        let dir = camera.direction();
        assert!((elevation_of(dir) - 12f32.to_radians()).abs() < 1.0e-5);
        assert!((dir.x.atan2(dir.z) - 25f32.to_radians()).abs() < 1.0e-5);
    }

    #[test]
    fn swap_keeps_direction_and_eases_distance() {
        let config = ViewerConfig::default();
        let mut camera = OrbitCamera::new(&config);
        camera.apply_frame(frame(&figure(1.0), &config), true, &config);
        camera.orbit(0.7, 0.2);
        let direction = camera.direction();
        let before = camera.distance();

        let next = frame(&figure(2.0), &config);
        camera.apply_frame(next, false, &config);
        assert!(camera.update(0.3));
        let halfway = camera.distance();
        assert!(halfway > before && halfway < next.distance);
        assert!(approx_eq(camera.direction(), direction, 1.0e-6));
        assert!(!camera.update(0.3));
        assert_eq!(camera.distance(), next.distance);
        assert_eq!(camera.target(), next.target);
        assert!(approx_eq(camera.direction(), direction, 1.0e-6));
    }

    #[test]
    fn swap_keeps_the_horizontal_pan() {
        let config = ViewerConfig::default();
        let mut camera = OrbitCamera::new(&config);
        camera.apply_frame(frame(&figure(1.0), &config), true, &config);
        camera.pan(40.0, 0.0, config.pan_sensitivity);
        let panned = camera.target();
        assert!(panned.x.abs() + panned.z.abs() > 1.0e-3);

        let next = frame(&figure(2.0), &config);
        camera.apply_frame(next, false, &config);
        camera.update(1.0);
        let target = camera.target();
        assert_eq!((target.x, target.z), (panned.x, panned.z));
        assert_eq!(target.y, next.target.y);
    }

    #[test]
    fn zoom_cancels_only_the_distance_tween() {
        let config = ViewerConfig::default();
        let mut camera = OrbitCamera::new(&config);
        camera.apply_frame(frame(&figure(1.0), &config), true, &config);
        let next = frame(&figure(3.0), &config);
        camera.apply_frame(next, false, &config);
        camera.update(0.1);
        camera.zoom(1000.0);
        assert_eq!(camera.distance(), next.min_distance);
        camera.update(1.0);
        assert_eq!(camera.distance(), next.min_distance);
        assert_eq!(camera.target(), next.target);
    }

    #[test]
    fn orbit_stops_before_the_pole() {
        let config = ViewerConfig::default();
        let mut camera = OrbitCamera::new(&config);
        for _ in 0..100 {
            camera.orbit(0.0, 0.1);
        }
        assert!(elevation_of(camera.direction()) <= MAX_ELEVATION + 1.0e-5);
        assert!(elevation_of(camera.direction()) > 1.0);
    }

    #[test]
    fn random_reframe_is_seeded_and_bounded() {
        let config = ViewerConfig::default();
        let run = || {
            let mut camera = OrbitCamera::new(&config);
            camera.apply_frame(frame(&figure(1.5), &config), true, &config);
            let mut rng = ChaCha8Rng::seed_from_u64(3);
            camera.random_reframe(&mut rng, &config);
            while camera.update(0.05) {}
            (camera.direction(), camera.distance())
        };
        let (dir_a, dist_a) = run();
        let (dir_b, dist_b) = run();
        assert_eq!(dir_a, dir_b);
        assert_eq!(dist_a, dist_b);
        let (min, max) = (1.5 * 0.6, 1.5 * 8.0);
        assert!(dist_a >= min && dist_a <= max);
    }

    #[test]
    fn centre_pixel_ray_hits_the_target() {
        let config = ViewerConfig::default();
        let mut camera = OrbitCamera::new(&config);
        camera.apply_frame(frame(&figure(1.0), &config), true, &config);
        let view = camera.view();
        let rect = Rect::from_size(640, 480);
        let ray = view.screen_ray(rect.center(), rect).expect("ray");
        let hit = ray.at(camera.distance());
        assert!(approx_eq(hit, camera.target(), 1.0e-4));
        let (screen, depth) = view.project(camera.target(), rect).expect("visible");
        assert!(screen.distance(rect.center()) < 1.0e-3);
        assert!((depth - camera.distance()).abs() < 1.0e-4);
    }
}
