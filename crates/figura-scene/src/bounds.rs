use crate::math::{Mat4, Vec3, transform_point};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: Vec3::new(min.x.min(max.x), min.y.min(max.y), min.z.min(max.z)),
            max: Vec3::new(min.x.max(max.x), min.y.max(max.y), min.z.max(max.z)),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points
            .into_iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
        let first = iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.include(p);
        }
        Some(bounds)
    }

    pub fn include(&mut self, p: Vec3) {
        self.min = Vec3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Vec3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(self, other: Self) -> Self {
        let mut out = self;
        out.include(other.min);
        out.include(other.max);
        out
    }

    pub fn merge(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (None, None) => None,
            (Some(value), None) | (None, Some(value)) => Some(value),
            (Some(a), Some(b)) => Some(a.union(b)),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Size with every axis raised to at least `floor`, so flat or empty boxes stay usable.
    pub fn clamped_size(&self, floor: f32) -> Vec3 {
        let size = self.size();
        let clamp = |v: f32| if v.is_finite() { v.max(floor) } else { floor };
        Vec3::new(clamp(size.x), clamp(size.y), clamp(size.z))
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    pub fn transformed(&self, m: &Mat4) -> Self {
        let corners = self.corners();
        let mut out = Self {
            min: transform_point(m, corners[0]),
            max: transform_point(m, corners[0]),
        };
        for corner in &corners[1..] {
            out.include(transform_point(m, *corner));
        }
        out
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_skips_non_finite() {
        let bounds = Aabb::from_points([
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(f32::NAN, 5.0, 0.0),
            Vec3::new(1.0, 2.0, 3.0),
        ]);
        assert_eq!(bounds, Some(Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 2.0, 3.0))));
        assert_eq!(Aabb::from_points(Vec::new()), None);
    }

    #[test]
    fn clamped_size_has_floor() {
        let flat = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        let size = flat.clamped_size(0.01);
        assert_eq!(size, Vec3::new(2.0, 0.01, 0.01));
    }

    #[test]
    fn merge_handles_missing_sides() {
        let a = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Vec3::new(-1.0, 0.5, 0.0), Vec3::new(0.5, 3.0, 0.5));
        assert_eq!(Aabb::merge(None, Some(a)), Some(a));
        let merged = Aabb::merge(Some(a), Some(b)).map(|m| (m.min, m.max));
        assert_eq!(merged, Some((Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 3.0, 1.0))));
    }
}
