use cgmath::InnerSpace;
use figura_scene::math::{Quat, Vec3, align_hemisphere};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    #[default]
    Linear,
}

pub trait Interpolate: Copy {
    fn interpolate(a: Self, b: Self, f: f32) -> Self;

    /// Weighted sum of spline terms. The first term is the segment's start value.
    fn combine(terms: [(Self, f32); 4]) -> Self;
}

impl Interpolate for Vec3 {
    fn interpolate(a: Self, b: Self, f: f32) -> Self {
        a + (b - a) * f
    }

    fn combine(terms: [(Self, f32); 4]) -> Self {
        terms.iter().fold(Vec3::new(0.0, 0.0, 0.0), |sum, (v, w)| sum + *v * *w)
    }
}

impl Interpolate for Quat {
    fn interpolate(a: Self, b: Self, f: f32) -> Self {
        let b = align_hemisphere(b, a);
        if a.dot(b) > 0.9995 {
            (a + (b - a) * f).normalize()
        } else {
            a.slerp(b, f)
        }
    }

    fn combine(terms: [(Self, f32); 4]) -> Self {
        let sum = terms
            .iter()
            .fold(Quat::new(0.0, 0.0, 0.0, 0.0), |sum, (q, w)| sum + *q * *w);
        if sum.magnitude2() > f32::EPSILON {
            sum.normalize()
        } else {
            terms[0].0
        }
    }
}

/// Cubic Hermite basis over one segment `span` seconds long, at fraction `s`.
fn hermite<T: Interpolate>(v0: T, out0: T, in1: T, v1: T, span: f32, s: f32) -> T {
    let s2 = s * s;
    let s3 = s2 * s;
    T::combine([
        (v0, 2.0 * s3 - 3.0 * s2 + 1.0),
        (out0, span * (s3 - 2.0 * s2 + s)),
        (v1, -2.0 * s3 + 3.0 * s2),
        (in1, span * (s3 - s2)),
    ])
}

/// Keyframes sorted by time.
#[derive(Clone, Debug, PartialEq)]
pub struct Track<T> {
    pub times: Vec<f32>,
    pub values: Vec<T>,
    pub interpolation: Interpolation,
}

impl<T: Interpolate> Track<T> {
    /// Builds a track from parallel key arrays, dropping unmatched or non-finite keys.
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: Interpolation) -> Self {
        let mut keys: Vec<(f32, T)> = times
            .into_iter()
            .zip(values)
            .filter(|(t, _)| t.is_finite())
            .collect();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (times, values) = keys.into_iter().unzip();
        Self {
            times,
            values,
            interpolation,
        }
    }

    /// Evaluates a cubic spline of `[in-tangent, value, out-tangent]` keys and bakes it into
    /// linear keys, `substeps` per segment. Key values themselves are kept exactly.
    pub fn from_cubic_spline(times: Vec<f32>, keys: Vec<[T; 3]>, substeps: usize) -> Self {
        let mut keys: Vec<(f32, [T; 3])> = times
            .into_iter()
            .zip(keys)
            .filter(|(t, _)| t.is_finite())
            .collect();
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        let substeps = substeps.max(1);
        let mut times = Vec::with_capacity(keys.len() * substeps);
        let mut values = Vec::with_capacity(keys.len() * substeps);
        for pair in keys.windows(2) {
            let (t0, [_, v0, out0]) = pair[0];
            let (t1, [in1, v1, _]) = pair[1];
            let span = t1 - t0;
            for step in 0..substeps {
                let s = step as f32 / substeps as f32;
                times.push(t0 + span * s);
                values.push(hermite(v0, out0, in1, v1, span, s));
            }
        }
        if let Some((t, [_, v, _])) = keys.last().copied() {
            times.push(t);
            values.push(v);
        }
        Self {
            times,
            values,
            interpolation: Interpolation::Linear,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    pub fn sample(&self, t: f32) -> Option<T> {
        let (first_time, first) = (self.times.first()?, self.values.first()?);
        let (last_time, last) = (self.times.last()?, self.values.last()?);
        if t <= *first_time {
            return Some(*first);
        }
        if t >= *last_time {
            return Some(*last);
        }
        let i = self.times.partition_point(|time| *time <= t).saturating_sub(1);
        let (t0, t1) = (self.times[i], self.times[i + 1]);
        let (a, b) = (self.values[i], self.values[i + 1]);
        match self.interpolation {
            Interpolation::Step => Some(a),
            Interpolation::Linear => {
                let span = t1 - t0;
                let f = if span > f32::EPSILON { (t - t0) / span } else { 0.0 };
                Some(T::interpolate(a, b, f))
            }
        }
    }

    /// Same key times, new values.
    pub fn map<U: Interpolate>(&self, f: impl FnMut(T) -> U) -> Track<U> {
        Track {
            times: self.times.clone(),
            values: self.values.iter().copied().map(f).collect(),
            interpolation: self.interpolation,
        }
    }
}

impl Track<Quat> {
    /// Flips keys into a common hemisphere so consecutive keys interpolate along the short arc.
    pub fn make_continuous(&mut self) {
        for i in 1..self.values.len() {
            self.values[i] = align_hemisphere(self.values[i], self.values[i - 1]);
        }
    }
}
