//! Toolkit-independent 2D types. The GUI front end converts these to egui types at the edge.

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub min: Point2,
    pub max: Point2,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point2) -> f32 {
        (self - other).length()
    }
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Rect {
    pub fn from_min_size(min: Point2, size: Vec2) -> Self {
        Self {
            min,
            max: Point2::new(min.x + size.x, min.y + size.y),
        }
    }

    /// The whole viewport of a `width` x `height` surface.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::from_min_size(Point2::default(), Vec2::new(width as f32, height as f32))
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Point2 {
        Point2::new((self.min.x + self.max.x) * 0.5, (self.min.y + self.max.y) * 0.5)
    }

    pub fn contains(&self, pos: Point2) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }
}

impl std::ops::Add<Vec2> for Point2 {
    type Output = Point2;

    fn add(self, rhs: Vec2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub<Point2> for Point2 {
    type Output = Vec2;

    fn sub(self, rhs: Point2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Color32 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color32 {
    pub const WHITE: Self = Self::from_rgb(255, 255, 255);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn from_gray(value: u8) -> Self {
        Self::from_rgb(value, value, value)
    }

    pub const fn from_rgba_unmultiplied(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// From linear `0..=1` channels; out of range values are clamped.
    pub fn from_rgba_f32(rgba: [f32; 4]) -> Self {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::from_rgba_unmultiplied(
            channel(rgba[0]),
            channel(rgba[1]),
            channel(rgba[2]),
            channel(rgba[3]),
        )
    }

    /// Scales the colour channels, leaving alpha alone.
    pub fn shaded(self, factor: f32) -> Self {
        let scale = |v: u8| (v as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Self::from_rgba_unmultiplied(scale(self.r), scale(self.g), scale(self.b), self.a)
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub width: f32,
    pub color: Color32,
}

impl Stroke {
    pub fn new(width: f32, color: Color32) -> Self {
        Self { width, color }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Align2 {
    LeftTop,
    CenterCenter,
    CenterBottom,
}

pub const fn pos2(x: f32, y: f32) -> Point2 {
    Point2::new(x, y)
}

pub const fn vec2(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shading_keeps_alpha() {
        let c = Color32::from_rgba_unmultiplied(200, 100, 50, 128).shaded(0.5);
        assert_eq!(c.to_array(), [100, 50, 25, 128]);
    }

    #[test]
    fn float_colours_clamp() {
        assert_eq!(Color32::from_rgba_f32([2.0, -1.0, 0.5, 1.0]).to_array(), [255, 0, 128, 255]);
    }

    #[test]
    fn viewport_rect_is_centred() {
        let rect = Rect::from_size(800, 600);
        assert_eq!(rect.center(), pos2(400.0, 300.0));
        assert!(rect.contains(pos2(0.0, 600.0)));
        assert_eq!(pos2(3.0, 4.0).distance(Point2::default()), 5.0);
        assert_eq!(pos2(1.0, 1.0) + vec2(2.0, 0.0) * 2.0, pos2(5.0, 1.0));
    }
}
