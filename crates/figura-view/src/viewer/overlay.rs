use super::ui::{Align2, Color32, Point2, Stroke};

/// One recorded paint call.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayShape {
    Line {
        start: Point2,
        end: Point2,
        stroke: Stroke,
    },
    Circle {
        center: Point2,
        radius: f32,
        fill: Color32,
    },
    Polygon {
        points: Vec<Point2>,
        fill: Color32,
        stroke: Option<Stroke>,
    },
    Text {
        pos: Point2,
        align: Align2,
        text: String,
        size: f32,
        color: Color32,
    },
}

pub trait OverlayPainter {
    fn line_segment(&mut self, start: Point2, end: Point2, stroke: Stroke);
    fn circle_filled(&mut self, center: Point2, radius: f32, fill: Color32);
    fn polygon(&mut self, points: Vec<Point2>, fill: Color32, stroke: Option<Stroke>);
    fn text(&mut self, pos: Point2, align: Align2, text: String, size: f32, color: Color32);
}

#[derive(Clone, Debug, Default)]
pub struct OverlayCollector {
    pub shapes: Vec<OverlayShape>,
}

impl OverlayCollector {
    /// Paints the recorded shapes, in order, onto another painter.
    pub fn replay(&self, painter: &mut dyn OverlayPainter) {
        for shape in &self.shapes {
            match shape.clone() {
                OverlayShape::Line { start, end, stroke } => painter.line_segment(start, end, stroke),
                OverlayShape::Circle {
                    center,
                    radius,
                    fill,
                } => painter.circle_filled(center, radius, fill),
                OverlayShape::Polygon {
                    points,
                    fill,
                    stroke,
                } => painter.polygon(points, fill, stroke),
                OverlayShape::Text {
                    pos,
                    align,
                    text,
                    size,
                    color,
                } => painter.text(pos, align, text, size, color),
            }
        }
    }
}

impl OverlayPainter for OverlayCollector {
    fn line_segment(&mut self, start: Point2, end: Point2, stroke: Stroke) {
        self.shapes.push(OverlayShape::Line { start, end, stroke });
    }

    fn circle_filled(&mut self, center: Point2, radius: f32, fill: Color32) {
        self.shapes.push(OverlayShape::Circle {
            center,
            radius,
            fill,
        });
    }

    fn polygon(&mut self, points: Vec<Point2>, fill: Color32, stroke: Option<Stroke>) {
        self.shapes.push(OverlayShape::Polygon {
            points,
            fill,
            stroke,
        });
    }

    fn text(&mut self, pos: Point2, align: Align2, text: String, size: f32, color: Color32) {
        self.shapes.push(OverlayShape::Text {
            pos,
            align,
            text,
            size,
            color,
        });
    }
}
