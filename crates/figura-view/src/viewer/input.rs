use super::ui::Point2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
    Middle,
}

/// Pointer input in viewport pixels, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down { pos: Point2, button: PointerButton },
    Move { pos: Point2 },
    Up { pos: Point2, button: PointerButton },
    Leave,
    /// Positive values zoom in.
    Wheel { delta: f32 },
}
