use super::input::PointerButton;
use super::ui::{Point2, Vec2};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InteractionMode {
    #[default]
    Idle,
    Orbiting,
    RotatingModel,
}

/// What a pointer move should do to the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragAction {
    None,
    /// Horizontal pixels to turn the model by.
    Spin(f32),
    Orbit(Vec2),
    Pan(Vec2),
}

/// Arbitrates the pointer between the orbit camera and turning the model in place.
#[derive(Clone, Debug, Default)]
pub struct InteractionMachine {
    mode: InteractionMode,
    button: Option<PointerButton>,
    last: Option<Point2>,
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn orbit_enabled(&self) -> bool {
        self.mode != InteractionMode::RotatingModel
    }

    pub fn is_dragging(&self) -> bool {
        self.button.is_some()
    }

    /// `hits_model` is only consulted for a primary press outside a model drag.
    pub fn pointer_down(
        &mut self,
        pos: Point2,
        button: PointerButton,
        hits_model: impl FnOnce(Point2) -> bool,
    ) -> InteractionMode {
        if self.mode == InteractionMode::RotatingModel {
            return self.mode;
        }
        self.mode = if button == PointerButton::Primary && hits_model(pos) {
            InteractionMode::RotatingModel
        } else {
            InteractionMode::Orbiting
        };
        self.button = Some(button);
        self.last = Some(pos);
        self.mode
    }

    pub fn pointer_move(&mut self, pos: Point2) -> DragAction {
        let Some(last) = self.last.replace(pos) else {
            return DragAction::None;
        };
        let Some(button) = self.button else {
            return DragAction::None;
        };
        let delta = pos - last;
        match (self.mode, button) {
            (InteractionMode::RotatingModel, _) => DragAction::Spin(delta.x),
            (InteractionMode::Orbiting, PointerButton::Primary) => DragAction::Orbit(delta),
            (InteractionMode::Orbiting, _) => DragAction::Pan(delta),
            (InteractionMode::Idle, _) => DragAction::None,
        }
    }

    /// Pointer up or leave. Always hands the pointer back to the orbit camera.
    pub fn release(&mut self) -> InteractionMode {
        self.mode = InteractionMode::Orbiting;
        self.button = None;
        self.last = None;
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::ui::pos2;

    #[test]
    fn hit_enters_model_rotation() {
        let mut machine = InteractionMachine::new();
        assert_eq!(machine.mode(), InteractionMode::Idle);
        let mode = machine.pointer_down(pos2(10.0, 10.0), PointerButton::Primary, |_| true);
        assert_eq!(mode, InteractionMode::RotatingModel);
        assert!(!machine.orbit_enabled());
        assert_eq!(machine.pointer_move(pos2(25.0, 40.0)), DragAction::Spin(15.0));
        assert_eq!(machine.release(), InteractionMode::Orbiting);
        assert!(machine.orbit_enabled());
    }

    #[test]
    fn miss_orbits_and_secondary_pans() {
        let mut machine = InteractionMachine::new();
        machine.pointer_down(pos2(0.0, 0.0), PointerButton::Primary, |_| false);
        assert_eq!(machine.mode(), InteractionMode::Orbiting);
        assert!(machine.orbit_enabled());
        assert_eq!(machine.pointer_move(pos2(3.0, 4.0)), DragAction::Orbit(Vec2::new(3.0, 4.0)));
        machine.release();

        let mut asked = false;
        machine.pointer_down(pos2(0.0, 0.0), PointerButton::Secondary, |_| {
            asked = true;
            true
        });
        assert!(!asked);
        assert_eq!(machine.pointer_move(pos2(-2.0, 0.0)), DragAction::Pan(Vec2::new(-2.0, 0.0)));
    }

    #[test]
    fn press_during_model_drag_is_ignored() {
        let mut machine = InteractionMachine::new();
        machine.pointer_down(pos2(0.0, 0.0), PointerButton::Primary, |_| true);
        let mode = machine.pointer_down(pos2(5.0, 5.0), PointerButton::Primary, |_| false);
        assert_eq!(mode, InteractionMode::RotatingModel);
        assert_eq!(machine.pointer_move(pos2(9.0, 0.0)), DragAction::Spin(9.0));
    }

    #[test]
    fn moves_without_a_press_do_nothing() {
        let mut machine = InteractionMachine::new();
        assert_eq!(machine.pointer_move(pos2(1.0, 1.0)), DragAction::None);
        assert_eq!(machine.pointer_move(pos2(2.0, 1.0)), DragAction::None);
        assert_eq!(machine.release(), InteractionMode::Orbiting);
    }
}
