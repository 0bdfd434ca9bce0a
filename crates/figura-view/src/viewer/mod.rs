pub mod camera;
pub mod clock;
pub mod engine;
pub mod events;
pub mod gpu;
pub mod input;
pub mod interaction;
pub mod library;
pub mod loader;
pub mod model;
pub mod overlay;
pub mod particles;
pub mod ruler;
pub mod skeleton;
pub mod ui;
pub mod wireframe;
