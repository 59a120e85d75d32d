// CONTROLLER: input handling and camera movement
pub mod input;
pub mod camera_controller;

pub use input::{InputMapper, InputState, KeyBindings};
pub use camera_controller::CameraController;
