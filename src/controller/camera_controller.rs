use glam::Vec3;

use crate::controller::input::{InputState, KeyBindings};
use crate::model::Camera;

/// Handles camera movement, mouse look, and scroll zoom
pub struct CameraController {
    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    pub zoom_speed: f32,
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            move_speed: 2.5,
            mouse_sensitivity: 0.002,
            zoom_speed: 1.0,
        }
    }

    /// Apply mouse look delta to camera
    pub fn apply_look(&self, camera: &mut Camera, dx: f32, dy: f32) {
        camera.yaw += dx * self.mouse_sensitivity;
        let pi_half = std::f32::consts::PI / 2.0;
        camera.pitch = (camera.pitch - dy * self.mouse_sensitivity).clamp(-pi_half, pi_half);
    }

    /// Move the camera along its forward/right axes. `step` is the frame
    /// delta already scaled by the step multiplier.
    pub fn update_movement(
        &self,
        camera: &mut Camera,
        input: &InputState,
        bindings: &KeyBindings,
        step: f32,
    ) {
        let mut cam_move = Vec3::ZERO;
        let speed = self.move_speed * step;

        if input.pressed(bindings.forward) {
            cam_move += camera.forward();
        }
        if input.pressed(bindings.backward) {
            cam_move -= camera.forward();
        }

        let cam_right = camera.forward().cross(camera.up).normalize();
        if input.pressed(bindings.left) {
            cam_move -= cam_right;
        }
        if input.pressed(bindings.right) {
            cam_move += cam_right;
        }

        if cam_move.length_squared() > 0.0 {
            camera.eye += cam_move.normalize() * speed;
        }
    }

    /// Scroll adjusts the field of view, clamped between 1 and 45 degrees.
    pub fn apply_zoom(&self, camera: &mut Camera, scroll: f32) {
        let degrees = camera.fov_y.to_degrees() - scroll * self.zoom_speed;
        camera.fov_y = degrees.clamp(1.0, 45.0).to_radians();
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}
