use glam::{EulerRot, Mat4, Quat, Vec3};

/// Orientation held in exactly one representation at a time. Switching modes
/// converts from the current value, so the two forms can never drift apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rotation {
    Euler(Vec3),
    Quaternion(Quat),
}

impl Rotation {
    pub fn identity() -> Self {
        Rotation::Euler(Vec3::ZERO)
    }

    pub fn is_quaternion(&self) -> bool {
        matches!(self, Rotation::Quaternion(_))
    }

    /// Flip between Euler and quaternion, converting the current value once.
    pub fn toggle_representation(&mut self) {
        *self = match *self {
            Rotation::Euler(e) => {
                Rotation::Quaternion(Quat::from_euler(EulerRot::XYZ, e.x, e.y, e.z))
            }
            Rotation::Quaternion(q) => {
                let (x, y, z) = q.to_euler(EulerRot::XYZ);
                Rotation::Euler(Vec3::new(x, y, z))
            }
        };
    }

    pub fn as_quat(&self) -> Quat {
        match *self {
            Rotation::Euler(e) => Quat::from_euler(EulerRot::XYZ, e.x, e.y, e.z),
            Rotation::Quaternion(q) => q,
        }
    }

    /// Advance by an angular step without leaving the active representation.
    pub fn advance(&mut self, step: Vec3) {
        match self {
            Rotation::Euler(e) => *e += step,
            Rotation::Quaternion(q) => {
                *q = (*q * Quat::from_euler(EulerRot::XYZ, step.x, step.y, step.z)).normalize();
            }
        }
    }
}

/// Interactive scene state: everything the key bindings mutate and the
/// per-frame uniform upload reads.
#[derive(Debug, Clone, Copy)]
pub struct TransformState {
    pub light_pos: Vec3,
    pub rotation: Rotation,
    pub rotation_rate: Vec3,
    pub scale: Vec3,
    pub translation: Vec3,
    pub step_multiplier: f32,
    pub fade: f32,
    pub use_textures: bool,
    pub paused: bool,
}

impl TransformState {
    pub fn new() -> Self {
        Self {
            light_pos: Vec3::ZERO,
            rotation: Rotation::identity(),
            rotation_rate: Vec3::ZERO,
            scale: Vec3::ONE,
            translation: Vec3::ZERO,
            step_multiplier: 1.0,
            fade: 50.0,
            use_textures: true,
            paused: false,
        }
    }

    /// Return the transform to its defaults. Light position, fade, and the
    /// texture flag are deliberately left where the user put them.
    pub fn reset(&mut self) {
        self.rotation_rate = Vec3::ZERO;
        self.scale = Vec3::ONE;
        self.translation = Vec3::ZERO;
        self.rotation = Rotation::identity();
        self.step_multiplier = 1.0;
    }

    /// Tumbling showcase preset. Leaves the step multiplier alone.
    pub fn apply_tumble_preset(&mut self) {
        self.rotation_rate = 50.0 * Vec3::splat(std::f32::consts::PI / 64.0);
        self.scale = Vec3::new(2.0, 0.5, 0.2);
        self.translation = Vec3::ZERO;
        self.rotation = Rotation::identity();
    }

    /// Spin by `rotation_rate * delta` unless paused.
    pub fn advance_rotation(&mut self, delta: f32) {
        if !self.paused {
            self.rotation.advance(self.rotation_rate * delta);
        }
    }

    /// Model matrix composed as translate ∘ scale ∘ rotate, in that order.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.translation)
            * Mat4::from_scale(self.scale)
            * Mat4::from_quat(self.rotation.as_quat())
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::new()
    }
}

/// Which parts of the scene get drawn. Flipped by debounced keys.
#[derive(Debug, Clone, Copy)]
pub struct ViewToggles {
    pub draw_heightmap: bool,
    pub draw_boxes: bool,
    pub draw_normals: bool,
}

impl ViewToggles {
    pub fn new() -> Self {
        Self {
            draw_heightmap: false,
            draw_boxes: true,
            draw_normals: false,
        }
    }
}

impl Default for ViewToggles {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = TransformState::new();
        assert_eq!(state.light_pos, Vec3::ZERO);
        assert_eq!(state.rotation_rate, Vec3::ZERO);
        assert_eq!(state.scale, Vec3::ONE);
        assert_eq!(state.translation, Vec3::ZERO);
        assert_eq!(state.rotation, Rotation::identity());
        assert_eq!(state.step_multiplier, 1.0);
        assert_eq!(state.fade, 50.0);
        assert!(state.use_textures);
        assert!(!state.paused);
    }

    #[test]
    fn test_reset_restores_documented_defaults() {
        let mut state = TransformState::new();
        state.rotation_rate = Vec3::new(1.0, 2.0, 3.0);
        state.scale = Vec3::splat(4.0);
        state.translation = Vec3::new(-1.0, 0.5, 9.0);
        state.rotation = Rotation::Quaternion(Quat::from_rotation_y(1.2));
        state.step_multiplier = 2.5;
        state.fade = 12.0;
        state.light_pos = Vec3::new(0.5, 0.5, 0.5);

        state.reset();

        assert_eq!(state.rotation_rate, Vec3::ZERO);
        assert_eq!(state.scale, Vec3::ONE);
        assert_eq!(state.translation, Vec3::ZERO);
        assert_eq!(state.rotation, Rotation::identity());
        assert_eq!(state.step_multiplier, 1.0);
        // reset does not touch these
        assert_eq!(state.fade, 12.0);
        assert_eq!(state.light_pos, Vec3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_tumble_preset_keeps_step_multiplier() {
        let mut state = TransformState::new();
        state.step_multiplier = 3.0;
        state.apply_tumble_preset();

        let expected_rate = 50.0 * std::f32::consts::PI / 64.0;
        assert!((state.rotation_rate - Vec3::splat(expected_rate)).length() < 1e-5);
        assert_eq!(state.scale, Vec3::new(2.0, 0.5, 0.2));
        assert_eq!(state.translation, Vec3::ZERO);
        assert_eq!(state.rotation, Rotation::identity());
        assert_eq!(state.step_multiplier, 3.0, "preset must not reset the multiplier");
    }

    #[test]
    fn test_representation_round_trip() {
        // Angles away from the gimbal singularity survive the round trip
        let start = Vec3::new(0.3, 0.5, -0.7);
        let mut rotation = Rotation::Euler(start);
        rotation.toggle_representation();
        assert!(rotation.is_quaternion());
        rotation.toggle_representation();

        match rotation {
            Rotation::Euler(e) => {
                assert!((e - start).length() < 1e-5, "round trip drifted: {e:?} vs {start:?}");
            }
            Rotation::Quaternion(_) => panic!("expected Euler after two toggles"),
        }
    }

    #[test]
    fn test_round_trip_preserves_orientation() {
        // Even when the Euler triple re-wraps, the orientation must match
        let q = Quat::from_euler(EulerRot::XYZ, 1.0, 0.2, 2.5);
        let mut rotation = Rotation::Quaternion(q);
        rotation.toggle_representation();
        rotation.toggle_representation();
        let back = rotation.as_quat();
        // q and -q are the same orientation
        assert!((back.dot(q).abs() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_advance_respects_pause() {
        let mut state = TransformState::new();
        state.rotation_rate = Vec3::new(0.0, 1.0, 0.0);
        state.paused = true;
        state.advance_rotation(0.5);
        assert_eq!(state.rotation, Rotation::identity());

        state.paused = false;
        state.advance_rotation(0.5);
        assert_eq!(state.rotation, Rotation::Euler(Vec3::new(0.0, 0.5, 0.0)));
    }

    #[test]
    fn test_quaternion_advance_stays_normalized() {
        let mut rotation = Rotation::Quaternion(Quat::IDENTITY);
        for _ in 0..1000 {
            rotation.advance(Vec3::new(0.01, 0.02, -0.015));
        }
        let q = rotation.as_quat();
        assert!((q.length() - 1.0).abs() < 1e-4, "length drifted to {}", q.length());
    }

    #[test]
    fn test_model_matrix_composition_order() {
        let mut state = TransformState::new();
        state.translation = Vec3::new(1.0, 0.0, 0.0);
        state.scale = Vec3::splat(2.0);

        // translate(scale(p)): (1,0,0) -> (2,0,0) -> (3,0,0)
        let p = state.model_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-6, "got {p:?}");
    }
}
