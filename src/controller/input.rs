use std::collections::HashSet;

use tracing::{debug, info};
use winit::keyboard::KeyCode;

use crate::frame_clock::FrameClock;
use crate::model::transform::{TransformState, ViewToggles};

/// Debounced toggles share one cooldown: accepting any of them blocks the
/// whole set for this long.
pub const TOGGLE_COOLDOWN: f32 = 0.5;

const LIGHT_NUDGE: f32 = 0.02;
const FADE_STEP: f32 = 0.1;
const STEP_RATIO: f32 = 1.01;

/// Raw per-frame input: which keys are down plus accumulated mouse deltas.
/// The window event handler feeds this; consumers drain it once per frame.
pub struct InputState {
    pub pressed_keys: HashSet<KeyCode>,
    pub look_delta: (f32, f32),
    pub scroll_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            pressed_keys: HashSet::new(),
            look_delta: (0.0, 0.0),
            scroll_delta: 0.0,
        }
    }

    pub fn key_down(&mut self, code: KeyCode) {
        self.pressed_keys.insert(code);
    }

    pub fn key_up(&mut self, code: KeyCode) {
        self.pressed_keys.remove(&code);
    }

    pub fn pressed(&self, code: KeyCode) -> bool {
        self.pressed_keys.contains(&code)
    }

    pub fn add_look(&mut self, dx: f32, dy: f32) {
        self.look_delta.0 += dx;
        self.look_delta.1 += dy;
    }

    pub fn add_scroll(&mut self, dy: f32) {
        self.scroll_delta += dy;
    }

    pub fn consume_look(&mut self) -> (f32, f32) {
        let result = self.look_delta;
        self.look_delta = (0.0, 0.0);
        result
    }

    pub fn consume_scroll(&mut self) -> f32 {
        let result = self.scroll_delta;
        self.scroll_delta = 0.0;
        result
    }

    /// Drop all held keys, e.g. when the window loses focus and the matching
    /// key-up events will never arrive.
    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

/// Key mapping configuration
#[derive(Clone)]
pub struct KeyBindings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub light_x_up: KeyCode,
    pub light_y_up: KeyCode,
    pub light_z_up: KeyCode,
    pub light_x_down: KeyCode,
    pub light_y_down: KeyCode,
    pub light_z_down: KeyCode,
    pub fade_down: KeyCode,
    pub fade_up: KeyCode,
    pub step_up: KeyCode,
    pub step_down: KeyCode,
    pub toggle_heightmap: KeyCode,
    pub toggle_boxes: KeyCode,
    pub toggle_normals: KeyCode,
    pub toggle_rotation_mode: KeyCode,
    pub reset: KeyCode,
    pub tumble_preset: KeyCode,
    pub print_status: KeyCode,
    pub pause: KeyCode,
    pub texture_toggle: KeyCode,
    pub quit: KeyCode,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            backward: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            light_x_up: KeyCode::KeyU,
            light_y_up: KeyCode::KeyI,
            light_z_up: KeyCode::KeyO,
            light_x_down: KeyCode::KeyJ,
            light_y_down: KeyCode::KeyK,
            light_z_down: KeyCode::KeyL,
            fade_down: KeyCode::KeyZ,
            fade_up: KeyCode::KeyC,
            step_up: KeyCode::Comma,
            step_down: KeyCode::Period,
            toggle_heightmap: KeyCode::KeyH,
            toggle_boxes: KeyCode::KeyB,
            toggle_normals: KeyCode::KeyN,
            toggle_rotation_mode: KeyCode::KeyQ,
            reset: KeyCode::KeyG,
            tumble_preset: KeyCode::KeyE,
            print_status: KeyCode::KeyP,
            pause: KeyCode::Space,
            texture_toggle: KeyCode::KeyT,
            quit: KeyCode::Escape,
        }
    }
}

/// Turns polled key state into transform-state mutations. Holds the shared
/// debounce timestamp and the texture-toggle release latch between frames.
pub struct InputMapper {
    pub bindings: KeyBindings,
    last_toggle: Option<f32>,
    wait_for_release: bool,
}

impl InputMapper {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            last_toggle: None,
            wait_for_release: false,
        }
    }

    /// Apply one frame of input to the scene state. Returns true when the
    /// quit key asks the main loop to close the window.
    pub fn apply(
        &mut self,
        input: &InputState,
        clock: &FrameClock,
        state: &mut TransformState,
        toggles: &mut ViewToggles,
    ) -> bool {
        let b = self.bindings.clone();
        let quit = input.pressed(b.quit);

        // Step multiplier scales the camera step; ratio applied per held frame
        if input.pressed(b.step_up) {
            state.step_multiplier *= STEP_RATIO;
        }
        if input.pressed(b.step_down) {
            state.step_multiplier /= STEP_RATIO;
        }
        if input.pressed(b.step_up) || input.pressed(b.step_down) {
            debug!(
                "step: {:.5}  multiplier: {:.4}  frame rate: {:.5}",
                clock.delta * state.step_multiplier,
                state.step_multiplier,
                clock.rate
            );
        }

        self.apply_toggles(input, clock.elapsed, state, toggles);

        // Light position nudges, fixed step per held frame
        if input.pressed(b.light_x_up) {
            state.light_pos.x += LIGHT_NUDGE;
        }
        if input.pressed(b.light_y_up) {
            state.light_pos.y += LIGHT_NUDGE;
        }
        if input.pressed(b.light_z_up) {
            state.light_pos.z += LIGHT_NUDGE;
        }
        if input.pressed(b.light_x_down) {
            state.light_pos.x -= LIGHT_NUDGE;
        }
        if input.pressed(b.light_y_down) {
            state.light_pos.y -= LIGHT_NUDGE;
        }
        if input.pressed(b.light_z_down) {
            state.light_pos.z -= LIGHT_NUDGE;
        }

        if input.pressed(b.fade_down) {
            state.fade -= FADE_STEP;
        }
        if input.pressed(b.fade_up) {
            state.fade += FADE_STEP;
        }

        // Texture toggle actuates on release: arm on press, commit on key-up
        if input.pressed(b.texture_toggle) {
            self.wait_for_release = true;
        } else if self.wait_for_release {
            state.use_textures = !state.use_textures;
            self.wait_for_release = false;
            info!(use_textures = state.use_textures, "texture sampling toggled");
        }

        quit
    }

    /// Edge-triggered toggles behind the shared cooldown.
    fn apply_toggles(
        &mut self,
        input: &InputState,
        now: f32,
        state: &mut TransformState,
        toggles: &mut ViewToggles,
    ) {
        let b = &self.bindings;
        let any_pressed = input.pressed(b.toggle_heightmap)
            || input.pressed(b.toggle_boxes)
            || input.pressed(b.toggle_normals)
            || input.pressed(b.toggle_rotation_mode)
            || input.pressed(b.reset)
            || input.pressed(b.tumble_preset)
            || input.pressed(b.print_status)
            || input.pressed(b.pause);

        let cooled_down = match self.last_toggle {
            None => true,
            Some(t) => now - t > TOGGLE_COOLDOWN,
        };
        if !(any_pressed && cooled_down) {
            return;
        }

        if input.pressed(b.toggle_heightmap) {
            toggles.draw_heightmap = !toggles.draw_heightmap;
            info!(draw_heightmap = toggles.draw_heightmap, "toggled heightmap");
        }
        if input.pressed(b.toggle_boxes) {
            toggles.draw_boxes = !toggles.draw_boxes;
            info!(draw_boxes = toggles.draw_boxes, "toggled box grid");
        }
        if input.pressed(b.toggle_normals) {
            toggles.draw_normals = !toggles.draw_normals;
            info!(draw_normals = toggles.draw_normals, "toggled normals view");
        }
        if input.pressed(b.toggle_rotation_mode) {
            state.rotation.toggle_representation();
            if state.rotation.is_quaternion() {
                info!("using quaternions");
            } else {
                info!("not using quaternions");
            }
        }
        if input.pressed(b.reset) {
            state.reset();
            info!("transform reset to defaults");
        }
        if input.pressed(b.tumble_preset) {
            state.apply_tumble_preset();
            info!("tumble preset applied");
        }
        if input.pressed(b.print_status) {
            info!(
                "light position: ({:.3}, {:.3}, {:.3})",
                state.light_pos.x, state.light_pos.y, state.light_pos.z
            );
        }
        if input.pressed(b.pause) {
            state.paused = !state.paused;
            info!(paused = state.paused, "rotation pause toggled");
        }

        self.last_toggle = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    struct Rig {
        input: InputState,
        clock: FrameClock,
        state: TransformState,
        toggles: ViewToggles,
        mapper: InputMapper,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                input: InputState::new(),
                clock: FrameClock::new(),
                state: TransformState::new(),
                toggles: ViewToggles::new(),
                mapper: InputMapper::new(KeyBindings::default()),
            }
        }

        fn apply(&mut self) -> bool {
            self.mapper
                .apply(&self.input, &self.clock, &mut self.state, &mut self.toggles)
        }
    }

    #[test]
    fn test_debounce_window() {
        let mut rig = Rig::new();
        rig.input.key_down(KeyCode::KeyH);

        // t = 0.0: first press accepted
        rig.apply();
        assert!(rig.toggles.draw_heightmap, "first press must flip");

        // t = 0.3: still inside the cooldown
        rig.clock.advance(0.3);
        rig.apply();
        assert!(rig.toggles.draw_heightmap, "press at 0.3s must be ignored");

        // t = 0.6: cooldown expired
        rig.clock.advance(0.3);
        rig.apply();
        assert!(!rig.toggles.draw_heightmap, "press at 0.6s must flip again");
    }

    #[test]
    fn test_cooldown_is_shared_across_toggles() {
        let mut rig = Rig::new();

        rig.input.key_down(KeyCode::KeyH);
        rig.apply();
        rig.input.key_up(KeyCode::KeyH);
        assert!(rig.toggles.draw_heightmap);

        // A different toggle key inside the window is blocked too
        rig.clock.advance(0.3);
        rig.input.key_down(KeyCode::KeyB);
        rig.apply();
        assert!(rig.toggles.draw_boxes, "B at 0.3s after H must be blocked");

        rig.clock.advance(0.3);
        rig.apply();
        assert!(!rig.toggles.draw_boxes, "B accepted once the shared window expires");
    }

    #[test]
    fn test_texture_latch_flips_on_release_only() {
        let mut rig = Rig::new();
        assert!(rig.state.use_textures);

        // Held across several frames: no flip yet
        rig.input.key_down(KeyCode::KeyT);
        rig.apply();
        rig.clock.advance(0.1);
        rig.apply();
        assert!(rig.state.use_textures, "holding must not actuate");

        // Release commits exactly once
        rig.input.key_up(KeyCode::KeyT);
        rig.clock.advance(0.1);
        rig.apply();
        assert!(!rig.state.use_textures, "release must flip");

        rig.clock.advance(0.1);
        rig.apply();
        assert!(!rig.state.use_textures, "no further flips without a new press");

        // Second press/release pair flips back
        rig.input.key_down(KeyCode::KeyT);
        rig.apply();
        rig.input.key_up(KeyCode::KeyT);
        rig.apply();
        assert!(rig.state.use_textures);
    }

    #[test]
    fn test_escape_requests_quit() {
        let mut rig = Rig::new();
        assert!(!rig.apply());
        rig.input.key_down(KeyCode::Escape);
        assert!(rig.apply());
    }

    #[test]
    fn test_light_nudges() {
        let mut rig = Rig::new();
        rig.input.key_down(KeyCode::KeyU);
        rig.input.key_down(KeyCode::KeyK);
        rig.apply();
        rig.apply();
        assert!((rig.state.light_pos - Vec3::new(0.04, -0.04, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_fade_steps() {
        let mut rig = Rig::new();
        rig.input.key_down(KeyCode::KeyZ);
        rig.apply();
        assert!((rig.state.fade - 49.9).abs() < 1e-5);

        rig.input.key_up(KeyCode::KeyZ);
        rig.input.key_down(KeyCode::KeyC);
        rig.apply();
        rig.apply();
        assert!((rig.state.fade - 50.1).abs() < 1e-4);
    }

    #[test]
    fn test_step_multiplier_ratio() {
        let mut rig = Rig::new();
        rig.input.key_down(KeyCode::Comma);
        rig.apply();
        assert!((rig.state.step_multiplier - 1.01).abs() < 1e-6);

        rig.input.key_up(KeyCode::Comma);
        rig.input.key_down(KeyCode::Period);
        rig.apply();
        assert!((rig.state.step_multiplier - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_mode_switch() {
        let mut rig = Rig::new();
        rig.input.key_down(KeyCode::KeyQ);
        rig.apply();
        assert!(rig.state.rotation.is_quaternion());

        rig.clock.advance(0.6);
        rig.apply();
        assert!(!rig.state.rotation.is_quaternion(), "second Q switches back");
    }

    #[test]
    fn test_pause_toggle() {
        let mut rig = Rig::new();
        rig.input.key_down(KeyCode::Space);
        rig.apply();
        assert!(rig.state.paused);
    }

    #[test]
    fn test_reset_via_key() {
        let mut rig = Rig::new();
        rig.state.scale = Vec3::splat(9.0);
        rig.state.step_multiplier = 4.0;
        rig.input.key_down(KeyCode::KeyG);
        rig.apply();
        assert_eq!(rig.state.scale, Vec3::ONE);
        assert_eq!(rig.state.step_multiplier, 1.0);
    }

    #[test]
    fn test_focus_loss_clears_keys() {
        let mut input = InputState::new();
        input.key_down(KeyCode::KeyW);
        input.key_down(KeyCode::KeyU);
        input.clear_keys();
        assert!(!input.pressed(KeyCode::KeyW));
        assert!(!input.pressed(KeyCode::KeyU));
    }

    #[test]
    fn test_look_and_scroll_consume_once() {
        let mut input = InputState::new();
        input.add_look(3.0, -2.0);
        input.add_look(1.0, 1.0);
        input.add_scroll(2.5);

        assert_eq!(input.consume_look(), (4.0, -1.0));
        assert_eq!(input.consume_look(), (0.0, 0.0));
        assert_eq!(input.consume_scroll(), 2.5);
        assert_eq!(input.consume_scroll(), 0.0);
    }
}
