use std::sync::Arc;

use tracing::{error, warn};
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    window::{CursorGrabMode, Window},
};

use skylit::frame_clock::FrameClock;
use skylit::{controller, logging, model, view};

use controller::{CameraController, InputMapper, InputState, KeyBindings};
use model::{Camera, Scene, TransformState, ViewToggles};
use view::{GpuContext, Renderer};

struct App {
    // Core GPU resources
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    window: Arc<Window>,

    renderer: Renderer,
    scene: Scene,

    // Interactive state
    camera: Camera,
    transform: TransformState,
    toggles: ViewToggles,
    clock: FrameClock,
    input_state: InputState,
    input_mapper: InputMapper,
    camera_controller: CameraController,

    title_timer: f32,
}

impl App {
    async fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let gpu = GpuContext::new(window.clone(), size.width, size.height).await;
        let device = gpu.device.clone();
        let queue = gpu.queue.clone();
        let config = gpu.config.clone();

        let renderer = Renderer::new(&device, &config);

        let transform = TransformState::new();
        let scene = match Scene::new(&device, &queue, &renderer, &transform) {
            Ok(scene) => scene,
            Err(e) => {
                error!("scene assets failed to load: {e}");
                std::process::exit(1);
            }
        };

        let camera = Camera::new(size.width, size.height);

        Self {
            surface: gpu.surface,
            device,
            queue,
            config,
            size,
            window,
            renderer,
            scene,
            camera,
            transform,
            toggles: ViewToggles::new(),
            clock: FrameClock::new(),
            input_state: InputState::new(),
            input_mapper: InputMapper::new(KeyBindings::default()),
            camera_controller: CameraController::new(),
            title_timer: 0.0,
        }
    }

    fn input(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent { state, physical_key, .. },
                ..
            } => {
                if let PhysicalKey::Code(code) = physical_key {
                    match state {
                        ElementState::Pressed => self.input_state.key_down(*code),
                        ElementState::Released => self.input_state.key_up(*code),
                    }
                }
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                };
                self.input_state.add_scroll(dy);
                true
            }
            WindowEvent::Focused(false) => {
                // Key-up events for held keys never arrive after focus loss
                self.input_state.clear_keys();
                true
            }
            _ => false,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.renderer.resize(&self.device, new_size.width, new_size.height);
            self.camera.set_aspect(new_size.width, new_size.height);
        }
    }

    fn handle_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.input_state.add_look(dx as f32, dy as f32);
    }

    /// One simulation step. Returns true when the quit key fired.
    fn update(&mut self) -> bool {
        self.clock.tick();

        let quit = self.input_mapper.apply(
            &self.input_state,
            &self.clock,
            &mut self.transform,
            &mut self.toggles,
        );

        let (dx, dy) = self.input_state.consume_look();
        if dx != 0.0 || dy != 0.0 {
            self.camera_controller.apply_look(&mut self.camera, dx, dy);
        }
        let scroll = self.input_state.consume_scroll();
        if scroll != 0.0 {
            self.camera_controller.apply_zoom(&mut self.camera, scroll);
        }

        let step = self.clock.delta * self.transform.step_multiplier;
        self.camera_controller.update_movement(
            &mut self.camera,
            &self.input_state,
            &self.input_mapper.bindings,
            step,
        );

        self.transform.advance_rotation(self.clock.delta);

        self.title_timer += self.clock.delta;
        if self.title_timer >= 1.0 {
            self.window
                .set_title(&format!("skylit ({:.0} fps)", self.clock.rate));
            self.title_timer = 0.0;
        }

        quit
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.renderer.render(
            &self.device,
            &self.queue,
            &self.surface,
            &self.scene,
            &self.camera,
            &self.transform,
            &self.toggles,
        )
    }
}

fn main() {
    logging::init();

    let event_loop = EventLoop::new().unwrap();
    let window_attributes = Window::default_attributes()
        .with_title("skylit")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    let window = event_loop.create_window(window_attributes).unwrap();
    let window = Arc::new(window);

    // Pointer-lock style mouse look for the whole session; Locked is not
    // available everywhere, Confined is the fallback
    if window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined))
        .is_err()
    {
        warn!("cursor grab unavailable; mouse look may escape the window");
    }
    window.set_cursor_visible(false);

    let mut app = pollster::block_on(App::new(window.clone()));

    event_loop
        .run(move |event, elwt| {
            match event {
                Event::WindowEvent {
                    ref event,
                    window_id,
                } if window_id == app.window.id() => {
                    if !app.input(event) {
                        match event {
                            WindowEvent::CloseRequested => elwt.exit(),
                            WindowEvent::Resized(physical_size) => {
                                app.resize(*physical_size);
                            }
                            WindowEvent::RedrawRequested => {
                                if app.update() {
                                    elwt.exit();
                                    return;
                                }

                                match app.render() {
                                    Ok(_) => {}
                                    Err(wgpu::SurfaceError::Lost) => app.resize(app.size),
                                    Err(wgpu::SurfaceError::OutOfMemory) => {
                                        error!("surface out of memory");
                                        elwt.exit();
                                    }
                                    // Outdated/Timeout: skip the frame, the
                                    // next acquire usually succeeds
                                    Err(e) => warn!("frame skipped: {e:?}"),
                                }
                            }
                            _ => {}
                        }
                    }
                }
                Event::DeviceEvent {
                    event: winit::event::DeviceEvent::MouseMotion { delta },
                    ..
                } => {
                    app.handle_mouse_motion(delta.0, delta.1);
                }
                Event::AboutToWait => {
                    app.window.request_redraw();
                }
                _ => {}
            }
        })
        .unwrap();
}
