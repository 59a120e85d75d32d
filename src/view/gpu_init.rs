use std::sync::Arc;

use tracing::info;
use wgpu::Device;
use winit::window::Window;

/// Device, queue and configured surface for one window.
pub struct GpuContext {
    pub device: Arc<Device>,
    pub queue: Arc<wgpu::Queue>,
    pub surface: wgpu::Surface<'static>,
    pub format: wgpu::TextureFormat,
    pub config: wgpu::SurfaceConfiguration,
}

async fn init_device_and_queue(
    adapter: &wgpu::Adapter,
    features: wgpu::Features,
) -> (Arc<Device>, Arc<wgpu::Queue>) {
    let adapter_limits = adapter.limits();
    let limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter_limits);

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("device"),
            required_features: features,
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            trace: wgpu::Trace::default(),
        })
        .await
        .expect("Failed to request device");

    (Arc::new(device), Arc::new(queue))
}

/// Pick an sRGB surface format where available and configure for vsync.
fn configure_surface(
    device: &Device,
    adapter: &wgpu::Adapter,
    surface: &wgpu::Surface,
    width: u32,
    height: u32,
) -> (wgpu::TextureFormat, wgpu::SurfaceConfiguration) {
    let caps = surface.get_capabilities(adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(|f| f.is_srgb())
        .unwrap_or(caps.formats[0]);

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width,
        height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(device, &config);

    (format, config)
}

impl GpuContext {
    /// Initialize the GPU for a window surface. Failure to come up with a
    /// working device is fatal this early; the panic hook reports it.
    pub async fn new(window: Arc<Window>, width: u32, height: u32) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .expect("Failed to create surface");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .expect("Failed to find adapter");

        info!("adapter: {}", adapter.get_info().name);

        // The environment map is Rgba32Float behind a filtering sampler
        let (device, queue) =
            init_device_and_queue(&adapter, wgpu::Features::FLOAT32_FILTERABLE).await;

        let (format, config) = configure_surface(&device, &adapter, &surface, width, height);

        GpuContext {
            device,
            queue,
            surface,
            format,
            config,
        }
    }
}
