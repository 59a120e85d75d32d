use glam::{Mat4, Vec3};

use crate::model::scene::{Scene, FIXED_LIGHT_POSITIONS, LIGHT_COLOR};
use crate::model::transform::{TransformState, ViewToggles};
use crate::model::Camera;
use crate::utils::Vertex;

/// Per-frame camera and display parameters, group 0 binding 0.
/// Field order and padding mirror the WGSL struct.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub fade: f32,
    pub use_textures: u32,
    pub draw_normals: u32,
    pub _pad: [u32; 2],
}

impl FrameUniform {
    pub fn new(camera: &Camera, state: &TransformState, toggles: &ViewToggles) -> Self {
        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            projection: camera.projection_matrix().to_cols_array_2d(),
            camera_pos: camera.eye.to_array(),
            fade: state.fade,
            use_textures: state.use_textures as u32,
            draw_normals: toggles.draw_normals as u32,
            _pad: [0; 2],
        }
    }
}

/// Four point lights, group 0 binding 1. Slot 0 is the movable light, the
/// rest stay at their fixed scene positions. vec4 slots keep WGSL array
/// strides trivial.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    pub positions: [[f32; 4]; 4],
    pub colors: [[f32; 4]; 4],
}

impl LightsUniform {
    pub fn new(movable: Vec3) -> Self {
        let mut positions = [[0.0; 4]; 4];
        positions[0] = [movable.x, movable.y, movable.z, 1.0];
        for (slot, pos) in positions[1..].iter_mut().zip(FIXED_LIGHT_POSITIONS) {
            *slot = [pos.x, pos.y, pos.z, 1.0];
        }
        Self {
            positions,
            colors: [[LIGHT_COLOR.x, LIGHT_COLOR.y, LIGHT_COLOR.z, 1.0]; 4],
        }
    }
}

/// Per-object model matrix plus the scalar material factors used when the
/// texture set is switched off. Group 2 binding 0.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub roughness: f32,
    pub metalness: f32,
    pub _pad: [f32; 2],
}

impl ObjectUniform {
    pub fn new(model: Mat4, roughness: f32, metalness: f32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            roughness,
            metalness,
            _pad: [0.0; 2],
        }
    }
}

/// Projection times the translation-stripped view, for the skybox pass.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SkyUniform {
    pub proj_view: [[f32; 4]; 4],
}

impl SkyUniform {
    pub fn new(camera: &Camera) -> Self {
        Self {
            proj_view: (camera.projection_matrix() * camera.rotation_view()).to_cols_array_2d(),
        }
    }
}

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Owns the pipelines, the shared per-frame GPU buffers and the depth
/// attachment. Scene-owned resources (meshes, material textures, object
/// slots) bind against the layouts exposed here.
pub struct Renderer {
    pbr_pipeline: wgpu::RenderPipeline,
    sky_pipeline: wgpu::RenderPipeline,

    frame_buffer: wgpu::Buffer,
    lights_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    sky_buffer: wgpu::Buffer,
    sky_bind_group: wgpu::BindGroup,

    pub material_layout: wgpu::BindGroupLayout,
    pub object_layout: wgpu::BindGroupLayout,
    pub sky_texture_layout: wgpu::BindGroupLayout,

    depth_view: wgpu::TextureView,
}

impl Renderer {
    pub fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> Self {
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_buffer"),
            size: std::mem::size_of::<FrameUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let lights_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("lights_buffer"),
            size: std::mem::size_of::<LightsUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let sky_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("sky_buffer"),
            size: std::mem::size_of::<SkyUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_layout = create_frame_layout(device);
        let material_layout = create_material_layout(device);
        let object_layout = create_object_layout(device);
        let sky_uniform_layout = create_sky_uniform_layout(device);
        let sky_texture_layout = create_sky_texture_layout(device);

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &frame_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: lights_buffer.as_entire_binding() },
            ],
        });
        let sky_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sky_bind_group"),
            layout: &sky_uniform_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: sky_buffer.as_entire_binding() }],
        });

        let pbr_pipeline = create_pbr_pipeline(
            device,
            config.format,
            &frame_layout,
            &material_layout,
            &object_layout,
        );
        let sky_pipeline = create_sky_pipeline(
            device,
            config.format,
            &sky_uniform_layout,
            &sky_texture_layout,
        );

        let (_, depth_view) = create_depth_texture(device, config.width, config.height);

        Self {
            pbr_pipeline,
            sky_pipeline,
            frame_buffer,
            lights_buffer,
            frame_bind_group,
            sky_buffer,
            sky_bind_group,
            material_layout,
            object_layout,
            sky_texture_layout,
            depth_view,
        }
    }

    /// The depth attachment tracks the surface size; everything else is
    /// resolution independent.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let (_, depth_view) = create_depth_texture(device, width, height);
        self.depth_view = depth_view;
    }

    /// Draw one frame. Surface troubles are handed back to the event loop,
    /// which decides between reconfigure, skip and shutdown.
    pub fn render(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface: &wgpu::Surface,
        scene: &Scene,
        camera: &Camera,
        state: &TransformState,
        toggles: &ViewToggles,
    ) -> Result<(), wgpu::SurfaceError> {
        // Uniform uploads happen before encoding; every draw below reads the
        // same frame values.
        let frame_data = FrameUniform::new(camera, state, toggles);
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame_data));
        let lights = LightsUniform::new(state.light_pos);
        queue.write_buffer(&self.lights_buffer, 0, bytemuck::bytes_of(&lights));
        let sky = SkyUniform::new(camera);
        queue.write_buffer(&self.sky_buffer, 0, bytemuck::bytes_of(&sky));
        scene.write_dynamic_uniforms(queue, state);

        let frame = surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.1,
                            g: 0.1,
                            b: 0.1,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pbr_pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            render_pass.set_bind_group(1, &scene.material_bind_group, &[]);

            if toggles.draw_heightmap {
                render_pass.set_bind_group(2, &scene.heightfield.bind_group, &[]);
                scene.heightfield_mesh.draw(&mut render_pass);
            }

            render_pass.set_bind_group(2, &scene.showcase.bind_group, &[]);
            scene.model.draw(&mut render_pass);

            render_pass.set_bind_group(2, &scene.marker.bind_group, &[]);
            scene.marker_mesh.draw(&mut render_pass);

            if toggles.draw_boxes {
                for slot in &scene.boxes {
                    render_pass.set_bind_group(2, &slot.bind_group, &[]);
                    scene.box_mesh.draw(&mut render_pass);
                }
            }

            // Skybox last. Its vertices pin depth to the far plane and the
            // pipeline tests LessEqual without writing, so it only fills
            // pixels no opaque draw claimed.
            render_pass.set_pipeline(&self.sky_pipeline);
            render_pass.set_bind_group(0, &self.sky_bind_group, &[]);
            render_pass.set_bind_group(1, &scene.sky_texture_bind_group, &[]);
            scene.box_mesh.draw(&mut render_pass);
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        Ok(())
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn create_frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("frame_bind_group_layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT),
            uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
        ],
    })
}

/// The full material set: albedo, roughness, metalness, normal map, their
/// shared sampler, and the equirectangular environment map for the ambient
/// term. The environment texture is Rgba32Float; filtering it is why the
/// device requests FLOAT32_FILTERABLE.
fn create_material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("material_bind_group_layout"),
        entries: &[
            texture_entry(0, wgpu::TextureViewDimension::D2),
            texture_entry(1, wgpu::TextureViewDimension::D2),
            texture_entry(2, wgpu::TextureViewDimension::D2),
            texture_entry(3, wgpu::TextureViewDimension::D2),
            sampler_entry(4),
            texture_entry(5, wgpu::TextureViewDimension::D2),
            sampler_entry(6),
        ],
    })
}

fn create_object_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("object_bind_group_layout"),
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
    })
}

fn create_sky_uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("sky_uniform_bind_group_layout"),
        entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
    })
}

fn create_sky_texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("sky_texture_bind_group_layout"),
        entries: &[
            texture_entry(0, wgpu::TextureViewDimension::Cube),
            sampler_entry(1),
        ],
    })
}

fn create_pbr_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    frame_layout: &wgpu::BindGroupLayout,
    material_layout: &wgpu::BindGroupLayout,
    object_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader_src = include_str!("../shaders/pbr.wgsl");
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("pbr_shader"),
        source: wgpu::ShaderSource::Wgsl(shader_src.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pbr_pipeline_layout"),
        bind_group_layouts: &[frame_layout, material_layout, object_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("pbr_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 24, shader_location: 2, format: wgpu::VertexFormat::Float32x2 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState { format, blend: Some(wgpu::BlendState::ALPHA_BLENDING), write_mask: wgpu::ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

/// The sky cube is watched from the inside, so culling is off and the depth
/// test is LessEqual with writes disabled.
fn create_sky_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    sky_uniform_layout: &wgpu::BindGroupLayout,
    sky_texture_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader_src = include_str!("../shaders/skybox.wgsl");
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("skybox_shader"),
        source: wgpu::ShaderSource::Wgsl(shader_src.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("sky_pipeline_layout"),
        bind_group_layouts: &[sky_uniform_layout, sky_texture_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("sky_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                // Only the position attribute; normals and uvs stay in the
                // buffer but the sky shader never reads them.
                attributes: &[
                    wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState { format, blend: Some(wgpu::BlendState::REPLACE), write_mask: wgpu::ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transform::{TransformState, ViewToggles};
    use crate::model::Camera;

    // Buffer sizes must match the WGSL-side struct layouts exactly.
    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 160);
        assert_eq!(std::mem::size_of::<LightsUniform>(), 128);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 80);
        assert_eq!(std::mem::size_of::<SkyUniform>(), 64);
    }

    #[test]
    fn test_frame_uniform_flags() {
        let camera = Camera::new(800, 600);
        let mut state = TransformState::new();
        let mut toggles = ViewToggles::new();

        state.use_textures = false;
        toggles.draw_normals = true;
        let frame = FrameUniform::new(&camera, &state, &toggles);
        assert_eq!(frame.use_textures, 0);
        assert_eq!(frame.draw_normals, 1);

        state.use_textures = true;
        toggles.draw_normals = false;
        let frame = FrameUniform::new(&camera, &state, &toggles);
        assert_eq!(frame.use_textures, 1);
        assert_eq!(frame.draw_normals, 0);
        assert_eq!(frame.fade, state.fade);
    }

    #[test]
    fn test_lights_slot_zero_is_movable() {
        let lights = LightsUniform::new(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(lights.positions[0], [1.0, 2.0, 3.0, 1.0]);
        for (slot, expected) in lights.positions[1..].iter().zip(FIXED_LIGHT_POSITIONS) {
            assert_eq!(&slot[..3], &expected.to_array());
        }
        for color in lights.colors {
            assert_eq!(&color[..3], &LIGHT_COLOR.to_array());
        }
    }

    #[test]
    fn test_object_uniform_columns() {
        let object = ObjectUniform::new(Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0)), 0.25, 0.75);
        // glam serializes column major; translation lives in the last column
        assert_eq!(object.model[3][0], 4.0);
        assert_eq!(object.model[3][1], 5.0);
        assert_eq!(object.model[3][2], 6.0);
        assert_eq!(object.roughness, 0.25);
        assert_eq!(object.metalness, 0.75);
    }

    #[test]
    fn test_sky_uniform_drops_translation() {
        let mut camera = Camera::new(800, 600);
        camera.eye = Vec3::new(10.0, 20.0, 30.0);
        let from_origin = {
            let mut at_origin = Camera::new(800, 600);
            at_origin.eye = Vec3::ZERO;
            at_origin.yaw = camera.yaw;
            at_origin.pitch = camera.pitch;
            SkyUniform::new(&at_origin)
        };
        let moved = SkyUniform::new(&camera);
        assert_eq!(moved.proj_view, from_origin.proj_view);
    }
}
