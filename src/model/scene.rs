use std::path::PathBuf;

use glam::{Mat4, Vec3};

use crate::model::assets::{asset_root, AssetError, Model};
use crate::model::transform::TransformState;
use crate::utils::{
    create_cube_mesh, create_heightfield_mesh, create_uv_sphere, map_val, MeshBuffer,
};
use crate::view::render::{ObjectUniform, Renderer};
use crate::view::texture::SceneTexture;

/// Light slot 0 follows `TransformState::light_pos`; these three never move.
pub const FIXED_LIGHT_POSITIONS: [Vec3; 3] = [
    Vec3::new(-5.0, -2.4, -27.600033),
    Vec3::new(-14.799991, -3.2, -27.800034),
    Vec3::new(-5.2, -2.2, -19.200001),
];

/// All four lights share one color; the per-frame fade factor scales it.
pub const LIGHT_COLOR: Vec3 = Vec3::new(0.5, 0.5, 0.5);

/// Boxes in the roughness/metalness sample grid.
pub const GRID_COUNT: usize = 25;

/// Cubemap faces in +X, -X, +Y, -Y, +Z, -Z layer order.
const SKYBOX_FACES: [&str; 6] = [
    "right.jpg",
    "left.jpg",
    "top.jpg",
    "bottom.jpg",
    "back.jpg",
    "front.jpg",
];

/// Grid slot `i` sits in a 5x5 layer behind the showcase model, three units
/// apart, lower-left corner at (-5, -5).
pub fn grid_position(i: usize) -> Vec3 {
    Vec3::new(
        3.0 * (i % 5) as f32 - 5.0,
        3.0 * (i / 5) as f32 - 5.0,
        -5.0,
    )
}

// Scalar factors used when the texture set is switched off.
const SHOWCASE_ROUGHNESS: f32 = 0.5;
const SHOWCASE_METALNESS: f32 = 0.0;
const MARKER_ROUGHNESS: f32 = 0.3;
const GROUND_ROUGHNESS: f32 = 0.9;

/// One drawable's uniform buffer with its group-2 bind group. Rewriting a
/// single shared buffer between draws would race within the encoder, so
/// every object gets its own slot.
pub struct ObjectSlot {
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl ObjectSlot {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform: ObjectUniform,
        label: &str,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }
}

/// Everything drawable: the showcase model, procedural meshes, the material
/// texture set and one `ObjectSlot` per draw.
pub struct Scene {
    pub model: Model,
    pub box_mesh: MeshBuffer,
    pub marker_mesh: MeshBuffer,
    pub heightfield_mesh: MeshBuffer,

    pub material_bind_group: wgpu::BindGroup,
    pub sky_texture_bind_group: wgpu::BindGroup,

    pub showcase: ObjectSlot,
    pub marker: ObjectSlot,
    pub heightfield: ObjectSlot,
    pub boxes: Vec<ObjectSlot>,
}

impl Scene {
    /// Load assets and build every GPU resource the render pass binds.
    /// Missing textures degrade to placeholders; a missing model is fatal.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        renderer: &Renderer,
        state: &TransformState,
    ) -> Result<Self, AssetError> {
        let root = asset_root();
        let model = Model::load(root.join("models/showcase.glb"), device)?;

        let box_mesh = create_cube_mesh().upload(device);
        let marker_mesh = create_uv_sphere(1.0, 32, 16).upload(device);
        let heightfield_mesh = create_heightfield_mesh(30.0, 64).upload(device);

        let albedo = SceneTexture::from_path(
            device,
            queue,
            &root.join("textures/albedo.tga"),
            true,
            [128, 128, 128, 255],
            "albedo_texture",
        );
        let roughness = SceneTexture::from_path(
            device,
            queue,
            &root.join("textures/roughness.tga"),
            false,
            [128, 128, 128, 255],
            "roughness_texture",
        );
        let metalness = SceneTexture::from_path(
            device,
            queue,
            &root.join("textures/metalness.tga"),
            false,
            [0, 0, 0, 255],
            "metalness_texture",
        );
        // Placeholder is the flat +Z tangent-space normal
        let normal = SceneTexture::from_path(
            device,
            queue,
            &root.join("textures/normal.tga"),
            false,
            [128, 128, 255, 255],
            "normal_texture",
        );
        let environment =
            SceneTexture::hdr_equirect(device, queue, &root.join("textures/environment.hdr"), "environment_map");

        let face_paths: [PathBuf; 6] = SKYBOX_FACES.map(|face| root.join("skybox").join(face));
        let sky = SceneTexture::cubemap(device, queue, &face_paths, "sky_cubemap");

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        // Equirect u wraps around, v clamps at the poles
        let environment_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("environment_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let sky_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sky_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("material_bind_group"),
            layout: &renderer.material_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&albedo.view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&roughness.view) },
                wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::TextureView(&metalness.view) },
                wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(&normal.view) },
                wgpu::BindGroupEntry { binding: 4, resource: wgpu::BindingResource::Sampler(&material_sampler) },
                wgpu::BindGroupEntry { binding: 5, resource: wgpu::BindingResource::TextureView(&environment.view) },
                wgpu::BindGroupEntry { binding: 6, resource: wgpu::BindingResource::Sampler(&environment_sampler) },
            ],
        });
        let sky_texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("sky_texture_bind_group"),
            layout: &renderer.sky_texture_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&sky.view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&sky_sampler) },
            ],
        });

        let showcase = ObjectSlot::new(
            device,
            &renderer.object_layout,
            showcase_uniform(state),
            "showcase_object",
        );
        let marker = ObjectSlot::new(
            device,
            &renderer.object_layout,
            marker_uniform(state.light_pos),
            "marker_object",
        );
        let heightfield = ObjectSlot::new(
            device,
            &renderer.object_layout,
            ObjectUniform::new(
                Mat4::from_translation(Vec3::new(0.0, -3.0, 0.0)),
                GROUND_ROUGHNESS,
                0.0,
            ),
            "heightfield_object",
        );

        let boxes = (0..GRID_COUNT)
            .map(|i| {
                let factor = box_factor(i);
                ObjectSlot::new(
                    device,
                    &renderer.object_layout,
                    ObjectUniform::new(Mat4::from_translation(grid_position(i)), factor, factor),
                    &format!("grid_object_{i}"),
                )
            })
            .collect();

        Ok(Self {
            model,
            box_mesh,
            marker_mesh,
            heightfield_mesh,
            material_bind_group,
            sky_texture_bind_group,
            showcase,
            marker,
            heightfield,
            boxes,
        })
    }

    /// Refresh the slots that move every frame. The grid and ground keep
    /// their creation-time uniforms.
    pub fn write_dynamic_uniforms(&self, queue: &wgpu::Queue, state: &TransformState) {
        let showcase = showcase_uniform(state);
        queue.write_buffer(&self.showcase.buffer, 0, bytemuck::bytes_of(&showcase));
        let marker = marker_uniform(state.light_pos);
        queue.write_buffer(&self.marker.buffer, 0, bytemuck::bytes_of(&marker));
    }
}

/// Roughness and metalness both sweep 0..1 across the grid.
fn box_factor(i: usize) -> f32 {
    map_val(i as f32, 0.0, GRID_COUNT as f32, 0.0, 1.0)
}

fn showcase_uniform(state: &TransformState) -> ObjectUniform {
    ObjectUniform::new(state.model_matrix(), SHOWCASE_ROUGHNESS, SHOWCASE_METALNESS)
}

/// Small sphere riding on the movable light.
fn marker_uniform(light_pos: Vec3) -> ObjectUniform {
    ObjectUniform::new(
        Mat4::from_translation(light_pos) * Mat4::from_scale(Vec3::splat(0.1)),
        MARKER_ROUGHNESS,
        0.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_positions_span_the_layer() {
        assert_eq!(grid_position(0), Vec3::new(-5.0, -5.0, -5.0));
        assert_eq!(grid_position(4), Vec3::new(7.0, -5.0, -5.0));
        assert_eq!(grid_position(20), Vec3::new(-5.0, 7.0, -5.0));
        assert_eq!(grid_position(24), Vec3::new(7.0, 7.0, -5.0));
    }

    #[test]
    fn test_grid_positions_wrap_every_five() {
        for i in 0..GRID_COUNT {
            let pos = grid_position(i);
            assert_eq!(pos.z, -5.0);
            assert_eq!(pos.x, 3.0 * (i % 5) as f32 - 5.0);
            assert_eq!(pos.y, 3.0 * (i / 5) as f32 - 5.0);
        }
    }

    #[test]
    fn test_box_factor_sweep() {
        assert_eq!(box_factor(0), 0.0);
        assert!((box_factor(24) - 0.96).abs() < 1e-6);
        for i in 1..GRID_COUNT {
            assert!(box_factor(i) > box_factor(i - 1), "factors must increase");
        }
    }

    #[test]
    fn test_marker_uniform_tracks_light() {
        let uniform = marker_uniform(Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(uniform.model[3][0], 1.0);
        assert_eq!(uniform.model[3][1], -2.0);
        assert_eq!(uniform.model[3][2], 3.0);
        // Uniform 0.1 scale on the diagonal
        assert!((uniform.model[0][0] - 0.1).abs() < 1e-6);
        assert!((uniform.model[1][1] - 0.1).abs() < 1e-6);
        assert!((uniform.model[2][2] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_showcase_uniform_follows_transform_state() {
        let mut state = TransformState::new();
        state.translation = Vec3::new(2.0, 0.0, -1.0);
        let uniform = showcase_uniform(&state);
        // Translation is the leftmost factor of the model matrix
        assert_eq!(uniform.model[3][0], 2.0);
        assert_eq!(uniform.model[3][1], 0.0);
        assert_eq!(uniform.model[3][2], -1.0);
        assert_eq!(uniform.roughness, SHOWCASE_ROUGHNESS);
        assert_eq!(uniform.metalness, SHOWCASE_METALNESS);
    }
}
