use wgpu::util::DeviceExt;
use bytemuck::NoUninit;

// Interleaved layout shared by every pipeline: position, normal, uv (8 floats).
#[repr(C)]
#[derive(Debug, Clone, Copy, NoUninit)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

pub struct MeshBuffer {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl MeshBuffer {
    /// Issue the indexed draw for this mesh. Vertex and object bind groups
    /// must already be set on the pass.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.index_count == 0 {
            return;
        }
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn upload(&self, device: &wgpu::Device) -> MeshBuffer {
        let vertices = bytemuck::cast_slice(&self.vertices);
        let indices = bytemuck::cast_slice(&self.indices);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: vertices,
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: indices,
            usage: wgpu::BufferUsages::INDEX,
        });

        MeshBuffer {
            vertex_buffer,
            index_buffer,
            index_count: self.indices.len() as u32,
        }
    }
}

/// Linearly remap `i` from the range `[a, b]` to the range `[x, y]`.
/// A degenerate source range (`a == b`) maps everything to `x`.
pub fn map_val(i: f32, a: f32, b: f32, x: f32, y: f32) -> f32 {
    if a == b {
        return x;
    }
    (i - a) / (b - a) * (y - x) + x
}

/// Unit cube centered at the origin, four vertices per face.
///
/// Each face is spanned by a (u, v) tangent pair with u x v = normal, so the
/// emitted triangles are counter-clockwise seen from outside.
pub fn create_cube_mesh() -> Mesh {
    // (normal, u axis, v axis)
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    const CORNERS: [([f32; 2], [f32; 2]); 4] = [
        ([-1.0, -1.0], [0.0, 0.0]),
        ([1.0, -1.0], [1.0, 0.0]),
        ([1.0, 1.0], [1.0, 1.0]),
        ([-1.0, 1.0], [0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in FACES {
        let base = vertices.len() as u32;
        for ([su, sv], uv) in CORNERS {
            let pos = [
                (normal[0] + su * u[0] + sv * v[0]) * 0.5,
                (normal[1] + su * u[1] + sv * v[1]) * 0.5,
                (normal[2] + su * u[2] + sv * v[2]) * 0.5,
            ];
            vertices.push(Vertex { pos, normal, uv });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    Mesh { vertices, indices }
}

/// UV sphere of the given radius. Poles emit degenerate-free triangle fans.
pub fn create_uv_sphere(radius: f32, sectors: u32, stacks: u32) -> Mesh {
    let mut vertices = Vec::with_capacity(((sectors + 1) * (stacks + 1)) as usize);
    let mut indices = Vec::new();

    for i in 0..=stacks {
        let v = i as f32 / stacks as f32;
        let phi = v * std::f32::consts::PI;
        for j in 0..=sectors {
            let u = j as f32 / sectors as f32;
            let theta = u * std::f32::consts::TAU;

            let normal = [
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ];
            vertices.push(Vertex {
                pos: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
                uv: [u, v],
            });
        }
    }

    for i in 0..stacks {
        for j in 0..sectors {
            let a = i * (sectors + 1) + j;
            let b = a + sectors + 1;
            if i != 0 {
                indices.extend_from_slice(&[a, a + 1, b]);
            }
            if i != stacks - 1 {
                indices.extend_from_slice(&[a + 1, b + 1, b]);
            }
        }
    }

    Mesh { vertices, indices }
}

/// Rippled ground patch on the XZ plane, centered at the origin.
/// Heights come from a fixed analytic surface so normals are exact.
pub fn create_heightfield_mesh(size: f32, resolution: u32) -> Mesh {
    fn height(x: f32, z: f32) -> f32 {
        0.4 * (0.7 * x).sin() * (0.7 * z).cos()
    }
    fn normal(x: f32, z: f32) -> [f32; 3] {
        let dx = 0.28 * (0.7 * x).cos() * (0.7 * z).cos();
        let dz = -0.28 * (0.7 * x).sin() * (0.7 * z).sin();
        let len = (dx * dx + 1.0 + dz * dz).sqrt();
        [-dx / len, 1.0 / len, -dz / len]
    }

    let half = size / 2.0;
    let step = size / resolution as f32;
    let mut vertices = Vec::with_capacity(((resolution + 1) * (resolution + 1)) as usize);
    let mut indices = Vec::with_capacity((resolution * resolution * 6) as usize);

    for j in 0..=resolution {
        let z = -half + j as f32 * step;
        for i in 0..=resolution {
            let x = -half + i as f32 * step;
            vertices.push(Vertex {
                pos: [x, height(x, z), z],
                normal: normal(x, z),
                uv: [i as f32 / resolution as f32, j as f32 / resolution as f32],
            });
        }
    }

    for j in 0..resolution {
        for i in 0..resolution {
            let a = j * (resolution + 1) + i;
            let b = a + 1;
            let c = a + resolution + 1;
            let d = c + 1;
            indices.extend_from_slice(&[a, c, b, b, c, d]);
        }
    }

    Mesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_val_endpoints() {
        assert_eq!(map_val(0.0, 0.0, 25.0, 0.0, 1.0), 0.0, "source start maps to dest start");
        assert_eq!(map_val(25.0, 0.0, 25.0, 0.0, 1.0), 1.0, "source end maps to dest end");
    }

    #[test]
    fn test_map_val_midpoint() {
        assert_eq!(map_val(12.5, 0.0, 25.0, 0.0, 1.0), 0.5);
    }

    #[test]
    fn test_map_val_affine_form() {
        // map(i,a,b,x,y) == x + (i-a)*(y-x)/(b-a)
        let (a, b, x, y) = (2.0, 10.0, -3.0, 5.0);
        for i in [-1.0f32, 2.0, 4.5, 10.0, 13.0] {
            let expected = x + (i - a) * (y - x) / (b - a);
            let got = map_val(i, a, b, x, y);
            assert!((got - expected).abs() < 1e-5, "affine mismatch at i={i}: {got} vs {expected}");
        }
    }

    #[test]
    fn test_map_val_degenerate_range() {
        // a == b would divide by zero; the guard pins the result to x
        assert_eq!(map_val(7.0, 3.0, 3.0, -1.0, 1.0), -1.0);
    }

    #[test]
    fn test_cube_mesh_shape() {
        let mesh = create_cube_mesh();
        assert_eq!(mesh.vertices.len(), 24, "four vertices per face");
        assert_eq!(mesh.indices.len(), 36, "two triangles per face");

        // Normals are unit axis vectors and every corner sits on the half-unit shell
        for v in &mesh.vertices {
            let n_len: f32 = v.normal.iter().map(|c| c * c).sum();
            assert!((n_len - 1.0).abs() < 1e-6);
            for c in v.pos {
                assert!((c.abs() - 0.5).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_sphere_normals_point_outward() {
        let mesh = create_uv_sphere(2.0, 16, 8);
        for v in &mesh.vertices {
            let r: f32 = v.pos.iter().map(|c| c * c).sum::<f32>().sqrt();
            assert!((r - 2.0).abs() < 1e-5, "vertex off the sphere: r={r}");
            for k in 0..3 {
                assert!((v.pos[k] - v.normal[k] * 2.0).abs() < 1e-5, "normal not radial");
            }
        }
    }

    #[test]
    fn test_heightfield_grid_size() {
        let mesh = create_heightfield_mesh(10.0, 8);
        assert_eq!(mesh.vertices.len(), 81);
        assert_eq!(mesh.indices.len(), 8 * 8 * 6);

        for v in &mesh.vertices {
            let n_len: f32 = v.normal.iter().map(|c| c * c).sum::<f32>();
            assert!((n_len - 1.0).abs() < 1e-4, "normal not normalized");
            assert!(v.normal[1] > 0.0, "ground normals face up");
        }
    }
}
