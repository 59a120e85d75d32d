use std::path::Path;

use tracing::warn;

use crate::model::assets::AssetError;

/// A sampled texture and its default view. Samplers are owned by the bind
/// groups that pair them with these views.
pub struct SceneTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl SceneTexture {
    /// 8-bit RGBA texture decoded from an image file. Color maps go through
    /// sRGB, data maps (roughness, metalness, normals) stay linear. A decode
    /// failure is not fatal: the texture collapses to a 1x1 `fallback` pixel.
    pub fn from_path(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        srgb: bool,
        fallback: [u8; 4],
        label: &str,
    ) -> Self {
        match load_rgba8(path) {
            Ok((width, height, pixels)) => {
                Self::from_rgba8(device, queue, width, height, &pixels, srgb, label)
            }
            Err(e) => {
                warn!("texture {:?} unavailable ({e}), using 1x1 placeholder", path);
                Self::from_rgba8(device, queue, 1, 1, &fallback, srgb, label)
            }
        }
    }

    /// Upload raw RGBA8 pixels as a 2D texture.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
        srgb: bool,
        label: &str,
    ) -> Self {
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Equirectangular environment map uploaded as Rgba32Float, keeping the
    /// radiance range of the .hdr file. Sampling it with a linear filter
    /// needs `Features::FLOAT32_FILTERABLE` on the device. An unreadable
    /// file degrades to a single black texel.
    pub fn hdr_equirect(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        label: &str,
    ) -> Self {
        let (width, height, pixels) = match load_rgba32f(path) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("environment map {:?} unavailable ({e}), ambient term goes dark", path);
                (1, 1, vec![0.0, 0.0, 0.0, 1.0])
            }
        };

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&pixels),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                // 4 floats per texel
                bytes_per_row: Some(16 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    /// Cubemap built from six face files in +X, -X, +Y, -Y, +Z, -Z order.
    /// Faces that fail to decode (or disagree on size) become solid fills so
    /// the remaining faces still render.
    pub fn cubemap(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        face_paths: &[std::path::PathBuf; 6],
        label: &str,
    ) -> Self {
        let mut faces: Vec<Option<(u32, u32, Vec<u8>)>> = Vec::with_capacity(6);
        for path in face_paths {
            match load_rgba8(path) {
                Ok(decoded) => faces.push(Some(decoded)),
                Err(e) => {
                    warn!("cubemap face {:?} unavailable ({e}), filling solid", path);
                    faces.push(None);
                }
            }
        }

        // All layers of one texture share a size, so the first good face wins
        let (width, height) = faces
            .iter()
            .flatten()
            .map(|(w, h, _)| (*w, *h))
            .next()
            .unwrap_or((1, 1));

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 6,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let solid = solid_face(width, height, CUBE_FILL);
        for (layer, face) in faces.iter().enumerate() {
            let pixels = match face {
                Some((w, h, pixels)) if *w == width && *h == height => pixels,
                Some(_) => {
                    warn!("cubemap face {} size mismatch, filling solid", layer);
                    &solid
                }
                None => &solid,
            };
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        Self { texture, view }
    }
}

/// Dark slate fill for missing cubemap faces.
const CUBE_FILL: [u8; 4] = [24, 28, 38, 255];

fn solid_face(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    color
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect()
}

fn load_rgba8(path: &Path) -> Result<(u32, u32, Vec<u8>), AssetError> {
    let image = image::open(path)?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok((width, height, rgba.into_raw()))
}

fn load_rgba32f(path: &Path) -> Result<(u32, u32, Vec<f32>), AssetError> {
    let image = image::open(path)?;
    let rgb = image.into_rgb32f();
    let (width, height) = rgb.dimensions();
    Ok((width, height, rgb_to_rgba(rgb.as_raw())))
}

/// Pad packed RGB floats to RGBA with opaque alpha; float texture formats
/// have no three-channel variant.
fn rgb_to_rgba(rgb: &[f32]) -> Vec<f32> {
    let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
    for texel in rgb.chunks_exact(3) {
        rgba.extend_from_slice(texel);
        rgba.push(1.0);
    }
    rgba
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_rgba_pads_alpha() {
        let rgb = [0.1, 0.2, 0.3, 4.0, 5.0, 6.0];
        let rgba = rgb_to_rgba(&rgb);
        assert_eq!(rgba, vec![0.1, 0.2, 0.3, 1.0, 4.0, 5.0, 6.0, 1.0]);
    }

    #[test]
    fn test_solid_face_repeats_color() {
        let pixels = solid_face(2, 2, [1, 2, 3, 4]);
        assert_eq!(pixels.len(), 16);
        assert_eq!(&pixels[4..8], &[1, 2, 3, 4]);
        assert_eq!(&pixels[12..16], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_load_rgba8_roundtrip() {
        let path = std::env::temp_dir().join("skylit_texture_roundtrip.png");
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 255, 0, 128]));
        img.save(&path).unwrap();

        let (w, h, pixels) = load_rgba8(&path).unwrap();
        assert_eq!((w, h), (2, 1));
        assert_eq!(&pixels[..4], &[255, 0, 0, 255]);
        assert_eq!(&pixels[4..], &[0, 255, 0, 128]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rgba8_missing_file() {
        let missing = Path::new("definitely/not/here.png");
        assert!(load_rgba8(missing).is_err());
    }
}
