use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, bail};
use half::f16;
use image::DynamicImage;

use crate::render::RenderCtx;

static NEXT_SKYBOX_ID: AtomicU64 = AtomicU64::new(1);

/// Equirectangular environment image bound to `_SkyboxTexture`.
///
/// LDR sources upload as `rgba8unorm-srgb`; HDR sources (Radiance `.hdr`,
/// float images) as `rgba16float` so radiance above 1.0 survives and the
/// texture stays filterable.
pub struct Skybox {
    id: u64,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

impl Skybox {
    /// Loads and uploads an image file; the format is sniffed from content.
    pub fn from_path(ctx: &RenderCtx<'_>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::ImageReader::open(path)
            .with_context(|| format!("failed to open skybox {}", path.display()))?
            .with_guessed_format()
            .with_context(|| format!("failed to read skybox {}", path.display()))?
            .decode()
            .with_context(|| format!("failed to decode skybox {}", path.display()))?;

        log::info!(
            "loaded skybox {} ({}x{})",
            path.display(),
            img.width(),
            img.height()
        );
        Self::from_image(ctx, &img).with_context(|| format!("skybox {}", path.display()))
    }

    /// Decodes an in-memory image (PNG, JPEG or HDR) and uploads it.
    pub fn from_bytes(ctx: &RenderCtx<'_>, bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes).context("failed to decode skybox image")?;
        Self::from_image(ctx, &img)
    }

    /// Uploads an already decoded image.
    ///
    /// Fails when the image exceeds the device's 2D texture size limit.
    pub fn from_image(ctx: &RenderCtx<'_>, img: &DynamicImage) -> Result<Self> {
        let pixels = SkyboxPixels::from_image(img);
        pixels.check_fits(ctx.device.limits().max_texture_dimension_2d)?;
        Ok(Self::upload(ctx, &pixels))
    }

    /// A 1x1 environment of one linear color.
    pub fn solid(ctx: &RenderCtx<'_>, rgba: [f32; 4]) -> Self {
        Self::upload(ctx, &SkyboxPixels::solid(rgba))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    fn upload(ctx: &RenderCtx<'_>, pixels: &SkyboxPixels) -> Self {
        let size = wgpu::Extent3d {
            width: pixels.width,
            height: pixels.height,
            depth_or_array_layers: 1,
        };

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("prism skybox"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: pixels.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels.bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(pixels.bytes_per_row()),
                rows_per_image: Some(pixels.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        // Longitude wraps, latitude clamps at the poles.
        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("prism skybox sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Self {
            id: NEXT_SKYBOX_ID.fetch_add(1, Ordering::Relaxed),
            width: pixels.width,
            height: pixels.height,
            format: pixels.format,
            _texture: texture,
            view,
            sampler,
        }
    }
}

/// CPU-side texel data ready for upload.
#[derive(Debug, Clone, PartialEq)]
struct SkyboxPixels {
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    bytes: Vec<u8>,
}

impl SkyboxPixels {
    fn from_image(img: &DynamicImage) -> Self {
        let is_hdr = matches!(
            img,
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)
        );

        if is_hdr {
            let rgba = img.to_rgba32f();
            let (width, height) = rgba.dimensions();
            Self::half_float(width, height, rgba.as_raw())
        } else {
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            Self {
                width,
                height,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                bytes: rgba.into_raw(),
            }
        }
    }

    fn solid(rgba: [f32; 4]) -> Self {
        Self::half_float(1, 1, &rgba)
    }

    /// Radiance beyond the f16 range saturates at `f16::MAX` instead of
    /// turning into infinity.
    fn half_float(width: u32, height: u32, texels: &[f32]) -> Self {
        let limit = f16::MAX.to_f32();
        let halves: Vec<f16> = texels
            .iter()
            .map(|&v| f16::from_f32(v.clamp(-limit, limit)))
            .collect();
        Self {
            width,
            height,
            format: wgpu::TextureFormat::Rgba16Float,
            bytes: bytemuck::cast_slice(&halves).to_vec(),
        }
    }

    fn check_fits(&self, max_dimension: u32) -> Result<()> {
        if self.width > max_dimension || self.height > max_dimension {
            bail!(
                "skybox is {}x{} but the device supports at most {max_dimension}x{max_dimension}",
                self.width,
                self.height
            );
        }
        Ok(())
    }

    fn bytes_per_row(&self) -> u32 {
        let texel = match self.format {
            wgpu::TextureFormat::Rgba16Float => 8,
            _ => 4,
        };
        self.width * texel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgb32FImage, Rgba, RgbaImage};

    #[test]
    fn ldr_image_uploads_as_srgb8() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([10, 20, 30, 255])));
        let px = SkyboxPixels::from_image(&img);
        assert_eq!(px.format, wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!((px.width, px.height), (4, 2));
        assert_eq!(px.bytes.len(), 4 * 2 * 4);
        assert_eq!(px.bytes_per_row(), 16);
        assert_eq!(&px.bytes[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn hdr_image_keeps_values_above_one() {
        let img = DynamicImage::ImageRgb32F(Rgb32FImage::from_pixel(2, 1, Rgb([4.0, 0.5, 0.0])));
        let px = SkyboxPixels::from_image(&img);
        assert_eq!(px.format, wgpu::TextureFormat::Rgba16Float);
        assert_eq!(px.bytes.len(), 2 * 8);
        assert_eq!(px.bytes_per_row(), 16);

        let values: Vec<f32> = px
            .bytes
            .chunks_exact(2)
            .map(|b| f16::from_le_bytes([b[0], b[1]]).to_f32())
            .collect();
        assert_eq!(&values[..4], &[4.0, 0.5, 0.0, 1.0]);
    }

    #[test]
    fn radiance_beyond_half_range_saturates() {
        let img = DynamicImage::ImageRgb32F(Rgb32FImage::from_pixel(
            1,
            1,
            Rgb([1.0e6, -1.0e6, 65504.0]),
        ));
        let px = SkyboxPixels::from_image(&img);
        let values: Vec<f16> = px
            .bytes
            .chunks_exact(2)
            .map(|b| f16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(values[0], f16::MAX);
        assert_eq!(values[1], f16::MIN);
        assert_eq!(values[2], f16::MAX);
        assert!(values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn oversized_image_is_rejected() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(9, 1));
        let px = SkyboxPixels::from_image(&img);
        let err = px.check_fits(8).unwrap_err().to_string();
        assert!(err.contains("9x1"), "{err}");
        assert!(err.contains("8x8"), "{err}");

        let tall = SkyboxPixels::from_image(&DynamicImage::ImageRgba8(RgbaImage::new(1, 9)));
        assert!(tall.check_fits(8).is_err());
    }

    #[test]
    fn image_at_limit_fits() {
        let px = SkyboxPixels::from_image(&DynamicImage::ImageRgba8(RgbaImage::new(8, 8)));
        assert!(px.check_fits(8).is_ok());
    }

    #[test]
    fn solid_is_single_half_float_texel() {
        let px = SkyboxPixels::solid([0.25, 0.5, 1.0, 1.0]);
        assert_eq!((px.width, px.height), (1, 1));
        assert_eq!(px.bytes.len(), 8);
    }
}
