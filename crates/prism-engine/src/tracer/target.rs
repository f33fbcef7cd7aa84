use crate::coords::Viewport;

/// Texel format of the output image.
///
/// Four 32-bit float channels: the tracer accumulates unclamped radiance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TargetFormat {
    Rgba32Float,
}

impl TargetFormat {
    pub const fn channels(self) -> u32 {
        match self {
            TargetFormat::Rgba32Float => 4,
        }
    }

    pub const fn is_float(self) -> bool {
        match self {
            TargetFormat::Rgba32Float => true,
        }
    }

    pub const fn to_wgpu(self) -> wgpu::TextureFormat {
        match self {
            TargetFormat::Rgba32Float => wgpu::TextureFormat::Rgba32Float,
        }
    }
}

/// How reads and writes treat color values.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ColorSpace {
    /// Values are stored and read back unchanged.
    Linear,
    /// Values are gamma-encoded on write and decoded on read.
    Srgb,
}

/// Everything needed to allocate the output image.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TargetDesc {
    pub width: u32,
    pub height: u32,
    pub depth_bits: u32,
    pub format: TargetFormat,
    pub color_space: ColorSpace,
    /// Writable from compute invocations in arbitrary order (storage binding).
    pub random_write: bool,
}

impl TargetDesc {
    /// The output image for `viewport`: full size, no depth, linear `rgba32float`,
    /// compute-writable.
    pub const fn for_viewport(viewport: Viewport) -> Self {
        Self {
            width: viewport.width,
            height: viewport.height,
            depth_bits: 0,
            format: TargetFormat::Rgba32Float,
            color_space: ColorSpace::Linear,
            random_write: true,
        }
    }

    #[inline]
    pub const fn size(&self) -> Viewport {
        Viewport::new(self.width, self.height)
    }

    #[inline]
    pub fn matches(&self, viewport: Viewport) -> bool {
        self.width == viewport.width && self.height == viewport.height
    }

    /// Texture usages implied by this description.
    ///
    /// `TEXTURE_BINDING` lets the present pass sample the image.
    pub fn wgpu_usage(&self) -> wgpu::TextureUsages {
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC;
        if self.random_write {
            usage |= wgpu::TextureUsages::STORAGE_BINDING;
        }
        usage
    }

    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// Lifecycle of the output image.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum TargetState {
    #[default]
    Unallocated,
    Allocated { width: u32, height: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_desc_is_linear_float4_without_depth() {
        for (w, h) in [(1, 1), (800, 600), (3840, 2160)] {
            let d = TargetDesc::for_viewport(Viewport::new(w, h));
            assert_eq!((d.width, d.height), (w, h));
            assert_eq!(d.depth_bits, 0);
            assert_eq!(d.format.channels(), 4);
            assert!(d.format.is_float());
            assert_eq!(d.color_space, ColorSpace::Linear);
            assert!(d.random_write);
        }
    }

    #[test]
    fn usage_includes_storage_only_when_random_write() {
        let mut d = TargetDesc::for_viewport(Viewport::new(8, 8));
        assert!(d.wgpu_usage().contains(wgpu::TextureUsages::STORAGE_BINDING));
        d.random_write = false;
        assert!(!d.wgpu_usage().contains(wgpu::TextureUsages::STORAGE_BINDING));
        assert!(d.wgpu_usage().contains(wgpu::TextureUsages::TEXTURE_BINDING));
    }

    #[test]
    fn matches_compares_both_dimensions() {
        let d = TargetDesc::for_viewport(Viewport::new(800, 600));
        assert!(d.matches(Viewport::new(800, 600)));
        assert!(!d.matches(Viewport::new(800, 601)));
        assert!(!d.matches(Viewport::new(801, 600)));
    }

    #[test]
    fn format_maps_to_wgpu() {
        assert_eq!(TargetFormat::Rgba32Float.to_wgpu(), wgpu::TextureFormat::Rgba32Float);
    }
}
