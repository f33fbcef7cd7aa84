use crate::coords::Viewport;

/// Edge length of the square tile one workgroup covers.
///
/// Must match `@workgroup_size(8, 8, 1)` in the compute program.
pub const WORKGROUP_SIZE: u32 = 8;

/// Workgroup grid for one dispatch.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct WorkgroupCount {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl WorkgroupCount {
    #[inline]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Smallest grid of 8x8 tiles covering `viewport`; partial tiles round up.
    #[inline]
    pub const fn for_viewport(viewport: Viewport) -> Self {
        Self {
            x: viewport.width.div_ceil(WORKGROUP_SIZE),
            y: viewport.height.div_ceil(WORKGROUP_SIZE),
            z: 1,
        }
    }

    /// Number of invocations launched, including the ones past the image edge.
    #[inline]
    pub const fn invocations(self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64 * (WORKGROUP_SIZE * WORKGROUP_SIZE) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiple() {
        assert_eq!(
            WorkgroupCount::for_viewport(Viewport::new(800, 600)),
            WorkgroupCount::new(100, 75, 1)
        );
    }

    #[test]
    fn partial_tile_rounds_up() {
        let g = WorkgroupCount::for_viewport(Viewport::new(801, 600));
        assert_eq!(g.x, 101);
        assert_eq!(g.y, 75);

        let g = WorkgroupCount::for_viewport(Viewport::new(1, 9));
        assert_eq!((g.x, g.y, g.z), (1, 2, 1));
    }

    #[test]
    fn grid_covers_every_pixel() {
        let v = Viewport::new(1919, 1081);
        let g = WorkgroupCount::for_viewport(v);
        assert!(g.invocations() >= v.pixel_count());
        assert!((g.x - 1) * WORKGROUP_SIZE < v.width);
        assert!((g.y - 1) * WORKGROUP_SIZE < v.height);
    }
}
