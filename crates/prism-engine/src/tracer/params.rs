use bytemuck::{Pod, Zeroable};
use glam::Mat4;

/// Named parameters shared with the compute program.
///
/// The names are part of the interop surface: the WGSL program declares
/// globals / uniform members with exactly these identifiers, at the binding
/// returned by [`ShaderParam::binding`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderParam {
    /// Writable output image.
    Result,
    /// Camera-to-world transform.
    CameraToWorld,
    /// Inverse of the camera projection.
    CameraInverseProjection,
    /// Readable environment image.
    SkyboxTexture,
}

impl ShaderParam {
    pub const ALL: [ShaderParam; 4] = [
        ShaderParam::Result,
        ShaderParam::CameraToWorld,
        ShaderParam::CameraInverseProjection,
        ShaderParam::SkyboxTexture,
    ];

    /// Identifier used in the compute program.
    pub const fn name(self) -> &'static str {
        match self {
            ShaderParam::Result => "Result",
            ShaderParam::CameraToWorld => "_CameraToWorld",
            ShaderParam::CameraInverseProjection => "_CameraInverseProjection",
            ShaderParam::SkyboxTexture => "_SkyboxTexture",
        }
    }

    /// Binding index in group 0. Both matrices live in one uniform block.
    pub const fn binding(self) -> u32 {
        match self {
            ShaderParam::Result => 0,
            ShaderParam::CameraToWorld | ShaderParam::CameraInverseProjection => 1,
            ShaderParam::SkyboxTexture => 2,
        }
    }

    pub const fn is_matrix(self) -> bool {
        matches!(
            self,
            ShaderParam::CameraToWorld | ShaderParam::CameraInverseProjection
        )
    }

    /// Parameters a program with the given layout must receive every frame.
    pub fn required(layout: BindingLayout) -> &'static [ShaderParam] {
        match layout {
            BindingLayout::OutputOnly => &[ShaderParam::Result],
            BindingLayout::Camera => &Self::ALL,
        }
    }
}

/// Which parameters the compute program declares.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BindingLayout {
    /// Only `Result` (binding 0).
    OutputOnly,
    /// `Result`, both camera matrices and the skybox (bindings 0..=3).
    Camera,
}

/// Snapshot of the active camera, taken once per frame by the caller.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraMatrices {
    pub camera_to_world: Mat4,
    pub projection: Mat4,
}

impl CameraMatrices {
    pub const IDENTITY: Self = Self {
        camera_to_world: Mat4::IDENTITY,
        projection: Mat4::IDENTITY,
    };

    #[inline]
    pub fn new(camera_to_world: Mat4, projection: Mat4) -> Self {
        Self {
            camera_to_world,
            projection,
        }
    }

    /// Inverse of the current projection, as bound to `_CameraInverseProjection`.
    #[inline]
    pub fn inverse_projection(&self) -> Mat4 {
        self.projection.inverse()
    }
}

impl Default for CameraMatrices {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// GPU layout of the camera uniform block (binding 1).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub camera_to_world: [[f32; 4]; 4],
    pub camera_inverse_projection: [[f32; 4]; 4],
}

const IDENTITY_COLS: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

impl CameraUniform {
    pub const IDENTITY: Self = Self {
        camera_to_world: IDENTITY_COLS,
        camera_inverse_projection: IDENTITY_COLS,
    };

    /// Writes one matrix member. Non-matrix parameters are ignored.
    pub fn set(&mut self, param: ShaderParam, value: Mat4) {
        match param {
            ShaderParam::CameraToWorld => self.camera_to_world = value.to_cols_array_2d(),
            ShaderParam::CameraInverseProjection => {
                self.camera_inverse_projection = value.to_cols_array_2d()
            }
            ShaderParam::Result | ShaderParam::SkyboxTexture => {}
        }
    }

    /// Minimum binding size for the uniform; never zero.
    pub(crate) fn min_binding_size() -> std::num::NonZeroU64 {
        std::num::NonZeroU64::new(std::mem::size_of::<Self>() as u64)
            .expect("CameraUniform has non-zero size by construction")
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn abi_names_are_fixed() {
        let names: Vec<_> = ShaderParam::ALL.iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            ["Result", "_CameraToWorld", "_CameraInverseProjection", "_SkyboxTexture"]
        );
    }

    #[test]
    fn matrices_share_the_uniform_binding() {
        assert_eq!(ShaderParam::CameraToWorld.binding(), 1);
        assert_eq!(ShaderParam::CameraInverseProjection.binding(), 1);
        assert_ne!(ShaderParam::Result.binding(), ShaderParam::SkyboxTexture.binding());
    }

    #[test]
    fn output_only_requires_result() {
        assert_eq!(ShaderParam::required(BindingLayout::OutputOnly), &[ShaderParam::Result]);
        assert_eq!(ShaderParam::required(BindingLayout::Camera).len(), 4);
    }

    #[test]
    fn uniform_is_two_mat4() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 128);
        assert_eq!(CameraUniform::min_binding_size().get(), 128);
    }

    #[test]
    fn inverse_projection_undoes_projection() {
        let proj = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);
        let cam = CameraMatrices::new(Mat4::IDENTITY, proj);
        let product = proj * cam.inverse_projection();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn uniform_set_writes_column_major() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let mut u = CameraUniform::IDENTITY;
        u.set(ShaderParam::CameraToWorld, m);
        assert_eq!(u.camera_to_world[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(u.camera_inverse_projection, Mat4::IDENTITY.to_cols_array_2d());

        u.set(ShaderParam::Result, m);
        assert_eq!(u.camera_inverse_projection, Mat4::IDENTITY.to_cols_array_2d());
    }
}
