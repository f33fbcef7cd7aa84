use glam::Mat4;

use super::dispatch::WorkgroupCount;
use super::params::ShaderParam;
use super::target::TargetDesc;

/// GPU capability the frame renderer drives.
///
/// A backend owns the compute program and its parameter bindings. It exposes
/// "allocate/release the output image", "set a matrix / texture parameter",
/// "dispatch" and "present". None of the operations report errors: failures
/// are the graphics layer's to surface (wgpu routes them to the device's
/// uncaptured-error handler).
pub trait TracerBackend {
    /// Handle to an allocated output image.
    type Target;

    /// Handle to the environment image bound to `_SkyboxTexture`.
    type Skybox;

    /// Per-frame recording context (encoder + display view for wgpu).
    type Frame<'f>;

    /// Allocates a new output image matching `desc` exactly.
    fn allocate_target(&mut self, desc: &TargetDesc) -> Self::Target;

    /// Releases an output image. Outstanding GPU reads are the backend's concern.
    fn release_target(&mut self, target: Self::Target);

    /// Sets `_CameraToWorld` or `_CameraInverseProjection`.
    fn set_matrix(&mut self, param: ShaderParam, value: Mat4);

    /// Binds `Result` to `target`.
    fn set_output(&mut self, target: &Self::Target);

    /// Binds `_SkyboxTexture` to `skybox`.
    fn set_skybox(&mut self, skybox: &Self::Skybox);

    /// Records one dispatch with `groups` workgroups. Does not wait.
    fn dispatch(&mut self, frame: &mut Self::Frame<'_>, groups: WorkgroupCount);

    /// Copies the whole of `target` onto the frame's display surface.
    fn present(&mut self, frame: &mut Self::Frame<'_>, target: &Self::Target);
}
