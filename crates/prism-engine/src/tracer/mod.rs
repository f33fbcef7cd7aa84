//! Per-frame compute ray tracer dispatch.
//!
//! `FrameRenderer` owns a full-viewport `rgba32float` output image, binds the
//! camera matrices and skybox to an opaque compute program, dispatches it in
//! 8x8 workgroups and presents the result. The GPU work goes through the
//! [`TracerBackend`] capability; [`WgpuBackend`] is the production
//! implementation.
//!
//! The compute program and this module share a fixed parameter ABI, see
//! [`ShaderParam`]:
//!
//! | name                       | binding | WGSL type                                   |
//! |----------------------------|---------|---------------------------------------------|
//! | `Result`                   | 0       | `texture_storage_2d<rgba32float, write>`    |
//! | `_CameraToWorld`           | 1       | `mat4x4<f32>` (first member of the uniform) |
//! | `_CameraInverseProjection` | 1       | `mat4x4<f32>` (second member)               |
//! | `_SkyboxTexture`           | 2       | `texture_2d<f32>` (+ sampler at binding 3)  |

mod backend;
mod dispatch;
mod params;
mod renderer;
mod skybox;
mod target;
mod wgpu_backend;

pub use backend::TracerBackend;
pub use dispatch::{WorkgroupCount, WORKGROUP_SIZE};
pub use params::{BindingLayout, CameraMatrices, CameraUniform, ShaderParam};
pub use renderer::{FrameContext, FrameRenderer, ParamBinding};
pub use skybox::Skybox;
pub use target::{ColorSpace, TargetDesc, TargetFormat, TargetState};
pub use wgpu_backend::{ComputeProgram, GpuTarget, WgpuBackend};
