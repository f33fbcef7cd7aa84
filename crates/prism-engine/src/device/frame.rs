/// A single acquired swapchain image plus the encoder its commands go into.
///
/// Holding the surface texture blocks acquisition of the next frame, so the
/// frame must be submitted promptly. The tracer records its dispatch and the
/// present pass into `encoder`; nothing here waits for GPU completion.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
