use std::borrow::Cow;

use glam::Mat4;

use crate::render::{RenderCtx, RenderTarget};

use super::backend::TracerBackend;
use super::dispatch::WorkgroupCount;
use super::params::{BindingLayout, CameraUniform, ShaderParam};
use super::renderer::{FrameRenderer, ParamBinding};
use super::skybox::Skybox;
use super::target::TargetDesc;

/// WGSL source of the compute program plus its entry point.
#[derive(Debug, Clone)]
pub struct ComputeProgram {
    pub label: String,
    pub source: Cow<'static, str>,
    pub entry_point: String,
}

impl ComputeProgram {
    /// A WGSL program whose kernel is `fn main`.
    pub fn wgsl(label: impl Into<String>, source: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
            entry_point: "main".to_string(),
        }
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }
}

/// Output image allocated by [`WgpuBackend`].
pub struct GpuTarget {
    id: u64,
    desc: TargetDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl GpuTarget {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn desc(&self) -> &TargetDesc {
        &self.desc
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

struct BoundSkybox {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// Resources a compute bind group was built from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct BindKey {
    output: u64,
    skybox: Option<u64>,
}

/// Tracks which output/skybox ids are bound and which ids the live bind
/// groups were built from.
#[derive(Debug, Default)]
struct BindTracker {
    output: Option<u64>,
    skybox: Option<u64>,
    compute_built: Option<BindKey>,
    present_built: Option<u64>,
}

impl BindTracker {
    /// Returns `true` when `id` was not already the bound output.
    fn bind_output(&mut self, id: u64) -> bool {
        let changed = self.output != Some(id);
        self.output = Some(id);
        changed
    }

    fn bind_skybox(&mut self, id: u64) -> bool {
        let changed = self.skybox != Some(id);
        self.skybox = Some(id);
        changed
    }

    /// Forgets every binding that refers to the released target.
    fn release(&mut self, id: u64) {
        if self.output == Some(id) {
            self.output = None;
        }
        if self.compute_built.is_some_and(|k| k.output == id) {
            self.compute_built = None;
        }
        if self.present_built == Some(id) {
            self.present_built = None;
        }
    }

    /// Key of the compute bind group `layout` needs, if everything is bound.
    fn compute_key(&self, layout: BindingLayout) -> Option<BindKey> {
        let output = self.output?;
        let skybox = match layout {
            BindingLayout::OutputOnly => None,
            BindingLayout::Camera => Some(self.skybox?),
        };
        Some(BindKey { output, skybox })
    }

    /// The key to build a compute bind group for, or `None` when the live one
    /// is current or parameters are missing.
    fn stale_compute(&self, layout: BindingLayout) -> Option<BindKey> {
        self.compute_key(layout)
            .filter(|key| self.compute_built != Some(*key))
    }

    fn present_current(&self, target: u64) -> bool {
        self.present_built == Some(target)
    }
}

/// Tracer backend over wgpu.
///
/// Pipelines are built on first use. Bind groups are rebuilt only when the
/// bound output image or skybox changes, so a steady-state frame is one
/// uniform upload, one compute pass and one present pass recorded into the
/// frame's encoder.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    layout: BindingLayout,
    program: ComputeProgram,

    next_target_id: u64,
    camera: CameraUniform,
    binds: BindTracker,
    output: Option<wgpu::TextureView>,
    skybox: Option<BoundSkybox>,

    compute_bgl: Option<wgpu::BindGroupLayout>,
    compute_pipeline: Option<wgpu::ComputePipeline>,
    compute_bind_group: Option<wgpu::BindGroup>,
    camera_ubo: Option<wgpu::Buffer>,

    present_bgl: Option<wgpu::BindGroupLayout>,
    present_pipeline: Option<wgpu::RenderPipeline>,
    present_sampler: Option<wgpu::Sampler>,
    present_bind_group: Option<wgpu::BindGroup>,

    warned_unbound: bool,
}

impl WgpuBackend {
    pub fn new(ctx: &RenderCtx<'_>, program: ComputeProgram, layout: BindingLayout) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            surface_format: ctx.surface_format,
            layout,
            program,
            next_target_id: 1,
            camera: CameraUniform::IDENTITY,
            binds: BindTracker::default(),
            output: None,
            skybox: None,
            compute_bgl: None,
            compute_pipeline: None,
            compute_bind_group: None,
            camera_ubo: None,
            present_bgl: None,
            present_pipeline: None,
            present_sampler: None,
            present_bind_group: None,
            warned_unbound: false,
        }
    }

    /// Builds a frame renderer whose backend layout follows `binding`.
    pub fn frame_renderer(
        ctx: &RenderCtx<'_>,
        program: ComputeProgram,
        binding: ParamBinding<Skybox>,
    ) -> FrameRenderer<Self> {
        let backend = Self::new(ctx, program, binding.layout());
        FrameRenderer::new(backend, binding)
    }

    pub fn layout(&self) -> BindingLayout {
        self.layout
    }

    // ── compute ───────────────────────────────────────────────────────────

    fn compute_layout_entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: ShaderParam::Result.binding(),
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: wgpu::TextureFormat::Rgba32Float,
                view_dimension: wgpu::TextureViewDimension::D2,
            },
            count: None,
        }];

        if self.layout == BindingLayout::Camera {
            entries.extend([
                wgpu::BindGroupLayoutEntry {
                    binding: ShaderParam::CameraToWorld.binding(),
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(CameraUniform::min_binding_size()),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: ShaderParam::SkyboxTexture.binding(),
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: SKYBOX_SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ]);
        }

        entries
    }

    fn ensure_compute_pipeline(&mut self) {
        if self.compute_pipeline.is_some() {
            return;
        }

        log::debug!(
            "building compute pipeline '{}' ({:?})",
            self.program.label,
            self.layout
        );

        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.program.label.as_str()),
            source: wgpu::ShaderSource::Wgsl(self.program.source.clone()),
        });

        let entries = self.compute_layout_entries();
        let bgl = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("prism trace bgl"),
                entries: &entries,
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("prism trace pipeline layout"),
                bind_group_layouts: &[&bgl],
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("prism trace pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(self.program.entry_point.as_str()),
                compilation_options: Default::default(),
                cache: None,
            });

        self.compute_bgl = Some(bgl);
        self.compute_pipeline = Some(pipeline);
        self.compute_bind_group = None;
        self.binds.compute_built = None;
    }

    fn ensure_camera_ubo(&mut self) {
        if self.layout != BindingLayout::Camera || self.camera_ubo.is_some() {
            return;
        }

        self.camera_ubo = Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("prism camera ubo"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.compute_bind_group = None;
        self.binds.compute_built = None;
    }

    fn ensure_compute_bind_group(&mut self) {
        let Some(key) = self.binds.stale_compute(self.layout) else { return };
        let Some(bgl) = self.compute_bgl.as_ref() else { return };
        let Some(output) = self.output.as_ref() else { return };

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: ShaderParam::Result.binding(),
            resource: wgpu::BindingResource::TextureView(output),
        }];

        if self.layout == BindingLayout::Camera {
            let Some(ubo) = self.camera_ubo.as_ref() else { return };
            let Some(skybox) = self.skybox.as_ref() else { return };
            entries.extend([
                wgpu::BindGroupEntry {
                    binding: ShaderParam::CameraToWorld.binding(),
                    resource: ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: ShaderParam::SkyboxTexture.binding(),
                    resource: wgpu::BindingResource::TextureView(&skybox.view),
                },
                wgpu::BindGroupEntry {
                    binding: SKYBOX_SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(&skybox.sampler),
                },
            ]);
        }

        self.compute_bind_group = Some(self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("prism trace bind group"),
            layout: bgl,
            entries: &entries,
        }));
        self.binds.compute_built = Some(key);
    }

    // ── present ───────────────────────────────────────────────────────────

    fn ensure_present_pipeline(&mut self) {
        if self.present_pipeline.is_some() {
            return;
        }

        log::debug!("building present pipeline for {:?}", self.surface_format);

        let shader = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("prism present shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/present.wgsl").into()),
        });

        let bgl = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("prism present bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        // rgba32float is not filterable without an optional feature.
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("prism present pipeline layout"),
                bind_group_layouts: &[&bgl],
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("prism present pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        if self.present_sampler.is_none() {
            self.present_sampler = Some(self.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("prism present sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Nearest,
                min_filter: wgpu::FilterMode::Nearest,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            }));
        }

        self.present_pipeline = Some(pipeline);
        self.present_bgl = Some(bgl);
        self.present_bind_group = None;
        self.binds.present_built = None;
    }

    fn ensure_present_bind_group(&mut self, target: &GpuTarget) {
        if self.binds.present_current(target.id) {
            return;
        }
        let Some(bgl) = self.present_bgl.as_ref() else { return };
        let Some(sampler) = self.present_sampler.as_ref() else { return };

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("prism present bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&target.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        self.present_bind_group = Some(bind_group);
        self.binds.present_built = Some(target.id);
    }
}

/// The skybox sampler sits next to `_SkyboxTexture`.
const SKYBOX_SAMPLER_BINDING: u32 = 3;

impl TracerBackend for WgpuBackend {
    type Target = GpuTarget;
    type Skybox = Skybox;
    type Frame<'f> = RenderTarget<'f>;

    fn allocate_target(&mut self, desc: &TargetDesc) -> GpuTarget {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("prism trace target"),
            size: desc.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format.to_wgpu(),
            usage: desc.wgpu_usage(),
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = self.next_target_id;
        self.next_target_id += 1;

        GpuTarget {
            id,
            desc: *desc,
            texture,
            view,
        }
    }

    fn release_target(&mut self, target: GpuTarget) {
        self.binds.release(target.id);
        if self.binds.output.is_none() {
            self.output = None;
        }
        if self.binds.compute_built.is_none() {
            self.compute_bind_group = None;
        }
        if self.binds.present_built.is_none() {
            self.present_bind_group = None;
        }
        // Frees GPU memory now; wgpu keeps in-flight submissions valid.
        target.texture.destroy();
    }

    fn set_matrix(&mut self, param: ShaderParam, value: Mat4) {
        debug_assert!(param.is_matrix(), "{} is not a matrix", param.name());
        self.camera.set(param, value);
    }

    fn set_output(&mut self, target: &GpuTarget) {
        if self.binds.bind_output(target.id) {
            self.output = Some(target.view.clone());
        }
    }

    fn set_skybox(&mut self, skybox: &Skybox) {
        if self.binds.bind_skybox(skybox.id()) {
            self.skybox = Some(BoundSkybox {
                view: skybox.view().clone(),
                sampler: skybox.sampler().clone(),
            });
        }
    }

    fn dispatch(&mut self, frame: &mut RenderTarget<'_>, groups: WorkgroupCount) {
        self.ensure_compute_pipeline();
        self.ensure_camera_ubo();
        self.ensure_compute_bind_group();

        if let Some(ubo) = self.camera_ubo.as_ref() {
            self.queue.write_buffer(ubo, 0, bytemuck::bytes_of(&self.camera));
        }

        let Some(pipeline) = self.compute_pipeline.as_ref() else { return };
        let bind_group = match self.binds.compute_built {
            Some(key) if self.binds.compute_key(self.layout) == Some(key) => {
                self.compute_bind_group.as_ref()
            }
            _ => None,
        };
        let Some(bind_group) = bind_group else {
            if !self.warned_unbound {
                log::warn!("trace dispatch skipped: parameters not bound");
                self.warned_unbound = true;
            }
            return;
        };

        let mut cpass = frame.encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("prism trace pass"),
            timestamp_writes: None,
        });
        cpass.set_pipeline(pipeline);
        cpass.set_bind_group(0, bind_group, &[]);
        cpass.dispatch_workgroups(groups.x, groups.y, groups.z);
    }

    fn present(&mut self, frame: &mut RenderTarget<'_>, target: &GpuTarget) {
        self.ensure_present_pipeline();
        self.ensure_present_bind_group(target);

        let Some(pipeline) = self.present_pipeline.as_ref() else { return };
        let Some(bind_group) = self.present_bind_group.as_ref() else { return };

        let mut rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("prism present pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: frame.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, bind_group, &[]);
        rpass.draw(0..3, 0..1);
    }
}
