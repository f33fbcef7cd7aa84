use anyhow::Result;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use prism_engine::core::{App, AppControl, FrameCtx};
use prism_engine::render::RenderCtx;
use prism_engine::tracer::{
    ComputeProgram, FrameContext, FrameRenderer, ParamBinding, Skybox, WgpuBackend,
};

use crate::camera::OrbitCamera;
use crate::config::{Program, StudioConfig};
use crate::sky;

/// Studio application: one window, one tracer, an auto-orbiting camera.
pub struct StudioApp {
    config: StudioConfig,
    camera: OrbitCamera,
    /// Built on the first frame, once device handles exist.
    renderer: Option<FrameRenderer<WgpuBackend>>,
}

impl StudioApp {
    pub fn new(config: StudioConfig) -> Self {
        Self {
            config,
            camera: OrbitCamera::default(),
            renderer: None,
        }
    }
}

fn build_renderer(ctx: &RenderCtx<'_>, config: &StudioConfig) -> Result<FrameRenderer<WgpuBackend>> {
    let renderer = match config.program {
        Program::Trace => {
            let skybox = match &config.skybox {
                Some(path) => Skybox::from_path(ctx, path)?,
                None => Skybox::from_image(ctx, &sky::procedural_sky())?,
            };
            let program = ComputeProgram::wgsl("prism trace", include_str!("../shaders/trace.wgsl"));
            WgpuBackend::frame_renderer(ctx, program, ParamBinding::Camera { skybox })
        }
        Program::OutputOnly => {
            let program =
                ComputeProgram::wgsl("prism uv gradient", include_str!("../shaders/uv_gradient.wgsl"));
            WgpuBackend::frame_renderer(ctx, program, ParamBinding::OutputOnly)
        }
    };
    log::info!("tracer ready ({:?})", config.program);
    Ok(renderer)
}

impl App for StudioApp {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.camera.advance(ctx.time.dt);
        let camera = self.camera.matrices(ctx.viewport().aspect());

        let config = &self.config;
        let renderer = &mut self.renderer;
        let mut setup_error = None;

        let control = ctx.render(|rctx, target| {
            if renderer.is_none() {
                match build_renderer(rctx, config) {
                    Ok(r) => *renderer = Some(r),
                    Err(e) => {
                        setup_error = Some(e);
                        return;
                    }
                }
            }
            let Some(r) = renderer.as_mut() else { return };
            r.render_frame(target, &FrameContext::new(rctx.viewport, camera));
        });

        if let Some(e) = setup_error {
            log::error!("failed to set up tracer: {e:#}");
            return AppControl::Exit;
        }

        if ctx.time.frame_index % 600 == 0 {
            log::debug!(
                "frame {} at {}x{}",
                ctx.time.frame_index,
                ctx.viewport().width,
                ctx.viewport().height
            );
        }

        control
    }
}
