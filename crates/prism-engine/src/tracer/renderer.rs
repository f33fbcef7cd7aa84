use log::{debug, trace};

use crate::coords::Viewport;

use super::backend::TracerBackend;
use super::dispatch::WorkgroupCount;
use super::params::{BindingLayout, CameraMatrices, ShaderParam};
use super::target::{TargetDesc, TargetState};

/// Per-call inputs, snapshotted by the caller for this frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameContext {
    /// Current display size in physical pixels.
    pub viewport: Viewport,
    /// Active camera. Ignored with [`ParamBinding::OutputOnly`].
    pub camera: CameraMatrices,
}

impl FrameContext {
    #[inline]
    pub fn new(viewport: Viewport, camera: CameraMatrices) -> Self {
        Self { viewport, camera }
    }
}

/// Which parameters are forwarded besides `Result`.
pub enum ParamBinding<S> {
    /// Bind only the output image.
    OutputOnly,
    /// Bind the output image, both camera matrices and `skybox`.
    Camera { skybox: S },
}

impl<S> ParamBinding<S> {
    pub fn layout(&self) -> BindingLayout {
        match self {
            ParamBinding::OutputOnly => BindingLayout::OutputOnly,
            ParamBinding::Camera { .. } => BindingLayout::Camera,
        }
    }

    pub fn skybox(&self) -> Option<&S> {
        match self {
            ParamBinding::OutputOnly => None,
            ParamBinding::Camera { skybox } => Some(skybox),
        }
    }
}

struct OwnedTarget<T> {
    desc: TargetDesc,
    handle: T,
}

/// Releases a stale image in `slot` and allocates one for `viewport` if the
/// slot is empty. Returns the current image and whether it is new.
fn sync_target<'a, B: TracerBackend>(
    backend: &mut B,
    slot: &'a mut Option<OwnedTarget<B::Target>>,
    viewport: Viewport,
) -> (&'a OwnedTarget<B::Target>, bool) {
    if let Some(old) = slot.take_if(|t| !t.desc.matches(viewport)) {
        debug!(
            "releasing tracer target {}x{}",
            old.desc.width, old.desc.height
        );
        backend.release_target(old.handle);
    }

    let allocated = slot.is_none();
    let target = slot.get_or_insert_with(|| {
        let desc = TargetDesc::for_viewport(viewport);
        debug!("allocating tracer target {}x{}", desc.width, desc.height);
        let handle = backend.allocate_target(&desc);
        OwnedTarget { desc, handle }
    });
    (target, allocated)
}

/// Owns the output image and drives one trace per frame.
///
/// Per `render_frame` call, in order:
/// 1. reallocate the output image if its size differs from the viewport,
/// 2. bind camera matrices, skybox and output,
/// 3. dispatch `ceil(w/8) x ceil(h/8) x 1` workgroups,
/// 4. present the whole output image onto the frame's display surface.
///
/// The output image is released when the renderer is dropped.
pub struct FrameRenderer<B: TracerBackend> {
    backend: B,
    binding: ParamBinding<B::Skybox>,
    target: Option<OwnedTarget<B::Target>>,
    frames_rendered: u64,
}

impl<B: TracerBackend> FrameRenderer<B> {
    pub fn new(backend: B, binding: ParamBinding<B::Skybox>) -> Self {
        Self {
            backend,
            binding,
            target: None,
            frames_rendered: 0,
        }
    }

    /// Traces and presents one frame.
    pub fn render_frame(&mut self, frame: &mut B::Frame<'_>, ctx: &FrameContext) {
        let Self {
            backend,
            binding,
            target,
            frames_rendered,
        } = self;
        let (target, _) = sync_target(backend, target, ctx.viewport);

        if let ParamBinding::Camera { skybox } = binding {
            backend.set_matrix(ShaderParam::CameraToWorld, ctx.camera.camera_to_world);
            backend.set_matrix(
                ShaderParam::CameraInverseProjection,
                ctx.camera.inverse_projection(),
            );
            backend.set_skybox(skybox);
        }
        backend.set_output(&target.handle);

        let groups = WorkgroupCount::for_viewport(ctx.viewport);
        trace!("dispatch {}x{}x{}", groups.x, groups.y, groups.z);
        backend.dispatch(frame, groups);
        backend.present(frame, &target.handle);

        *frames_rendered += 1;
    }

    /// Makes the output image match `viewport`.
    ///
    /// Returns `true` when a new image was allocated. GPU images cannot be
    /// resized in place, so a size change releases the old image first.
    pub fn ensure_target(&mut self, viewport: Viewport) -> bool {
        let (_, allocated) = sync_target(&mut self.backend, &mut self.target, viewport);
        allocated
    }

    pub fn target_state(&self) -> TargetState {
        match &self.target {
            None => TargetState::Unallocated,
            Some(t) => TargetState::Allocated {
                width: t.desc.width,
                height: t.desc.height,
            },
        }
    }

    pub fn target_desc(&self) -> Option<&TargetDesc> {
        self.target.as_ref().map(|t| &t.desc)
    }

    pub fn binding(&self) -> &ParamBinding<B::Skybox> {
        &self.binding
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

impl<B: TracerBackend> Drop for FrameRenderer<B> {
    fn drop(&mut self) {
        if let Some(t) = self.target.take() {
            self.backend.release_target(t.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Allocate(TargetDesc, u32),
        Release(u32),
        Matrix(ShaderParam, Mat4),
        Output(u32),
        Skybox(&'static str),
        Dispatch(WorkgroupCount),
        Present { target: (u32, u32), display: (u32, u32) },
    }

    #[derive(Debug, Clone, Copy)]
    struct MockTarget {
        id: u32,
        width: u32,
        height: u32,
    }

    struct MockDisplay {
        width: u32,
        height: u32,
    }

    #[derive(Default)]
    struct RecordingBackend {
        next_id: u32,
        events: Vec<Event>,
        /// Shared so releases stay observable after the renderer is dropped.
        released: Rc<Cell<u32>>,
    }

    impl RecordingBackend {
        fn allocations(&self) -> Vec<&TargetDesc> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Event::Allocate(d, _) => Some(d),
                    _ => None,
                })
                .collect()
        }

        fn releases(&self) -> usize {
            self.events.iter().filter(|e| matches!(e, Event::Release(_))).count()
        }
    }

    impl TracerBackend for RecordingBackend {
        type Target = MockTarget;
        type Skybox = &'static str;
        type Frame<'f> = MockDisplay;

        fn allocate_target(&mut self, desc: &TargetDesc) -> MockTarget {
            self.next_id += 1;
            self.events.push(Event::Allocate(*desc, self.next_id));
            MockTarget {
                id: self.next_id,
                width: desc.width,
                height: desc.height,
            }
        }

        fn release_target(&mut self, target: MockTarget) {
            self.events.push(Event::Release(target.id));
            self.released.set(self.released.get() + 1);
        }

        fn set_matrix(&mut self, param: ShaderParam, value: Mat4) {
            self.events.push(Event::Matrix(param, value));
        }

        fn set_output(&mut self, target: &MockTarget) {
            self.events.push(Event::Output(target.id));
        }

        fn set_skybox(&mut self, skybox: &&'static str) {
            self.events.push(Event::Skybox(*skybox));
        }

        fn dispatch(&mut self, _frame: &mut MockDisplay, groups: WorkgroupCount) {
            self.events.push(Event::Dispatch(groups));
        }

        fn present(&mut self, frame: &mut MockDisplay, target: &MockTarget) {
            self.events.push(Event::Present {
                target: (target.width, target.height),
                display: (frame.width, frame.height),
            });
        }
    }

    fn camera() -> CameraMatrices {
        CameraMatrices::new(
            Mat4::from_translation(Vec3::new(0.0, 1.0, 5.0)),
            Mat4::perspective_rh(1.0, 4.0 / 3.0, 0.1, 100.0),
        )
    }

    fn renderer() -> FrameRenderer<RecordingBackend> {
        FrameRenderer::new(
            RecordingBackend::default(),
            ParamBinding::Camera { skybox: "sky" },
        )
    }

    fn render(r: &mut FrameRenderer<RecordingBackend>, w: u32, h: u32) {
        let mut display = MockDisplay { width: w, height: h };
        r.render_frame(&mut display, &FrameContext::new(Viewport::new(w, h), camera()));
    }

    fn param_of(e: &Event) -> Option<ShaderParam> {
        match e {
            Event::Matrix(p, _) => Some(*p),
            Event::Output(_) => Some(ShaderParam::Result),
            Event::Skybox(_) => Some(ShaderParam::SkyboxTexture),
            _ => None,
        }
    }

    #[test]
    fn unchanged_viewport_does_not_reallocate() {
        let mut r = renderer();
        assert!(r.ensure_target(Viewport::new(800, 600)));
        assert!(!r.ensure_target(Viewport::new(800, 600)));
        assert_eq!(r.backend().allocations().len(), 1);
        assert_eq!(r.backend().releases(), 0);
    }

    #[test]
    fn resize_releases_once_and_allocates_new_size() {
        let mut r = renderer();
        r.ensure_target(Viewport::new(800, 600));
        r.backend_mut().events.clear();

        assert!(r.ensure_target(Viewport::new(1024, 768)));

        let b = r.backend();
        assert_eq!(b.events[0], Event::Release(1));
        assert_eq!(b.releases(), 1);
        let allocs = b.allocations();
        assert_eq!(allocs.len(), 1);
        assert_eq!((allocs[0].width, allocs[0].height), (1024, 768));
        assert_eq!(
            r.target_state(),
            TargetState::Allocated { width: 1024, height: 768 }
        );
    }

    #[test]
    fn single_dimension_change_reallocates() {
        let mut r = renderer();
        r.ensure_target(Viewport::new(800, 600));
        assert!(r.ensure_target(Viewport::new(800, 601)));
        assert_eq!(r.backend().allocations().len(), 2);
    }

    #[test]
    fn lazily_allocated_on_first_frame() {
        let mut r = renderer();
        assert_eq!(r.target_state(), TargetState::Unallocated);
        render(&mut r, 320, 240);
        assert_eq!(r.target_state(), TargetState::Allocated { width: 320, height: 240 });
        assert_eq!(r.frames_rendered(), 1);
    }

    #[test]
    fn dispatch_uses_rounded_up_groups() {
        let mut r = renderer();
        render(&mut r, 800, 600);
        render(&mut r, 801, 600);
        let groups: Vec<_> = r
            .backend()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Dispatch(g) => Some(*g),
                _ => None,
            })
            .collect();
        assert_eq!(
            groups,
            [WorkgroupCount::new(100, 75, 1), WorkgroupCount::new(101, 75, 1)]
        );
    }

    #[test]
    fn all_parameters_bound_before_each_dispatch() {
        let mut r = renderer();
        render(&mut r, 800, 600);
        render(&mut r, 800, 600);
        render(&mut r, 1024, 768);

        let mut seen: Vec<ShaderParam> = Vec::new();
        let mut dispatches = 0;
        for e in &r.backend().events {
            match e {
                Event::Allocate(..) => seen.clear(),
                Event::Dispatch(_) => {
                    for &p in ShaderParam::required(r.binding().layout()) {
                        assert!(seen.contains(&p), "{} not bound before dispatch", p.name());
                    }
                    dispatches += 1;
                }
                other => seen.extend(param_of(other)),
            }
        }
        assert_eq!(dispatches, 3);
    }

    #[test]
    fn matrices_forwarded_with_inverse_projection() {
        let mut r = renderer();
        render(&mut r, 64, 64);
        let cam = camera();
        let events = &r.backend().events;
        assert!(events.contains(&Event::Matrix(ShaderParam::CameraToWorld, cam.camera_to_world)));
        assert!(events.contains(&Event::Matrix(
            ShaderParam::CameraInverseProjection,
            cam.projection.inverse()
        )));
        assert!(events.contains(&Event::Skybox("sky")));
    }

    #[test]
    fn output_only_binds_just_result() {
        let mut r: FrameRenderer<RecordingBackend> =
            FrameRenderer::new(RecordingBackend::default(), ParamBinding::OutputOnly);
        render(&mut r, 16, 16);
        let params: Vec<_> = r.backend().events.iter().filter_map(param_of).collect();
        assert_eq!(r.binding().layout(), BindingLayout::OutputOnly);
        assert_eq!(params, ShaderParam::required(BindingLayout::OutputOnly));
    }

    #[test]
    fn every_allocation_is_linear_float4() {
        let mut r = renderer();
        for (w, h) in [(1, 1), (800, 600), (1024, 768), (7, 3)] {
            render(&mut r, w, h);
        }
        for d in r.backend().allocations() {
            assert_eq!(d.format.channels(), 4);
            assert!(d.format.is_float());
            assert_eq!(d.color_space, crate::tracer::ColorSpace::Linear);
            assert_eq!(d.depth_bits, 0);
            assert!(d.random_write);
        }
    }

    #[test]
    fn present_copies_whole_target_after_dispatch() {
        let mut r = renderer();
        render(&mut r, 800, 600);
        let events = &r.backend().events;
        let dispatch = events.iter().position(|e| matches!(e, Event::Dispatch(_)));
        let present = events.iter().position(|e| matches!(e, Event::Present { .. }));
        assert!(dispatch < present);
        assert_eq!(
            events.last(),
            Some(&Event::Present { target: (800, 600), display: (800, 600) })
        );
    }

    #[test]
    fn every_frame_traces_into_current_target() {
        let mut r = renderer();
        render(&mut r, 800, 600);
        render(&mut r, 1024, 768);
        render(&mut r, 1024, 768);
        assert_eq!(r.frames_rendered(), 3);

        let outputs: Vec<u32> = r
            .backend()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Output(id) => Some(*id),
                _ => None,
            })
            .collect();
        assert_eq!(outputs, [1, 2, 2]);

        let presents = r
            .backend()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Present { .. }))
            .count();
        assert_eq!(presents, 3);
    }

    #[test]
    fn drop_releases_target() {
        let released = Rc::new(Cell::new(0));
        let backend = RecordingBackend {
            released: Rc::clone(&released),
            ..Default::default()
        };
        let mut r = FrameRenderer::new(backend, ParamBinding::Camera { skybox: "sky" });
        render(&mut r, 10, 10);
        assert_eq!(released.get(), 0);
        drop(r);
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn drop_without_frames_releases_nothing() {
        let released = Rc::new(Cell::new(0));
        let backend = RecordingBackend {
            released: Rc::clone(&released),
            ..Default::default()
        };
        drop(FrameRenderer::new(backend, ParamBinding::<&'static str>::OutputOnly));
        assert_eq!(released.get(), 0);
    }
}
