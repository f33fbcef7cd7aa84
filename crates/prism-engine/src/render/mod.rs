//! Renderer-facing contexts.
//!
//! `RenderCtx` carries the device handles a renderer needs to build its GPU
//! resources; `RenderTarget` is the encoder + swapchain view of the frame being
//! recorded. The tracer backend consumes both.

mod ctx;

pub use ctx::{RenderCtx, RenderTarget};
