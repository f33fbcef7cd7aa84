//! Pixel-space types shared by the runtime and the tracer.
//!
//! Canonical space for GPU resources:
//! - Physical pixels (one texel per pixel)
//! - Origin top-left
//! - +X right, +Y down

mod viewport;

pub use viewport::Viewport;
