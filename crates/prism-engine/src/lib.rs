//! Prism engine crate.
//!
//! Owns the platform + GPU runtime and the per-frame compute ray tracer
//! dispatch (`tracer`). Higher layers (studio, tools) drive it through
//! `core::App`.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod tracer;
