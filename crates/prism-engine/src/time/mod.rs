//! Frame timing.
//!
//! One `FrameClock` per window; `tick()` once per traced frame. The studio
//! drives its camera animation from the resulting `FrameTime`.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
