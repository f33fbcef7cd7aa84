use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Clamped time since the previous tick, in seconds.
    pub dt: f32,

    /// Sum of all clamped deltas so far, in seconds.
    ///
    /// Animation driven from this value pauses across stalls instead of
    /// jumping ahead.
    pub elapsed: f64,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Produces `FrameTime` snapshots with clamped deltas.
///
/// The lower clamp avoids zero deltas from tight loops; the upper clamp keeps
/// animation stable after the window was minimized or the debugger paused.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: f64,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            elapsed: 0.0,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the delta baseline without touching `elapsed` or the frame index.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);

        self.last = now;
        self.elapsed += dt.as_secs_f64();

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed,
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> (FrameClock, Instant) {
        let clock = FrameClock::with_clamps(Duration::from_millis(1), Duration::from_millis(100));
        let start = clock.last;
        (clock, start)
    }

    #[test]
    fn long_stall_is_clamped() {
        let (mut clock, start) = clock();
        let ft = clock.tick_at(start + Duration::from_secs(5));
        assert!((ft.dt - 0.1).abs() < 1e-6);
        assert!((ft.elapsed - 0.1).abs() < 1e-9);
    }

    #[test]
    fn tiny_delta_is_raised_to_minimum() {
        let (mut clock, start) = clock();
        let ft = clock.tick_at(start);
        assert!((ft.dt - 0.001).abs() < 1e-6);
    }

    #[test]
    fn frame_index_and_elapsed_accumulate() {
        let (mut clock, start) = clock();
        let a = clock.tick_at(start + Duration::from_millis(16));
        let b = clock.tick_at(start + Duration::from_millis(32));
        assert_eq!(a.frame_index, 0);
        assert_eq!(b.frame_index, 1);
        assert!((b.elapsed - 0.032).abs() < 1e-6);
    }
}
