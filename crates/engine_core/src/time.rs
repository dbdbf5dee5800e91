//! Time management for the substepped game loop.

/// Default number of fixed substeps each rendered frame is divided into.
pub const DEFAULT_STEPS_PER_FRAME: u32 = 5;
/// Default cap on a single frame's elapsed time, in seconds.
pub const DEFAULT_MAX_FRAME_DELTA: f32 = 0.05;

/// The fixed slices one frame is divided into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Substeps {
    /// Duration of each slice in seconds.
    pub dt: f32,
    /// Number of slices to run.
    pub count: u32,
}

impl Substeps {
    /// Total simulated time covered by all slices.
    pub fn total(&self) -> f32 {
        self.dt * self.count as f32
    }
}

/// Manages frame timing, delta capping and simulated time.
#[derive(Debug)]
pub struct Time {
    /// Total simulated time, advanced one substep at a time.
    sim_elapsed: f64,
    /// Substeps per rendered frame.
    steps_per_frame: u32,
    /// Upper bound on the elapsed time of one frame.
    max_frame_delta: f32,
}

impl Default for Time {
    fn default() -> Self {
        Self::new(DEFAULT_STEPS_PER_FRAME, DEFAULT_MAX_FRAME_DELTA)
    }
}

impl Time {
    /// Create a new time manager.
    pub fn new(steps_per_frame: u32, max_frame_delta: f32) -> Self {
        Self {
            sim_elapsed: 0.0,
            steps_per_frame: steps_per_frame.max(1),
            max_frame_delta: max_frame_delta.max(0.0),
        }
    }

    /// Start a frame that took `elapsed_seconds` of wall time. The elapsed
    /// time is capped at `max_frame_delta` before slicing.
    pub fn begin_frame(&mut self, elapsed_seconds: f32) -> Substeps {
        let elapsed = if elapsed_seconds.is_finite() {
            elapsed_seconds.max(0.0)
        } else {
            0.0
        };
        if elapsed > self.max_frame_delta {
            log::trace!("Frame of {:.3}s capped to {:.3}s", elapsed, self.max_frame_delta);
        }
        Substeps {
            dt: elapsed.min(self.max_frame_delta) / self.steps_per_frame as f32,
            count: self.steps_per_frame,
        }
    }

    /// Record that one substep of `dt` seconds was simulated.
    pub fn advance(&mut self, dt: f32) {
        self.sim_elapsed += dt as f64;
    }

    /// Total simulated time in seconds.
    pub fn now(&self) -> f64 {
        self.sim_elapsed
    }
}
