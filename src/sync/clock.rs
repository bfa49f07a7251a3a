//! Monotonic time sources and the free-running output clock

use std::time::Instant;

/// Backward steps up to this size are reordered readings, not anomalies
pub const STEP_TOLERANCE: f64 = 0.01;

/// Source of strictly non-decreasing time, in seconds
pub trait MonotonicClock: Send + Sync {
    fn now(&self) -> f64;
}

/// [`Instant`]-based clock counting from its creation
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Outcome of advancing the output clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockStep {
    /// First reading; only the reference point was recorded
    Initialized,
    /// Elapsed time accepted (applied only while running)
    Applied(f64),
    /// Step backwards beyond [`STEP_TOLERANCE`] or larger than the limit, discarded
    Anomaly(f64),
}

/// Output time, advanced by the monotonic clock while running
#[derive(Debug, Clone, Default)]
pub struct OutputClock {
    /// Output time in timecode seconds
    internal_time: f64,
    /// Monotonic reading `internal_time` refers to
    base: Option<f64>,
    running: bool,
}

impl OutputClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the reference point to `now`, adding the elapsed time while running
    ///
    /// A reading slightly behind the reference point counts as zero elapsed
    /// time and leaves the reference point where it is.
    pub fn advance(&mut self, now: f64, max_delta: f64) -> ClockStep {
        let Some(base) = self.base else {
            self.base = Some(now);
            return ClockStep::Initialized;
        };

        let delta = now - base;
        if (-STEP_TOLERANCE..0.0).contains(&delta) {
            return ClockStep::Applied(0.0);
        }
        self.base = Some(now);
        if !(0.0..=max_delta).contains(&delta) {
            return ClockStep::Anomaly(delta);
        }
        if self.running {
            self.internal_time += delta;
        }
        ClockStep::Applied(delta)
    }

    /// Output time extrapolated to `now` without moving the reference point
    ///
    /// `now` may precede the reference point, e.g. a capture timestamp taken
    /// before the last tick; the projection then runs backwards.
    pub fn projected(&self, now: f64) -> f64 {
        match (self.running, self.base) {
            (true, Some(base)) => self.internal_time + (now - base),
            _ => self.internal_time,
        }
    }

    /// Jump to `time` as of `now` and run
    pub fn resync(&mut self, time: f64, now: f64) {
        self.internal_time = time;
        self.base = Some(now);
        self.running = true;
    }

    /// Hold at `time` as of `now`
    pub fn pause_at(&mut self, time: f64, now: f64) {
        self.internal_time = time;
        self.base = Some(now);
        self.running = false;
    }

    /// Shift the output time without touching the reference point
    pub fn nudge(&mut self, offset: f64) {
        self.internal_time += offset;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Output time as of the last advance
    pub fn time(&self) -> f64 {
        self.internal_time
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}
