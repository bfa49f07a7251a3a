//! Decaying peak meter used to gate decoding on signal presence

/// Peak follower with exponential release
#[derive(Debug, Clone)]
pub struct LevelMeter {
    peak: f32,
    /// Per-sample release factor
    decay: f32,
}

impl LevelMeter {
    pub fn new(decay: f32) -> Self {
        Self {
            peak: 0.0,
            decay: decay.clamp(0.0, 1.0),
        }
    }

    /// Run a segment through the meter and return the level after it
    pub fn process(&mut self, samples: &[f32]) -> f32 {
        for sample in samples {
            self.peak = (self.peak * self.decay).max(sample.abs().min(1.0));
        }
        self.peak
    }

    /// Current level in 0.0..=1.0
    pub fn level(&self) -> f32 {
        self.peak
    }

    pub fn reset(&mut self) {
        self.peak = 0.0;
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(0.9999)
    }
}
