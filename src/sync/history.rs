//! Bounded history of decoded timecode observations

use std::collections::VecDeque;

/// One decoded frame as seen by the clock discipline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LtcSample {
    /// Monotonic time the frame finished decoding, in seconds
    pub capture_time: f64,
    /// Decoded timecode in seconds since midnight
    pub tc_seconds: f64,
}

impl LtcSample {
    pub fn new(capture_time: f64, tc_seconds: f64) -> Self {
        Self {
            capture_time,
            tc_seconds,
        }
    }

    /// Timecode this sample implies at `now`
    pub fn projected(&self, now: f64) -> f64 {
        self.tc_seconds + (now - self.capture_time).max(0.0)
    }
}

/// FIFO of the most recent samples; the oldest is evicted on overflow
#[derive(Debug, Clone)]
pub struct SampleHistory {
    samples: VecDeque<LtcSample>,
    capacity: usize,
    evicted: u64,
}

impl SampleHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Append a sample, returning the one evicted to make room
    pub fn push(&mut self, sample: LtcSample) -> Option<LtcSample> {
        let evicted = if self.samples.len() == self.capacity {
            self.evicted += 1;
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// The newest `count` samples, oldest first
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &LtcSample> {
        self.samples.range(self.samples.len().saturating_sub(count)..)
    }

    pub fn latest(&self) -> Option<&LtcSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples evicted since construction
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let mut history = SampleHistory::new(3);
        for i in 0..5 {
            history.push(LtcSample::new(i as f64, i as f64));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.evicted(), 2);
        let times: Vec<f64> = history.recent(10).map(|s| s.capture_time).collect();
        assert_eq!(times, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_recent_window() {
        let mut history = SampleHistory::new(15);
        for i in 0..8 {
            history.push(LtcSample::new(i as f64, 0.0));
        }

        let times: Vec<f64> = history.recent(3).map(|s| s.capture_time).collect();
        assert_eq!(times, vec![5.0, 6.0, 7.0]);
        assert_eq!(history.latest().map(|s| s.capture_time), Some(7.0));
    }

    #[test]
    fn test_projection_ignores_negative_age() {
        let sample = LtcSample::new(10.0, 100.0);
        assert_eq!(sample.projected(10.5), 100.5);
        assert_eq!(sample.projected(9.0), 100.0);
    }
}
