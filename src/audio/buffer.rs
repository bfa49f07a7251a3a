//! Lock-free ring buffer for captured audio
//!
//! Single-producer single-consumer hand-off between the capture callback and
//! the task that feeds the decoder. The callback must never block, so a full
//! buffer drops the incoming segment and counts an overflow.

use crossbeam::queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mono audio segment with its capture timestamp
#[derive(Debug, Clone)]
pub struct AudioSegment {
    /// Mono samples (f32)
    pub samples: Vec<f32>,
    /// Monotonic time the last sample was captured, in seconds
    pub timestamp: f64,
    /// Segment sequence number
    pub sequence: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, timestamp: f64, sequence: u32) -> Self {
        Self {
            samples,
            timestamp,
            sequence,
        }
    }

    /// Get segment duration in seconds
    pub fn duration(&self, sample_rate: u32) -> f64 {
        self.samples.len() as f64 / sample_rate as f64
    }
}

/// Lock-free ring buffer of audio segments
pub struct RingBuffer {
    queue: ArrayQueue<AudioSegment>,
    overflow_count: AtomicUsize,
    underrun_count: AtomicUsize,
}

impl RingBuffer {
    /// Create a new ring buffer with the specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            overflow_count: AtomicUsize::new(0),
            underrun_count: AtomicUsize::new(0),
        }
    }

    /// Push a segment into the buffer
    /// Returns false if buffer is full (overflow)
    pub fn push(&self, segment: AudioSegment) -> bool {
        match self.queue.push(segment) {
            Ok(()) => true,
            Err(_) => {
                self.overflow_count.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Pop a segment from the buffer
    /// Returns None if buffer is empty (underrun)
    pub fn pop(&self) -> Option<AudioSegment> {
        let segment = self.queue.pop();
        if segment.is_none() {
            self.underrun_count.fetch_add(1, Ordering::Relaxed);
        }
        segment
    }

    /// Pop everything currently queued, oldest first
    pub fn drain(&self) -> impl Iterator<Item = AudioSegment> + '_ {
        std::iter::from_fn(move || self.queue.pop())
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Get current buffer length
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Get buffer capacity
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Get overflow count
    pub fn overflow_count(&self) -> usize {
        self.overflow_count.load(Ordering::Relaxed)
    }

    /// Get underrun count
    pub fn underrun_count(&self) -> usize {
        self.underrun_count.load(Ordering::Relaxed)
    }

    /// Reset statistics
    pub fn reset_stats(&self) {
        self.overflow_count.store(0, Ordering::Relaxed);
        self.underrun_count.store(0, Ordering::Relaxed);
    }
}

/// Thread-safe handle to a ring buffer
pub type SharedRingBuffer = Arc<RingBuffer>;

/// Create a new shared ring buffer
pub fn create_shared_buffer(capacity: usize) -> SharedRingBuffer {
    Arc::new(RingBuffer::new(capacity))
}
