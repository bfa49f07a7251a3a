//! Audio capture from an input device
//!
//! The cpal stream lives on a dedicated thread. Its callback extracts the
//! channel carrying LTC, stamps the segment with the shared monotonic clock
//! and pushes it into the ring buffer without blocking.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::audio::buffer::{AudioSegment, SharedRingBuffer};
use crate::audio::device::AudioDevice;
use crate::constants::DEFAULT_SAMPLE_RATE;
use crate::error::AudioError;
use crate::sync::MonotonicClock;

/// Copy one channel out of an interleaved buffer
pub fn extract_channel(data: &[f32], channels: u16, channel: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    data.iter()
        .skip(channel as usize)
        .step_by(channels)
        .copied()
        .collect()
}

/// Single-channel capture from one input device
pub struct AudioCapture {
    device_name: String,

    /// Input channel carrying LTC
    channel: u16,

    /// Whether capture is running
    running: Arc<AtomicBool>,

    /// Output buffer for captured segments
    output_buffer: SharedRingBuffer,

    /// Source of segment timestamps, shared with the sync engine
    clock: Arc<dyn MonotonicClock>,

    /// Stream thread handle
    thread_handle: Option<JoinHandle<()>>,

    /// Channel for stream errors
    error_rx: Option<Receiver<AudioError>>,

    /// Current sequence number
    sequence: Arc<AtomicU32>,

    /// Total mono samples captured
    samples_captured: Arc<AtomicU64>,

    /// Stream configuration
    config: StreamConfig,
}

impl AudioCapture {
    /// Create a capture for `device`, reading `channel` at `sample_rate`
    pub fn new(
        device: &AudioDevice,
        sample_rate: Option<u32>,
        channel: u16,
        clock: Arc<dyn MonotonicClock>,
        output_buffer: SharedRingBuffer,
    ) -> Result<Self, AudioError> {
        let default_config = device.default_input_config()?;
        let channels = default_config.channels();
        if channel >= channels {
            return Err(AudioError::UnsupportedFormat(format!(
                "channel {} requested, device has {}",
                channel, channels
            )));
        }

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)),
            buffer_size: cpal::BufferSize::Default,
        };

        Ok(Self {
            device_name: device.name.clone(),
            channel,
            running: Arc::new(AtomicBool::new(false)),
            output_buffer,
            clock,
            thread_handle: None,
            error_rx: None,
            sequence: Arc::new(AtomicU32::new(0)),
            samples_captured: Arc::new(AtomicU64::new(0)),
            config,
        })
    }

    /// Start capturing audio from `device`
    pub fn start(&mut self, device: AudioDevice) -> Result<(), AudioError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let (error_tx, error_rx) = bounded::<AudioError>(16);
        self.error_rx = Some(error_rx);

        let running = self.running.clone();
        let running_for_loop = self.running.clone();
        let output_buffer = self.output_buffer.clone();
        let clock = self.clock.clone();
        let sequence = self.sequence.clone();
        let samples_captured = self.samples_captured.clone();
        let config = self.config.clone();
        let channels = self.config.channels;
        let channel = self.channel;

        // Reset counters
        self.sequence.store(0, Ordering::SeqCst);
        self.samples_captured.store(0, Ordering::SeqCst);

        running.store(true, Ordering::SeqCst);
        tracing::info!(
            "Capturing channel {} of '{}' at {} Hz",
            channel,
            self.device_name,
            config.sample_rate.0
        );

        let handle = thread::Builder::new()
            .name("ltc-capture".to_string())
            .spawn(move || {
                let cpal_device = device.into_inner();

                let stream = cpal_device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if !running.load(Ordering::Relaxed) {
                            return;
                        }

                        let timestamp = clock.now();
                        let seq = sequence.fetch_add(1, Ordering::Relaxed);
                        let samples = extract_channel(data, channels, channel);
                        samples_captured.fetch_add(samples.len() as u64, Ordering::Relaxed);

                        // Dropped on overflow; the decoder resynchronises on the next frame
                        let _ = output_buffer.push(AudioSegment::new(samples, timestamp, seq));
                    },
                    move |err| {
                        let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
                    },
                    None,
                );

                match stream {
                    Ok(stream) => {
                        if let Err(e) = stream.play() {
                            tracing::error!("Failed to start stream: {}", e);
                            return;
                        }

                        // Keep thread alive while running
                        while running_for_loop.load(Ordering::Relaxed) {
                            thread::sleep(std::time::Duration::from_millis(10));
                        }

                        // Stream is dropped here, stopping capture
                    }
                    Err(e) => {
                        tracing::error!("Failed to build stream: {}", e);
                    }
                }
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        self.thread_handle = Some(handle);
        Ok(())
    }

    /// Stop capturing audio
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    /// Check if capture is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get total samples captured
    pub fn samples_captured(&self) -> u64 {
        self.samples_captured.load(Ordering::Relaxed)
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Get channel count of the device stream
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Check for errors
    pub fn check_errors(&self) -> Option<AudioError> {
        self.error_rx.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_channel() {
        let interleaved = [0.0, 1.0, 0.1, 1.1, 0.2, 1.2];
        assert_eq!(extract_channel(&interleaved, 2, 0), vec![0.0, 0.1, 0.2]);
        assert_eq!(extract_channel(&interleaved, 2, 1), vec![1.0, 1.1, 1.2]);
        assert_eq!(extract_channel(&interleaved, 1, 0), interleaved.to_vec());
    }

    #[test]
    fn test_extract_channel_out_of_range() {
        assert!(extract_channel(&[0.0, 1.0], 2, 2).is_empty());
    }
}
