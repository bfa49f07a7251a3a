//! LTC waveform generation
//!
//! Serializes timecodes into a biphase-mark square wave, for reference
//! signals and for exercising the decoder.

use crate::codec::frame::frame_bits;
use crate::constants::LTC_FRAME_BITS;
use crate::timecode::{FrameRate, Timecode};

/// Biphase-mark LTC encoder
///
/// The waveform is continuous across calls: polarity and fractional sample
/// position carry over from one frame to the next.
#[derive(Debug, Clone)]
pub struct FrameEncoder {
    sample_rate: u32,
    frame_rate: FrameRate,
    samples_per_bit: f64,
    amplitude: f32,
    /// Current output polarity
    level: bool,
    /// Bits produced so far
    bits_encoded: u64,
    /// Samples produced so far
    emitted: u64,
    frames_encoded: u64,
}

impl FrameEncoder {
    pub fn new(sample_rate: u32, frame_rate: FrameRate) -> Self {
        Self {
            sample_rate,
            frame_rate,
            samples_per_bit: frame_rate.samples_per_bit(sample_rate),
            amplitude: 0.5,
            level: false,
            bits_encoded: 0,
            emitted: 0,
            frames_encoded: 0,
        }
    }

    /// Set the peak amplitude (clamped to 0.0..=1.0)
    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude.clamp(0.0, 1.0);
    }

    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    /// Encode one frame, returning its samples
    pub fn encode_frame(&mut self, timecode: &Timecode) -> Vec<f32> {
        let capacity = (self.samples_per_bit * LTC_FRAME_BITS as f64).ceil() as usize + 1;
        let mut samples = Vec::with_capacity(capacity);
        self.encode_frame_into(timecode, &mut samples);
        samples
    }

    /// Encode one frame, appending its samples to `out`
    pub fn encode_frame_into(&mut self, timecode: &Timecode, out: &mut Vec<f32>) {
        for bit in frame_bits(timecode.pack()) {
            self.encode_bit(bit, out);
        }
        self.frames_encoded += 1;
    }

    /// Encode `count` consecutive frames starting at `start`
    pub fn encode_sequence(&mut self, start: Timecode, count: usize) -> Vec<f32> {
        let mut samples = Vec::new();
        let mut timecode = start;
        for _ in 0..count {
            self.encode_frame_into(&timecode, &mut samples);
            timecode.add_frames(1);
        }
        samples
    }

    fn encode_bit(&mut self, bit: bool, out: &mut Vec<f32>) {
        // Bit edges are computed from the bit index so rounding never accumulates
        let start = self.bits_encoded as f64 * self.samples_per_bit;
        let end = (self.bits_encoded + 1) as f64 * self.samples_per_bit;
        let middle = start + self.samples_per_bit / 2.0;
        let mut mid_flipped = false;

        // Every bit opens with a transition
        self.level = !self.level;

        while (self.emitted as f64) < end {
            if bit && !mid_flipped && self.emitted as f64 >= middle {
                self.level = !self.level;
                mid_flipped = true;
            }
            out.push(if self.level { self.amplitude } else { -self.amplitude });
            self.emitted += 1;
        }

        self.bits_encoded += 1;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    pub fn samples_per_bit(&self) -> f64 {
        self.samples_per_bit
    }

    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_length() {
        let mut encoder = FrameEncoder::new(48000, FrameRate::Fps25);
        let samples = encoder.encode_frame(&Timecode::zero(FrameRate::Fps25));

        // 48000 / 25 = 1920 samples per frame
        assert_eq!(samples.len(), 1920);
        assert!(samples.iter().all(|s| s.abs() == 0.5));
    }

    #[test]
    fn test_fractional_bit_length_does_not_drift() {
        // 44100 / 25 / 80 = 22.05 samples per bit
        let mut encoder = FrameEncoder::new(44100, FrameRate::Fps25);
        let samples = encoder.encode_sequence(Timecode::zero(FrameRate::Fps25), 25);
        assert!((samples.len() as i64 - 44100).abs() <= 1);
    }

    #[test]
    fn test_transition_count_matches_bits() {
        let tc = Timecode::new(1, 23, 45, 12, FrameRate::Fps30).unwrap();
        let mut encoder = FrameEncoder::new(48000, FrameRate::Fps30);
        let samples = encoder.encode_frame(&tc);

        let ones = frame_bits(tc.pack()).filter(|&b| b).count();
        let transitions = samples.windows(2).filter(|w| w[0] != w[1]).count();

        // One transition per bit boundary (the first is at sample 0) plus one per `1`
        assert_eq!(transitions, LTC_FRAME_BITS - 1 + ones);
    }

    #[test]
    fn test_amplitude_is_clamped() {
        let mut encoder = FrameEncoder::new(48000, FrameRate::Fps30);
        encoder.set_amplitude(3.0);
        assert_eq!(encoder.amplitude(), 1.0);
    }
}
