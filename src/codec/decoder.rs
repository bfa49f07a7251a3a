//! LTC audio decoder
//!
//! Runs captured audio through the level gate, the biphase bit decoder and
//! the frame assembler, producing timecodes.

use crate::audio::level::LevelMeter;
use crate::codec::biphase::BitDecoder;
use crate::codec::frame::FrameAssembler;
use crate::config::DecoderConfig;
use crate::timecode::{FrameRate, Timecode};

/// A timecode recovered from an audio segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedFrame {
    pub timecode: Timecode,
    /// Index just past the sample that completed the sync word
    pub sample_offset: usize,
}

/// LTC decoder for a mono sample stream
pub struct LtcDecoder {
    bits: BitDecoder,
    frames: FrameAssembler,
    level: LevelMeter,
    sample_rate: u32,
    frame_rate: FrameRate,
    min_level: f32,
    /// Whether the last segment was below `min_level`
    gated: bool,
    /// Frames decoded
    frames_decoded: u64,
    /// Sync matches whose payload was not valid BCD
    frames_rejected: u64,
    /// Bits recovered
    bits_decoded: u64,
    /// Segments skipped by the level gate
    segments_gated: u64,
}

impl LtcDecoder {
    /// Create a decoder for the given sample rate
    pub fn new(sample_rate: u32, config: &DecoderConfig) -> Self {
        let bits = BitDecoder::new(config.frame_rate.samples_per_bit(sample_rate))
            .with_hysteresis(config.hysteresis)
            .with_max_run(config.max_run);

        Self {
            bits,
            frames: FrameAssembler::new(),
            level: LevelMeter::new(config.level_decay),
            sample_rate,
            frame_rate: config.frame_rate,
            min_level: config.min_level,
            gated: true,
            frames_decoded: 0,
            frames_rejected: 0,
            bits_decoded: 0,
            segments_gated: 0,
        }
    }

    /// Decode a segment of mono samples
    pub fn decode(&mut self, samples: &[f32]) -> Vec<DecodedFrame> {
        let mut decoded = Vec::new();

        if self.level.process(samples) < self.min_level {
            if !self.gated {
                tracing::trace!("Signal below {:.3}, decode suspended", self.min_level);
                self.bits.reset();
                self.frames.reset();
                self.gated = true;
            }
            self.segments_gated += 1;
            return decoded;
        }
        self.gated = false;

        for (index, &sample) in samples.iter().enumerate() {
            let Some(bit) = self.bits.push_sample(sample) else {
                continue;
            };
            self.bits_decoded += 1;

            let Some(payload) = self.frames.push_bit(bit) else {
                continue;
            };
            match Timecode::unpack(payload, self.frame_rate) {
                Ok(timecode) => {
                    self.frames_decoded += 1;
                    decoded.push(DecodedFrame {
                        timecode,
                        sample_offset: index + 1,
                    });
                }
                Err(e) => {
                    self.frames_rejected += 1;
                    tracing::trace!("Rejected LTC payload {:016x}: {}", payload, e);
                }
            }
        }

        decoded
    }

    /// Level meter reading in 0.0..=1.0
    pub fn signal_level(&self) -> f32 {
        self.level.level()
    }

    /// Whether the input is loud enough to attempt decoding
    pub fn is_signal_present(&self) -> bool {
        !self.gated
    }

    /// Current bit period estimate in samples
    pub fn bit_period(&self) -> f64 {
        self.bits.bit_period()
    }

    /// Drop all signal history
    pub fn reset(&mut self) {
        self.bits.reset();
        self.frames.reset();
        self.level.reset();
        self.gated = true;
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get frame rate
    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    /// Get statistics
    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            frames_decoded: self.frames_decoded,
            frames_rejected: self.frames_rejected,
            bits_decoded: self.bits_decoded,
            segments_gated: self.segments_gated,
        }
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        self.frames_decoded = 0;
        self.frames_rejected = 0;
        self.bits_decoded = 0;
        self.segments_gated = 0;
    }
}

/// Decoder statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames_decoded: u64,
    pub frames_rejected: u64,
    pub bits_decoded: u64,
    pub segments_gated: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FrameEncoder;

    fn roundtrip(sample_rate: u32, frame_rate: FrameRate, start: Timecode, amplitude: f32) {
        let mut encoder = FrameEncoder::new(sample_rate, frame_rate);
        encoder.set_amplitude(amplitude);
        let samples = encoder.encode_sequence(start, 4);

        let config = DecoderConfig {
            frame_rate,
            ..Default::default()
        };
        let mut decoder = LtcDecoder::new(sample_rate, &config);
        let decoded: Vec<Timecode> = decoder
            .decode(&samples)
            .into_iter()
            .map(|frame| frame.timecode)
            .collect();

        // The first frame loses its opening bit to the priming transition and
        // the last one waits for the next frame's first edge
        let mut second = start;
        second.add_frames(1);
        let mut third = second;
        third.add_frames(1);
        assert_eq!(decoded, vec![second, third]);
    }

    #[test]
    fn test_roundtrip_48k_30fps() {
        let start = Timecode::new(10, 59, 59, 28, FrameRate::Fps30).unwrap();
        roundtrip(48000, FrameRate::Fps30, start, 0.5);
    }

    #[test]
    fn test_roundtrip_44k1_25fps() {
        let start = Timecode::new(23, 59, 59, 23, FrameRate::Fps25).unwrap();
        roundtrip(44100, FrameRate::Fps25, start, 0.8);
    }

    #[test]
    fn test_roundtrip_drop_frame_flag() {
        let start = Timecode::new(1, 2, 3, 4, FrameRate::Fps2997Df).unwrap();
        roundtrip(48000, FrameRate::Fps2997Df, start, 0.3);

        let mut encoder = FrameEncoder::new(48000, FrameRate::Fps2997Df);
        let samples = encoder.encode_sequence(start, 3);
        let mut decoder = LtcDecoder::new(
            48000,
            &DecoderConfig {
                frame_rate: FrameRate::Fps2997Df,
                ..Default::default()
            },
        );
        let decoded = decoder.decode(&samples);
        assert!(decoded.iter().all(|frame| frame.timecode.drop_frame()));
    }

    #[test]
    fn test_roundtrip_24fps_low_level() {
        let start = Timecode::new(0, 0, 0, 0, FrameRate::Fps24).unwrap();
        roundtrip(96000, FrameRate::Fps24, start, 0.05);
    }

    #[test]
    fn test_decoding_across_segment_boundaries() {
        let start = Timecode::new(5, 0, 0, 0, FrameRate::Fps30).unwrap();
        let mut encoder = FrameEncoder::new(48000, FrameRate::Fps30);
        let samples = encoder.encode_sequence(start, 6);

        let mut decoder = LtcDecoder::new(48000, &DecoderConfig::default());
        let mut decoded = Vec::new();
        for chunk in samples.chunks(480) {
            decoded.extend(decoder.decode(chunk).into_iter().map(|frame| frame.timecode));
        }

        assert_eq!(decoded.len(), 4);
        for (i, tc) in decoded.iter().enumerate() {
            assert_eq!(tc.frames() as usize, i + 1);
        }
        assert_eq!(decoder.stats().frames_decoded, 4);
    }

    #[test]
    fn test_sample_offset_points_at_frame_end() {
        let start = Timecode::zero(FrameRate::Fps25);
        let mut encoder = FrameEncoder::new(48000, FrameRate::Fps25);
        let samples = encoder.encode_sequence(start, 3);

        let mut decoder = LtcDecoder::new(
            48000,
            &DecoderConfig {
                frame_rate: FrameRate::Fps25,
                ..Default::default()
            },
        );
        let decoded = decoder.decode(&samples);

        // Frame 1 ends at 3840; its final `1` completes on frame 2's opening edge
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].sample_offset, 3841);
    }

    #[test]
    fn test_noisy_signal_at_off_nominal_speed() {
        let start = Timecode::new(0, 59, 58, 0, FrameRate::Fps30).unwrap();
        let mut state: u32 = 7;

        // 0.9x to 1.2x playback of 30 fps LTC into a 48 kHz decoder
        for encoder_rate in [43200, 48000, 52800, 57600] {
            let mut encoder = FrameEncoder::new(encoder_rate, FrameRate::Fps30);
            encoder.set_amplitude(0.5);
            let mut samples = encoder.encode_sequence(start, 100);
            for sample in samples.iter_mut() {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let unit = (state >> 8) as f32 / (1u32 << 24) as f32;
                *sample += (unit - 0.5) * 0.3;
            }

            let mut decoder = LtcDecoder::new(48000, &DecoderConfig::default());
            let decoded: Vec<Timecode> = decoder
                .decode(&samples)
                .into_iter()
                .map(|frame| frame.timecode)
                .collect();

            assert_eq!(decoded.len(), 98, "encoder at {} Hz", encoder_rate);
            let mut expected = start;
            for tc in &decoded {
                expected.add_frames(1);
                assert_eq!(*tc, expected);
            }
            assert_eq!(decoder.stats().frames_rejected, 0);
        }
    }

    #[test]
    fn test_silence_is_gated() {
        let mut decoder = LtcDecoder::new(48000, &DecoderConfig::default());
        assert!(decoder.decode(&vec![0.001; 4800]).is_empty());
        assert!(!decoder.is_signal_present());
        assert_eq!(decoder.stats().segments_gated, 1);
        assert_eq!(decoder.stats().bits_decoded, 0);
    }
}
