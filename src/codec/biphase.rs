//! Biphase-mark bit recovery
//!
//! Every LTC bit starts with a polarity transition; a `1` adds a second
//! transition half way through the bit. The decoder measures the run of
//! samples between transitions and classifies it against an adaptive
//! estimate of the bit period, so no external bit clock is needed.

use crate::constants::DEFAULT_MAX_RUN;

/// Fractional bits kept in the period estimate
const PERIOD_SHIFT: u32 = 16;

/// Each observed bit moves the estimate 1/100 of the way towards it
const PERIOD_WEIGHT: i64 = 100;

/// Adaptive biphase-mark demodulator
#[derive(Debug, Clone)]
pub struct BitDecoder {
    /// Polarity of the previous sample
    polarity: Option<bool>,
    /// Schmitt-trigger threshold applied to float samples
    hysteresis: f32,
    /// Samples since the last transition (saturating)
    run: u32,
    /// Saturation cap for `run`; a run this long means silence
    max_run: u32,
    /// Estimated bit period in samples, fixed point
    period: i64,
    /// Length of the first half of a `1` bit, while waiting for the second
    half_pending: Option<u32>,
    /// Whether a transition has been seen since startup or silence
    primed: bool,
}

impl BitDecoder {
    /// Create a decoder seeded with the nominal bit length in samples
    pub fn new(samples_per_bit: f64) -> Self {
        Self {
            polarity: None,
            hysteresis: 0.0,
            run: 0,
            max_run: DEFAULT_MAX_RUN,
            period: Self::to_fixed(samples_per_bit),
            half_pending: None,
            primed: false,
        }
    }

    pub fn with_hysteresis(mut self, hysteresis: f32) -> Self {
        self.hysteresis = hysteresis.abs();
        self
    }

    pub fn with_max_run(mut self, max_run: u32) -> Self {
        self.max_run = max_run.max(1);
        self
    }

    fn to_fixed(samples: f64) -> i64 {
        (samples.max(2.0) * (1u64 << PERIOD_SHIFT) as f64) as i64
    }

    /// Current bit period estimate in samples
    pub fn bit_period(&self) -> f64 {
        self.period as f64 / (1u64 << PERIOD_SHIFT) as f64
    }

    /// Feed one audio sample, returning a bit when one completes
    pub fn push_sample(&mut self, sample: f32) -> Option<bool> {
        let polarity = match self.polarity {
            None => sample > 0.0,
            Some(true) if sample < -self.hysteresis => false,
            Some(false) if sample > self.hysteresis => true,
            Some(previous) => previous,
        };
        self.push_polarity(polarity)
    }

    /// Feed one polarity sample, returning a bit when one completes
    pub fn push_polarity(&mut self, polarity: bool) -> Option<bool> {
        let previous = self.polarity.replace(polarity)?;

        self.run = self.run.saturating_add(1).min(self.max_run);
        if polarity == previous {
            return None;
        }

        let interval = self.run;
        self.run = 0;

        // The first interval after startup or a saturated run carries no timing
        if !self.primed || interval >= self.max_run {
            self.primed = true;
            self.half_pending = None;
            return None;
        }

        self.classify(interval)
    }

    /// Intervals shorter than three quarters of a bit are half-bits; a `1`
    /// is reported once both halves have arrived.
    fn classify(&mut self, interval: u32) -> Option<bool> {
        let scaled = (interval as i64) << PERIOD_SHIFT;

        if scaled * 4 < self.period * 3 {
            match self.half_pending.take() {
                None => {
                    self.half_pending = Some(interval);
                    None
                }
                Some(first) => {
                    self.update_period(first + interval);
                    Some(true)
                }
            }
        } else {
            self.half_pending = None;
            self.update_period(interval);
            Some(false)
        }
    }

    fn update_period(&mut self, observed: u32) {
        let observed = (observed as i64) << PERIOD_SHIFT;
        self.period += (observed - self.period) / PERIOD_WEIGHT;
        self.period = self.period.max(2 << PERIOD_SHIFT);
    }

    /// Forget the signal history; the period estimate is kept
    pub fn reset(&mut self) {
        self.polarity = None;
        self.run = 0;
        self.half_pending = None;
        self.primed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Polarity runs for a biphase-mark bit sequence, `period` samples per bit
    fn polarities(bits: &[bool], period: usize) -> Vec<bool> {
        let mut level = false;
        let mut out = vec![level; period];
        for &bit in bits {
            level = !level;
            if bit {
                out.extend(std::iter::repeat(level).take(period / 2));
                level = !level;
                out.extend(std::iter::repeat(level).take(period - period / 2));
            } else {
                out.extend(std::iter::repeat(level).take(period));
            }
        }
        // Closing transition so the last bit completes
        out.push(!level);
        out
    }

    /// Like [`polarities`] at 20 samples per bit, but every half bit lasts
    /// 9, 10 or 11 samples
    fn jittered_polarities(bits: &[bool], seed: u32) -> Vec<bool> {
        let mut state = seed;
        let mut half = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            9 + (state >> 16) as usize % 3
        };

        let mut level = false;
        let mut out = vec![level; 20];
        for &bit in bits {
            let (first, second) = (half(), half());
            level = !level;
            if bit {
                out.extend(std::iter::repeat(level).take(first));
                level = !level;
                out.extend(std::iter::repeat(level).take(second));
            } else {
                out.extend(std::iter::repeat(level).take(first + second));
            }
        }
        out.push(!level);
        out
    }

    fn decode(decoder: &mut BitDecoder, input: &[bool]) -> Vec<bool> {
        input.iter().filter_map(|&p| decoder.push_polarity(p)).collect()
    }

    #[test]
    fn test_first_transition_does_not_emit() {
        let mut decoder = BitDecoder::new(20.0);
        let mut input = vec![true; 20];
        input.extend(vec![false; 20]);
        assert!(decode(&mut decoder, &input).is_empty());
    }

    #[test]
    fn test_zeros_and_ones() {
        let bits = [false, true, true, false, true, false, false, true];
        let mut decoder = BitDecoder::new(20.0);
        let decoded = decode(&mut decoder, &polarities(&bits, 20));
        assert_eq!(decoded, bits);
    }

    #[test]
    fn test_adapts_to_off_nominal_rate() {
        let bits: Vec<bool> = (0..400).map(|i| (i * 7) % 3 == 0).collect();

        // Seeded 20% short, signal at 24 samples per bit
        let mut decoder = BitDecoder::new(20.0);
        let decoded = decode(&mut decoder, &polarities(&bits, 24));
        assert_eq!(decoded, bits);
        assert!((decoder.bit_period() - 24.0).abs() < 1.5);
    }

    #[test]
    fn test_tolerates_per_bit_jitter() {
        let bits: Vec<bool> = (0..400).map(|i| (i * 5) % 7 < 3).collect();

        for seed in [1, 42, 0xdead_beef] {
            let mut decoder = BitDecoder::new(20.0);
            let decoded = decode(&mut decoder, &jittered_polarities(&bits, seed));
            assert_eq!(decoded, bits);
            assert!((decoder.bit_period() - 20.0).abs() < 1.0);
        }
    }

    #[test]
    fn test_silence_is_not_a_zero() {
        let mut decoder = BitDecoder::new(20.0).with_max_run(100);
        let mut input = polarities(&[false, false, true], 20);
        let level = *input.last().unwrap();
        input.extend(vec![level; 500]);
        input.extend(vec![!level; 20]);

        let decoded = decode(&mut decoder, &input);
        assert_eq!(decoded, vec![false, false, true]);
    }

    #[test]
    fn test_hysteresis_ignores_small_noise() {
        let mut decoder = BitDecoder::new(20.0).with_hysteresis(0.1);
        decoder.push_sample(0.5);
        for _ in 0..10 {
            decoder.push_sample(-0.05);
            decoder.push_sample(0.05);
        }
        // Still positive: no transition has been registered
        assert!(!decoder.primed);
        decoder.push_sample(-0.5);
        assert!(decoder.primed);
    }
}
