//! LTC frame alignment
//!
//! Bits arrive least significant first: 64 payload bits, then the 16-bit
//! sync word. The assembler keeps an 80-bit sliding window split over two
//! registers and reports the payload whenever the newest 16 bits read as
//! the sync word.

use crate::constants::{LTC_FRAME_BITS, LTC_SYNC_WORD};

/// Sliding 80-bit window over a decoded bit stream
#[derive(Debug, Clone, Default)]
pub struct FrameAssembler {
    /// Newest 16 bits; the latest bit enters at the top
    sync: u16,
    /// The 64 bits that preceded `sync`, fed by bits leaving it
    payload: u64,
    /// Bits pushed since the last reset, capped at the frame length
    filled: usize,
    /// Frames matched since construction
    frames_found: u64,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift in one bit. Returns the 64-bit payload when the sync word completes.
    pub fn push_bit(&mut self, bit: bool) -> Option<u64> {
        let outgoing = u64::from(self.sync & 1);
        self.sync = (self.sync >> 1) | (u16::from(bit) << 15);
        self.payload = (self.payload >> 1) | (outgoing << 63);
        self.filled = (self.filled + 1).min(LTC_FRAME_BITS);

        // A window that has not seen a full frame yet still holds reset bits
        if self.sync == LTC_SYNC_WORD && self.filled == LTC_FRAME_BITS {
            self.frames_found += 1;
            Some(self.payload)
        } else {
            None
        }
    }

    /// Frames matched since construction
    pub fn frames_found(&self) -> u64 {
        self.frames_found
    }

    /// Clear the window, e.g. after a signal dropout
    pub fn reset(&mut self) {
        self.sync = 0;
        self.payload = 0;
        self.filled = 0;
    }
}

/// The 80 bits of one LTC frame in transmission order
pub fn frame_bits(payload: u64) -> impl Iterator<Item = bool> {
    let payload_bits = (0..64).map(move |i| (payload >> i) & 1 == 1);
    let sync_bits = (0..16).map(|i| (LTC_SYNC_WORD >> i) & 1 == 1);
    payload_bits.chain(sync_bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::{FrameRate, Timecode};

    #[test]
    fn test_sync_word_bit_order() {
        // On the wire the sync word reads 0011 1111 1111 1101
        let wire: Vec<bool> = frame_bits(0).skip(64).collect();
        let expected: Vec<bool> = "0011111111111101".chars().map(|c| c == '1').collect();
        assert_eq!(wire, expected);
    }

    #[test]
    fn test_finds_payload_after_sync() {
        let tc = Timecode::new(13, 57, 9, 21, FrameRate::Fps30).unwrap();
        let mut assembler = FrameAssembler::new();

        let mut found = Vec::new();
        for bit in frame_bits(tc.pack()) {
            if let Some(payload) = assembler.push_bit(bit) {
                found.push(payload);
            }
        }

        assert_eq!(found, vec![tc.pack()]);
        assert_eq!(assembler.frames_found(), 1);
    }

    #[test]
    fn test_misaligned_stream_realigns() {
        let a = Timecode::new(0, 0, 1, 0, FrameRate::Fps25).unwrap();
        let b = Timecode::new(0, 0, 1, 1, FrameRate::Fps25).unwrap();

        // Start mid-frame: the first frame is incomplete
        let stream: Vec<bool> = frame_bits(a.pack())
            .skip(37)
            .chain(frame_bits(b.pack()))
            .collect();

        let mut assembler = FrameAssembler::new();
        let found: Vec<u64> = stream.into_iter().filter_map(|bit| assembler.push_bit(bit)).collect();
        assert_eq!(found, vec![b.pack()]);
    }

    #[test]
    fn test_partial_window_is_not_reported() {
        let mut assembler = FrameAssembler::new();
        let found: Vec<u64> = frame_bits(0)
            .skip(1)
            .filter_map(|bit| assembler.push_bit(bit))
            .collect();
        assert!(found.is_empty());
    }
}
