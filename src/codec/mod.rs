//! LTC codec
//!
//! Biphase-mark bit recovery, 80-bit frame assembly and the audio-level
//! encoder/decoder built on top of them.

pub mod biphase;
pub mod frame;
pub mod encoder;
pub mod decoder;

pub use biphase::BitDecoder;
pub use frame::FrameAssembler;
pub use encoder::FrameEncoder;
pub use decoder::{DecodedFrame, DecoderStats, LtcDecoder};
