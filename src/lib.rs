//! # LTC Sync
//!
//! SMPTE Linear Timecode reader with a free-running output clock locked to
//! the decoded signal.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           CAPTURE (feature "capture")                     │
//! │  ┌─────────────┐    ┌──────────────────┐    ┌───────────────────────┐   │
//! │  │ cpal input  │───▶│ channel pick +   │───▶│ RingBuffer            │   │
//! │  │ callback    │    │ capture stamp    │    │ (audio::buffer, SPSC) │   │
//! │  └─────────────┘    └──────────────────┘    └───────────┬───────────┘   │
//! └─────────────────────────────────────────────────────────┼───────────────┘
//!                                                           │ mono segments
//!                                                           ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         TimecodeReader (reader)                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ LtcDecoder (codec::decoder)                                      │   │
//! │  │  LevelMeter ─▶ BitDecoder (biphase) ─▶ FrameAssembler (0xBFFC)   │   │
//! │  │                                        │                         │   │
//! │  │                                        ▼ Timecode::unpack        │   │
//! │  └────────────────────────────────────────┼─────────────────────────┘   │
//! │                                           │ (timecode, capture time)    │
//! │                                           ▼                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ SyncEngine (sync::engine)                                        │   │
//! │  │  SampleHistory ─▶ classify: Stopped / Jumped / Stable            │   │
//! │  │                     │                                            │   │
//! │  │                     ▼                                            │   │
//! │  │  tiered drift correction ─▶ OutputClock ◀── tick(now)            │   │
//! │  │                                  │                               │   │
//! │  │  NoSignal ─▶ Syncing ─▶ Locked ◀─▶ Drifting      EventBus ──▶ rx │   │
//! │  └──────────────────────────────────┼──────────────────────────────┘   │
//! │                                     │ output timecode                  │
//! │                                     ▼                                  │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ TriggerMatcher (triggers): exact-frame fire, rewind re-arm        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod reader;
pub mod sync;
pub mod timecode;
pub mod triggers;

pub use error::{Error, Result};
pub use reader::{SharedReader, TimecodeReader};
pub use timecode::{FrameRate, Timecode};

/// Application-wide constants
pub mod constants {
    /// Default sample rate for audio processing
    pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

    /// Bits per LTC frame, sync word included
    pub const LTC_FRAME_BITS: usize = 80;

    /// Sync word closing every LTC frame, as it appears in the receive window
    pub const LTC_SYNC_WORD: u16 = 0xBFFC;

    /// Samples without a transition before the bit decoder treats the input as silent
    pub const DEFAULT_MAX_RUN: u32 = 10_000;

    /// Decoded samples kept for analysis
    pub const DEFAULT_BUFFER_CAPACITY: usize = 15;

    /// Fewest samples a stability analysis runs on
    pub const MIN_ANALYSIS_SAMPLES: usize = 3;

    /// Most samples a stability analysis runs on
    pub const MAX_ANALYSIS_SAMPLES: usize = 5;

    /// Seconds without a decoded frame before the signal counts as lost
    pub const DEFAULT_DECODE_TIMEOUT: f64 = 0.5;

    /// Lock-free ring buffer capacity (in segments)
    pub const RING_BUFFER_CAPACITY: usize = 256;
}
