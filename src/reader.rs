//! Timecode reader
//!
//! Wires the LTC decoder into the sync engine and the trigger matcher. Audio
//! segments and clock ticks may arrive from different execution contexts;
//! share the reader through [`SharedReader`] in that case.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::codec::{DecoderStats, LtcDecoder};
use crate::config::{AppConfig, DecoderConfig, SyncConfig};
use crate::error::TimecodeError;
use crate::protocol::StatusSnapshot;
use crate::sync::{EngineStats, EventSubscription, SyncEngine, SyncEvent, SyncEventKind, SyncState};
use crate::timecode::Timecode;
use crate::triggers::{TriggerCallback, TriggerMatcher};

/// Reader shared between an audio task and a clock task
pub type SharedReader = Arc<Mutex<TimecodeReader>>;

/// Decoder, sync engine and triggers driven as one unit
pub struct TimecodeReader {
    decoder: LtcDecoder,
    engine: SyncEngine,
    triggers: TriggerMatcher,
    sample_rate: u32,
}

impl TimecodeReader {
    pub fn new(sample_rate: u32, decoder: &DecoderConfig, sync: SyncConfig) -> Self {
        Self {
            decoder: LtcDecoder::new(sample_rate, decoder),
            engine: SyncEngine::new(sync, decoder.frame_rate),
            triggers: TriggerMatcher::new(),
            sample_rate,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.audio.sample_rate, &config.decoder, config.sync.clone())
    }

    /// Wrap in a [`SharedReader`]
    pub fn into_shared(self) -> SharedReader {
        Arc::new(Mutex::new(self))
    }

    /// Decode a mono segment whose last sample was captured at `now` and feed
    /// the recovered timecodes to the engine.
    ///
    /// Each frame's capture time is back-dated by the samples that followed
    /// its sync word in the segment.
    pub fn process_audio(&mut self, samples: &[f32], now: f64) -> Vec<Timecode> {
        let frames = self.decoder.decode(samples);
        self.engine.set_signal_level(self.decoder.signal_level());

        let sample_rate = self.sample_rate as f64;
        frames
            .into_iter()
            .map(|frame| {
                let trailing = samples.len().saturating_sub(frame.sample_offset);
                let capture_time = now - trailing as f64 / sample_rate;
                self.engine.push_timecode(frame.timecode, capture_time, now);
                frame.timecode
            })
            .collect()
    }

    /// Advance the output clock and evaluate triggers
    pub fn tick(&mut self, now: f64) -> Vec<SyncEvent> {
        let events = self.engine.tick(now);

        if events.iter().any(|e| e.kind == SyncEventKind::Stopped) {
            self.triggers.reset_all();
        }
        // The output clock holds no decoded time until the first lock
        let locked = !matches!(self.engine.state(), SyncState::NoSignal | SyncState::Syncing);
        if self.engine.is_signal_present() && locked {
            self.triggers.evaluate(&self.engine.output_timecode());
        }

        events
    }

    pub fn subscribe(&mut self) -> EventSubscription {
        self.engine.subscribe()
    }

    /// Force the output clock to `timecode`
    pub fn resync_to(&mut self, timecode: &Timecode, now: f64) {
        self.engine.resync_to(timecode, now);
    }

    /// Parse `input` at the configured frame rate and resync to it
    pub fn resync_to_str(&mut self, input: &str, now: f64) -> Result<Timecode, TimecodeError> {
        let timecode = Timecode::parse(input, self.engine.frame_rate())?;
        self.resync_to(&timecode, now);
        Ok(timecode)
    }

    pub fn add_trigger(&mut self, name: impl Into<String>, target: Timecode, callback: TriggerCallback) {
        self.triggers.add(name, target, callback);
    }

    pub fn remove_trigger(&mut self, name: &str) -> bool {
        self.triggers.remove(name)
    }

    pub fn clear_triggers(&mut self) {
        self.triggers.clear();
    }

    pub fn triggers(&self) -> &TriggerMatcher {
        &self.triggers
    }

    /// Clear engine state, decoder history and statistics; triggers are kept
    pub fn reset_statistics(&mut self) {
        self.engine.reset_statistics();
        self.decoder.reset();
        self.decoder.reset_stats();
    }

    /// Stop syncing until the next decoded frame
    pub fn stop(&mut self) {
        self.engine.stop();
        self.decoder.reset();
    }

    pub fn status(&self, now: f64) -> StatusSnapshot {
        StatusSnapshot {
            timecode: self.engine.output_timecode().to_string(),
            frame_rate: self.engine.frame_rate(),
            state: self.engine.state(),
            signal_present: self.engine.is_signal_present(),
            signal_level: self.engine.signal_level(),
            time_difference: self.engine.time_difference(now),
            output_seconds: self.engine.output_seconds(),
            frames_decoded: self.decoder.stats().frames_decoded,
        }
    }

    pub fn state(&self) -> SyncState {
        self.engine.state()
    }

    pub fn output_timecode(&self) -> Timecode {
        self.engine.output_timecode()
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn decoder(&self) -> &LtcDecoder {
        &self.decoder
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn decoder_stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    pub fn engine_stats(&self) -> EngineStats {
        self.engine.stats()
    }
}
