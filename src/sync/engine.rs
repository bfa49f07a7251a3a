//! Clock discipline
//!
//! The engine keeps a free-running output clock locked to decoded LTC.
//! Each decoded frame lands in a short history that is classified as
//! stopped, jumped or stable; stable signals feed a tiered drift
//! correction, jumps force a resync, and a decode timeout declares the
//! signal lost.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SyncConfig;
use crate::constants::MIN_ANALYSIS_SAMPLES;
use crate::sync::clock::{ClockStep, OutputClock};
use crate::sync::events::{EventBus, EventSubscription, SyncEvent, SyncEventKind};
use crate::sync::history::{LtcSample, SampleHistory};
use crate::timecode::{FrameRate, Timecode};

/// Lock state of the output clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SyncState {
    #[default]
    NoSignal,
    /// Decoding, not enough history to lock yet
    Syncing,
    Locked,
    /// Locked, correcting a noticeable drift
    Drifting,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::NoSignal => "no-signal",
            SyncState::Syncing => "syncing",
            SyncState::Locked => "locked",
            SyncState::Drifting => "drifting",
        };
        f.write_str(name)
    }
}

/// Behaviour of the recent sample window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferClass {
    /// Timecode is not advancing
    Stopped,
    /// The newest sample is discontinuous with the one before
    Jumped,
    /// Timecode advances in step with the monotonic clock
    Stable,
}

/// Classify a window of samples, oldest first.
///
/// Stopped is checked before Jumped, and Jumped before Stable; `None` when
/// the window is too short or matches nothing.
pub fn classify(window: &[LtcSample], config: &SyncConfig) -> Option<BufferClass> {
    if window.len() < MIN_ANALYSIS_SAMPLES {
        return None;
    }

    let stopped = window
        .windows(2)
        .all(|pair| (pair[1].tc_seconds - pair[0].tc_seconds).abs() < config.stop_threshold);
    if stopped {
        return Some(BufferClass::Stopped);
    }

    let newest = &window[window.len() - 1];
    let previous = &window[window.len() - 2];
    if (newest.tc_seconds - previous.tc_seconds).abs() > config.jump_threshold {
        return Some(BufferClass::Jumped);
    }

    let stable = window.windows(2).all(|pair| {
        let tc_delta = pair[1].tc_seconds - pair[0].tc_seconds;
        let time_delta = pair[1].capture_time - pair[0].capture_time;
        (tc_delta - time_delta).abs() < config.sync_threshold
    });
    if stable {
        return Some(BufferClass::Stable);
    }

    None
}

/// What the last analysis pass did to the output clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Drift inside the small deadzone
    Ignored,
    /// Slow-rate adjustment, in seconds
    Nudged(f64),
    /// Normal-rate adjustment, in seconds
    Corrected(f64),
    /// Output clock set to the decoded time
    Resynced,
    /// Output clock held at a stopped timecode
    Paused,
}

/// Engine statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub samples_received: u64,
    pub hard_resyncs: u64,
    pub drift_corrections: u64,
    pub timeouts: u64,
    pub clock_anomalies: u64,
}

/// Output clock locked to decoded LTC
pub struct SyncEngine {
    config: SyncConfig,
    frame_rate: FrameRate,
    history: SampleHistory,
    clock: OutputClock,
    state: SyncState,
    /// Whether frames are currently arriving
    decoding: bool,
    /// Monotonic time of the last decoded frame
    last_decode: Option<f64>,
    signal_level: f32,
    last_correction: Option<Correction>,
    events: EventBus,
    stats: EngineStats,
}

impl SyncEngine {
    pub fn new(config: SyncConfig, frame_rate: FrameRate) -> Self {
        Self {
            history: SampleHistory::new(config.buffer_capacity),
            events: EventBus::new(config.event_channel_capacity),
            config,
            frame_rate,
            clock: OutputClock::new(),
            state: SyncState::NoSignal,
            decoding: false,
            last_decode: None,
            signal_level: 0.0,
            last_correction: None,
            stats: EngineStats::default(),
        }
    }

    /// Receive lifecycle events; transitions and per-tick presence reports
    /// are queued separately
    pub fn subscribe(&mut self) -> EventSubscription {
        self.events.subscribe()
    }

    /// Record a decoded frame that completed at `capture_time`, analysing
    /// the history as of `now`. Returns `Started` when this frame ends a
    /// period without signal.
    pub fn push_timecode(&mut self, timecode: Timecode, capture_time: f64, now: f64) -> Option<SyncEvent> {
        self.history.push(LtcSample::new(capture_time, timecode.total_seconds()));
        self.stats.samples_received += 1;
        self.last_decode = Some(now);

        let started = if self.decoding {
            None
        } else {
            self.decoding = true;
            tracing::info!("LTC signal acquired at {}", timecode);
            let mut event = self.event(SyncEventKind::Started);
            event.timecode = timecode;
            self.events.publish(event);
            Some(event)
        };

        if self.state == SyncState::NoSignal {
            self.set_state(SyncState::Syncing);
        }

        if self.history.len() >= MIN_ANALYSIS_SAMPLES {
            self.analyze(now);
        }

        started
    }

    fn analyze(&mut self, now: f64) {
        let window: Vec<LtcSample> = self.history.recent(self.config.window()).copied().collect();
        let Some(latest) = window.last().copied() else {
            return;
        };
        let target = latest.projected(now);

        match classify(&window, &self.config) {
            Some(BufferClass::Stopped) => {
                if self.clock.is_running() {
                    tracing::info!(
                        "Timecode stopped at {}",
                        Timecode::from_seconds(latest.tc_seconds, self.frame_rate)
                    );
                }
                self.clock.pause_at(latest.tc_seconds, now);
                self.last_correction = Some(Correction::Paused);
                self.set_state(SyncState::Locked);
            }
            Some(BufferClass::Jumped) => {
                tracing::info!(
                    "Timecode jumped to {}",
                    Timecode::from_seconds(latest.tc_seconds, self.frame_rate)
                );
                self.hard_resync(target, now);
            }
            Some(BufferClass::Stable) => {
                let locked = matches!(self.state, SyncState::Locked | SyncState::Drifting);
                if locked && self.clock.is_running() {
                    self.correct_drift(target, now);
                } else {
                    self.hard_resync(target, now);
                }
            }
            None => {}
        }
    }

    fn correct_drift(&mut self, target: f64, now: f64) {
        let drift = target - self.clock.projected(now);
        let magnitude = drift.abs();

        if magnitude <= self.config.deadzone_small {
            self.last_correction = Some(Correction::Ignored);
            self.set_state(SyncState::Locked);
        } else if magnitude <= self.config.deadzone_medium {
            let step = drift * self.config.slow_rate;
            self.clock.nudge(step);
            self.stats.drift_corrections += 1;
            self.last_correction = Some(Correction::Nudged(step));
            tracing::debug!("Drift {:+.3}s, nudging by {:+.4}s", drift, step);
            self.set_state(SyncState::Locked);
        } else if magnitude <= self.config.threshold_large {
            let step = drift * self.config.normal_rate;
            self.clock.nudge(step);
            self.stats.drift_corrections += 1;
            self.last_correction = Some(Correction::Corrected(step));
            tracing::debug!("Drift {:+.3}s, correcting by {:+.4}s", drift, step);
            self.set_state(SyncState::Drifting);
        } else {
            tracing::info!("Drift {:+.3}s beyond {:.3}s", drift, self.config.threshold_large);
            self.hard_resync(target, now);
        }
    }

    fn hard_resync(&mut self, target: f64, now: f64) {
        self.clock.resync(target, now);
        self.stats.hard_resyncs += 1;
        self.last_correction = Some(Correction::Resynced);
        tracing::info!(
            "Output clock resynced to {}",
            Timecode::from_seconds(target, self.frame_rate)
        );
        self.set_state(SyncState::Locked);
    }

    /// Advance the output clock to `now`, check for decode timeout and raise
    /// exactly one of `Receiving`/`NoSignal` (preceded by `Stopped` when the
    /// timeout fires on this tick).
    pub fn tick(&mut self, now: f64) -> Vec<SyncEvent> {
        let mut raised = Vec::with_capacity(2);

        if let ClockStep::Anomaly(delta) = self.clock.advance(now, self.config.max_tick_delta) {
            self.stats.clock_anomalies += 1;
            tracing::warn!("Discarding implausible clock step of {:+.3}s", delta);
        }

        let timed_out = match (self.decoding, self.last_decode) {
            (true, Some(last)) => now - last > self.config.decode_timeout,
            _ => false,
        };
        if timed_out {
            self.on_timeout();
            raised.push(self.emit(SyncEventKind::Stopped));
        }

        let presence = if self.decoding {
            SyncEventKind::Receiving
        } else {
            SyncEventKind::NoSignal
        };
        raised.push(self.emit(presence));

        raised
    }

    fn on_timeout(&mut self) {
        tracing::info!(
            "LTC signal lost, no frame for {:.2}s",
            self.config.decode_timeout
        );
        self.decoding = false;
        self.clock.stop();
        self.history.clear();
        self.stats.timeouts += 1;
        self.set_state(SyncState::NoSignal);
    }

    /// Force the output clock to `timecode` as of `now`, bypassing classification
    pub fn resync_to(&mut self, timecode: &Timecode, now: f64) {
        tracing::info!("Manual resync to {}", timecode);
        self.hard_resync(timecode.total_seconds(), now);
    }

    /// Back to `NoSignal` with an empty history and a stopped clock
    pub fn stop(&mut self) {
        self.history.clear();
        self.clock.reset();
        self.decoding = false;
        self.last_decode = None;
        self.last_correction = None;
        self.set_state(SyncState::NoSignal);
    }

    /// [`SyncEngine::stop`] plus cleared statistics
    pub fn reset_statistics(&mut self) {
        self.stop();
        self.stats = EngineStats::default();
    }

    fn set_state(&mut self, state: SyncState) {
        if self.state != state {
            tracing::info!("Sync state {} -> {}", self.state, state);
            self.state = state;
        }
    }

    fn event(&self, kind: SyncEventKind) -> SyncEvent {
        SyncEvent {
            kind,
            timecode: self.output_timecode(),
            output_seconds: self.clock.time(),
            signal_present: self.decoding,
            signal_level: self.signal_level,
        }
    }

    fn emit(&mut self, kind: SyncEventKind) -> SyncEvent {
        let event = self.event(kind);
        self.events.publish(event);
        event
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Whether decoded frames are currently arriving
    pub fn is_signal_present(&self) -> bool {
        self.decoding
    }

    pub fn signal_level(&self) -> f32 {
        self.signal_level
    }

    /// Signal level reported with events, normally the decoder's meter reading
    pub fn set_signal_level(&mut self, level: f32) {
        self.signal_level = level.clamp(0.0, 1.0);
    }

    /// Output time in timecode seconds as of the last tick
    pub fn output_seconds(&self) -> f64 {
        self.clock.time()
    }

    pub fn output_timecode(&self) -> Timecode {
        Timecode::from_seconds(self.clock.time(), self.frame_rate)
            .with_drop_frame(self.frame_rate.drop_frame())
    }

    pub fn is_clock_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Decoded time minus output time, both extrapolated to `now`
    pub fn time_difference(&self, now: f64) -> Option<f64> {
        self.history
            .latest()
            .map(|sample| sample.projected(now) - self.clock.projected(now))
    }

    pub fn last_correction(&self) -> Option<Correction> {
        self.last_correction
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.clone()
    }
}
