//! Application configuration
//!
//! Loaded from a TOML file; every section and field falls back to its
//! default when absent.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};
use crate::timecode::FrameRate;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub decoder: DecoderConfig,
    pub sync: SyncConfig,
}

/// Audio input settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device id (`input:<name>`); the default input device when unset
    pub device_id: Option<String>,
    pub sample_rate: u32,
    /// Channel carrying the LTC signal
    pub channel: u16,
    /// Captured segments held between the audio thread and the decoder
    pub ring_buffer_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channel: 0,
            ring_buffer_capacity: RING_BUFFER_CAPACITY,
        }
    }
}

/// Bitstream decoder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub frame_rate: FrameRate,
    /// Amplitude the signal must cross before a polarity change counts
    pub hysteresis: f32,
    /// Peak level below which no decode is attempted
    pub min_level: f32,
    /// Per-sample decay factor of the peak level meter
    pub level_decay: f32,
    /// Sample run after which the input is treated as silent
    pub max_run: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            frame_rate: FrameRate::Fps30,
            hysteresis: 0.02,
            min_level: 0.02,
            level_decay: 0.9999,
            max_run: DEFAULT_MAX_RUN,
        }
    }
}

/// Clock discipline settings. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Decoded samples retained
    pub buffer_capacity: usize,
    /// Samples inspected per analysis pass (3 to 5)
    pub analysis_window: usize,
    /// Timecode steps below this mean the source is not moving
    pub stop_threshold: f64,
    /// Timecode steps above this are a seek or loop
    pub jump_threshold: f64,
    /// Allowed mismatch between timecode and wall-clock steps for a stable signal
    pub sync_threshold: f64,
    /// Drift up to this is ignored
    pub deadzone_small: f64,
    /// Drift up to this is nudged at `slow_rate`
    pub deadzone_medium: f64,
    /// Drift up to this is corrected at `normal_rate`; beyond it the clock resyncs
    pub threshold_large: f64,
    pub slow_rate: f64,
    pub normal_rate: f64,
    /// Time without a decoded frame before the signal counts as lost
    pub decode_timeout: f64,
    /// Clock steps above this are treated as anomalies
    pub max_tick_delta: f64,
    /// Clock advance period for hosts driving the engine on a timer
    pub tick_interval_ms: u64,
    /// Per-subscriber event queue length
    pub event_channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            analysis_window: 5,
            stop_threshold: 0.001,
            jump_threshold: 1.0,
            sync_threshold: 0.1,
            deadzone_small: 0.03,
            deadzone_medium: 0.1,
            threshold_large: 0.3,
            slow_rate: 0.01,
            normal_rate: 0.1,
            decode_timeout: DEFAULT_DECODE_TIMEOUT,
            max_tick_delta: 1.0,
            tick_interval_ms: 5,
            event_channel_capacity: 64,
        }
    }
}

impl SyncConfig {
    /// Analysis window clamped to the supported range
    pub fn window(&self) -> usize {
        self.analysis_window.clamp(MIN_ANALYSIS_SAMPLES, MAX_ANALYSIS_SAMPLES)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("stop_threshold", self.stop_threshold),
            ("jump_threshold", self.jump_threshold),
            ("sync_threshold", self.sync_threshold),
            ("deadzone_small", self.deadzone_small),
            ("deadzone_medium", self.deadzone_medium),
            ("threshold_large", self.threshold_large),
            ("slow_rate", self.slow_rate),
            ("normal_rate", self.normal_rate),
            ("decode_timeout", self.decode_timeout),
            ("max_tick_delta", self.max_tick_delta),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(Error::Config(format!("sync.{} must be positive, got {}", name, value)));
            }
        }

        if !(self.deadzone_small <= self.deadzone_medium && self.deadzone_medium <= self.threshold_large) {
            return Err(Error::Config(
                "sync thresholds must satisfy deadzone_small <= deadzone_medium <= threshold_large"
                    .to_string(),
            ));
        }

        if self.buffer_capacity < MIN_ANALYSIS_SAMPLES {
            return Err(Error::Config(format!(
                "sync.buffer_capacity must be at least {}",
                MIN_ANALYSIS_SAMPLES
            )));
        }

        if self.event_channel_capacity == 0 {
            return Err(Error::Config("sync.event_channel_capacity must be non-zero".to_string()));
        }

        Ok(())
    }
}

impl AppConfig {
    /// Platform config file location (`<config dir>/ltc-sync/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ltc-sync").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, or fall back to defaults when no file exists
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Write the config as TOML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(Error::Config("audio.sample_rate must be non-zero".to_string()));
        }
        if self.audio.ring_buffer_capacity == 0 {
            return Err(Error::Config("audio.ring_buffer_capacity must be non-zero".to_string()));
        }
        if !(self.decoder.level_decay > 0.0 && self.decoder.level_decay <= 1.0) {
            return Err(Error::Config("decoder.level_decay must be in (0, 1]".to_string()));
        }
        if self.decoder.min_level < 0.0 || self.decoder.hysteresis < 0.0 {
            return Err(Error::Config(
                "decoder.min_level and decoder.hysteresis must not be negative".to_string(),
            ));
        }
        self.sync.validate()
    }
}
