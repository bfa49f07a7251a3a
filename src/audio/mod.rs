//! Audio subsystem module

pub mod buffer;
pub mod level;
#[cfg(feature = "capture")]
pub mod capture;
#[cfg(feature = "capture")]
pub mod device;

pub use buffer::{AudioSegment, RingBuffer};
pub use level::LevelMeter;
#[cfg(feature = "capture")]
pub use capture::AudioCapture;
#[cfg(feature = "capture")]
pub use device::{get_default_input_device, get_device_by_id, list_devices, open_input, AudioDevice};
