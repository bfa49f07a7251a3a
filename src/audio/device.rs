//! Audio input device enumeration

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::AudioError;
use crate::protocol::AudioDeviceInfo;

/// Sample rates probed when listing devices
const PROBED_SAMPLE_RATES: [u32; 5] = [44100, 48000, 88200, 96000, 192000];

/// Wrapper around cpal device
pub struct AudioDevice {
    inner: cpal::Device,
    pub name: String,
}

impl AudioDevice {
    pub fn from_cpal(device: cpal::Device) -> Self {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        Self {
            inner: device,
            name,
        }
    }

    pub fn into_inner(self) -> cpal::Device {
        self.inner
    }

    /// Identifier accepted by [`get_device_by_id`]
    pub fn id(&self) -> String {
        format!("input:{}", self.name)
    }

    /// Get default input config
    pub fn default_input_config(&self) -> Result<cpal::SupportedStreamConfig, AudioError> {
        self.inner
            .default_input_config()
            .map_err(|e| AudioError::DeviceNotFound(e.to_string()))
    }
}

/// List all available input devices
pub fn list_devices() -> Vec<AudioDeviceInfo> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let Ok(inputs) = host.input_devices() else {
        return Vec::new();
    };

    inputs
        .filter_map(|device| {
            let name = device.name().ok()?;
            let (sample_rates, channels) = get_device_capabilities(&device);
            Some(AudioDeviceInfo {
                id: format!("input:{}", name),
                is_default: default_name.as_ref() == Some(&name),
                name,
                sample_rates,
                channels,
            })
        })
        .collect()
}

/// Get device capabilities
fn get_device_capabilities(device: &cpal::Device) -> (Vec<u32>, Vec<u16>) {
    let mut sample_rates = Vec::new();
    let mut channels = Vec::new();

    if let Ok(configs) = device.supported_input_configs() {
        for config in configs {
            for rate_val in PROBED_SAMPLE_RATES {
                let rate = cpal::SampleRate(rate_val);
                if rate >= config.min_sample_rate()
                    && rate <= config.max_sample_rate()
                    && !sample_rates.contains(&rate_val)
                {
                    sample_rates.push(rate_val);
                }
            }

            let ch = config.channels();
            if !channels.contains(&ch) {
                channels.push(ch);
            }
        }
    }

    sample_rates.sort_unstable();
    channels.sort_unstable();

    (sample_rates, channels)
}

/// Get an input device by its ID (`input:<name>` or a bare name)
pub fn get_device_by_id(id: &str) -> Result<AudioDevice, AudioError> {
    let host = cpal::default_host();
    let name = id.strip_prefix("input:").unwrap_or(id);

    let devices = host
        .input_devices()
        .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;

    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(AudioDevice::from_cpal(device));
        }
    }

    Err(AudioError::DeviceNotFound(id.to_string()))
}

/// Get default input device
pub fn get_default_input_device() -> Result<AudioDevice, AudioError> {
    let host = cpal::default_host();
    host.default_input_device()
        .map(AudioDevice::from_cpal)
        .ok_or_else(|| AudioError::DeviceNotFound("No default input device".to_string()))
}

/// The device named by `id`, or the default input when `None`
pub fn open_input(id: Option<&str>) -> Result<AudioDevice, AudioError> {
    match id {
        Some(id) => get_device_by_id(id),
        None => get_default_input_device(),
    }
}
