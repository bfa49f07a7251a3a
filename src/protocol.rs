//! Records exchanged with outer surfaces (CLI output, device listings)

use serde::{Deserialize, Serialize};

use crate::sync::SyncState;
use crate::timecode::FrameRate;

/// Audio input device information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub sample_rates: Vec<u32>,
    pub channels: Vec<u16>,
}

/// Point-in-time view of the reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Output timecode, `HH:MM:SS:FF`
    pub timecode: String,
    pub frame_rate: FrameRate,
    pub state: SyncState,
    pub signal_present: bool,
    pub signal_level: f32,
    /// Decoded minus output time in seconds, when a sample is buffered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_difference: Option<f64>,
    pub output_seconds: f64,
    pub frames_decoded: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_json() {
        let snapshot = StatusSnapshot {
            timecode: "01:02:03:04".to_string(),
            frame_rate: FrameRate::Fps25,
            state: SyncState::Locked,
            signal_present: true,
            signal_level: 0.5,
            time_difference: None,
            output_seconds: 3723.5,
            frames_decoded: 12,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"timecode\":\"01:02:03:04\""));
        assert!(json.contains("\"frame_rate\":\"25\""));
        assert!(json.contains("\"state\":\"Locked\""));
        assert!(!json.contains("time_difference"));

        let back: StatusSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
