use super::device_reading::CHANNEL_COUNT;

/// Per-channel thresholds and shift windows, as kept in `device_settings`.
///
/// Shift times are `H:MM` strings and are only checked for presence here;
/// parsing happens at classification time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct ChannelSettings {
    #[cfg_attr(feature = "serde", serde(rename = "ON_Threshold"))]
    pub on_threshold: f64,
    #[cfg_attr(feature = "serde", serde(rename = "LOW_Effeciency_Threshold"))]
    pub low_efficiency_threshold: f64,
    #[cfg_attr(feature = "serde", serde(rename = "Morning_shift_start", default))]
    pub morning_shift_start: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "Morning_shift_end", default))]
    pub morning_shift_end: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "Night_shift_start", default))]
    pub night_shift_start: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "Night_shift_end", default))]
    pub night_shift_end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceConfig {
    pub device_no: String,
    pub channels: [Option<ChannelSettings>; CHANNEL_COUNT],
}

impl DeviceConfig {
    pub fn new(device_no: impl Into<String>) -> Self {
        Self {
            device_no: device_no.into(),
            channels: Default::default(),
        }
    }
}
