use device_client::domain::ChannelStatus;

/// Classify a channel reading against its thresholds.
///
/// `value > low_efficiency` is ON, `value > on` is LOW, anything else OFF.
/// Inverted thresholds are not corrected; the comparisons simply run in order.
pub fn classify_status(value: f64, on_threshold: f64, low_efficiency_threshold: f64) -> ChannelStatus {
    if value > low_efficiency_threshold {
        ChannelStatus::On
    } else if value > on_threshold {
        ChannelStatus::Low
    } else {
        ChannelStatus::Off
    }
}
