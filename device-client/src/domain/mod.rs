pub mod device_config;
pub mod device_reading;

pub use device_config::{ChannelSettings, DeviceConfig};
pub use device_reading::{
    ChannelColumns, ChannelStatus, DeviceReading, ReadingUpdate, UnknownChannelStatus, CHANNEL_COLUMNS,
    CHANNEL_COUNT,
};
