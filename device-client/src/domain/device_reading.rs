use std::{fmt, str::FromStr};

use sqlx::{postgres::PgRow, FromRow, Row};

/// Number of measurement channels a device can have wired.
pub const CHANNEL_COUNT: usize = 8;

/// Column names for one channel in `device_data`.
///
/// `key` doubles as the channel's key inside the `device_settings.channels`
/// JSON document.
#[derive(Debug, Clone, Copy)]
pub struct ChannelColumns {
    pub key: &'static str,
    pub status: &'static str,
    pub shift: &'static str,
}

pub const CHANNEL_COLUMNS: [ChannelColumns; CHANNEL_COUNT] = [
    ChannelColumns { key: "ch1", status: "ch1_status", shift: "ch1_shift" },
    ChannelColumns { key: "ch2", status: "ch2_status", shift: "ch2_shift" },
    ChannelColumns { key: "ch3", status: "ch3_status", shift: "ch3_shift" },
    ChannelColumns { key: "ch4", status: "ch4_status", shift: "ch4_shift" },
    ChannelColumns { key: "ch5", status: "ch5_status", shift: "ch5_shift" },
    ChannelColumns { key: "ch6", status: "ch6_status", shift: "ch6_shift" },
    ChannelColumns { key: "ch7", status: "ch7_status", shift: "ch7_shift" },
    ChannelColumns { key: "ch8", status: "ch8_status", shift: "ch8_shift" },
];

/// Operational state derived from a channel reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelStatus {
    On,
    Low,
    Off,
}

impl ChannelStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Low => "LOW",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown channel status '{0}'")]
pub struct UnknownChannelStatus(pub String);

impl FromStr for ChannelStatus {
    type Err = UnknownChannelStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Self::On),
            "LOW" => Ok(Self::Low),
            "OFF" => Ok(Self::Off),
            other => Err(UnknownChannelStatus(other.to_string())),
        }
    }
}

/// One row of `device_data`: raw channel readings plus any derived fields
/// already written by a previous pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceReading {
    pub id: i64,
    pub device_no: String,
    pub date: Option<String>,
    pub time: Option<String>,
    pub values: [Option<f64>; CHANNEL_COUNT],
    pub status: [Option<ChannelStatus>; CHANNEL_COUNT],
    pub shift: [Option<String>; CHANNEL_COUNT],
}

impl DeviceReading {
    /// Channel 1 is the completeness sentinel for the whole record.
    pub fn is_enriched(&self) -> bool {
        self.status[0].is_some() && self.shift[0].is_some()
    }
}

impl<'r> FromRow<'r, PgRow> for DeviceReading {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let mut reading = DeviceReading {
            id: row.try_get("id")?,
            device_no: row.try_get("device_no")?,
            date: row.try_get("date")?,
            time: row.try_get("time")?,
            ..Default::default()
        };

        for (idx, cols) in CHANNEL_COLUMNS.iter().enumerate() {
            reading.values[idx] = row.try_get(cols.key)?;
            reading.status[idx] = row
                .try_get::<Option<String>, _>(cols.status)?
                .map(|s| s.parse::<ChannelStatus>())
                .transpose()
                .map_err(|e| sqlx::Error::ColumnDecode {
                    index: cols.status.to_string(),
                    source: Box::new(e),
                })?;
            reading.shift[idx] = row.try_get(cols.shift)?;
        }

        Ok(reading)
    }
}

/// Derived fields to write back onto one `device_data` row.
///
/// `None` entries are left untouched in the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadingUpdate {
    pub id: i64,
    pub status: [Option<ChannelStatus>; CHANNEL_COUNT],
    pub shift: [Option<String>; CHANNEL_COUNT],
}

impl ReadingUpdate {
    pub fn new(id: i64) -> Self {
        Self { id, ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.status.iter().all(Option::is_none) && self.shift.iter().all(Option::is_none)
    }

    /// Overlay the staged fields onto `reading`, mirroring what the store does.
    pub fn apply_to(&self, reading: &mut DeviceReading) {
        for idx in 0..CHANNEL_COUNT {
            if let Some(status) = self.status[idx] {
                reading.status[idx] = Some(status);
            }
            if let Some(shift) = &self.shift[idx] {
                reading.shift[idx] = Some(shift.clone());
            }
        }
    }
}
