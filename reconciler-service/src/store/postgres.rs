use device_client::{
    db::{device_data_queries, device_settings_queries},
    domain::{ChannelSettings, DeviceConfig, DeviceReading, ReadingUpdate, CHANNEL_COLUMNS},
};
use serde::Deserialize;
use sqlx::postgres::PgPool;

use super::{ConfigStore, ReadingStore, StoreError};

pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ReadingStore for PgReadingStore {
    async fn fetch_unenriched(
        &self,
        after_id: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<DeviceReading>, StoreError> {
        let res = match limit {
            None => device_data_queries::unenriched_readings(&self.pool).await,
            Some(limit) => {
                let limit = i64::try_from(limit).unwrap_or(i64::MAX);
                device_data_queries::unenriched_readings_page(&self.pool, after_id, limit).await
            }
        };
        res.map_err(|e| StoreError::Readings(format!("{e:#}")))
    }

    async fn apply_updates(&self, updates: &[ReadingUpdate]) -> Result<u64, StoreError> {
        device_data_queries::apply_reading_updates(&self.pool, updates)
            .await
            .map_err(|e| StoreError::Readings(format!("{e:#}")))
    }
}

pub struct PgConfigStore {
    pool: PgPool,
}

impl PgConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ConfigStore for PgConfigStore {
    async fn resolve(&self, device_no: &str) -> Result<Option<DeviceConfig>, StoreError> {
        let row = device_settings_queries::device_settings(&self.pool, device_no)
            .await
            .map_err(|e| StoreError::Config(format!("{e:#}")))?;

        Ok(row.map(|row| device_config_from_settings(&row.device_no, &row.channels.0)))
    }
}

/// Build a [`DeviceConfig`] from the `channels` JSON document.
///
/// A channel entry that does not deserialize is logged and left unconfigured
/// so the remaining channels still take part.
pub fn device_config_from_settings(device_no: &str, channels: &serde_json::Value) -> DeviceConfig {
    let mut config = DeviceConfig::new(device_no);

    let Some(doc) = channels.as_object() else {
        tracing::warn!(device_no, "device settings channels document is not an object");
        return config;
    };

    for (idx, cols) in CHANNEL_COLUMNS.iter().enumerate() {
        let Some(entry) = doc.get(cols.key).filter(|v| !v.is_null()) else {
            continue;
        };

        match ChannelSettings::deserialize(entry) {
            Ok(settings) => config.channels[idx] = Some(settings),
            Err(e) => {
                metrics::counter!("reconcile_channel_errors_total").increment(1);
                tracing::warn!(
                    device_no,
                    channel = cols.key,
                    error = %e,
                    "malformed channel settings, channel ignored"
                );
            }
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_document_maps_onto_channel_slots() {
        let doc = json!({
            "ch1": {
                "ON_Threshold": 5,
                "LOW_Effeciency_Threshold": 20.5,
                "Morning_shift_start": "6:00",
                "Morning_shift_end": "18:00",
                "Night_shift_start": "18:00",
                "Night_shift_end": "6:00"
            },
            "ch3": {
                "ON_Threshold": 1,
                "LOW_Effeciency_Threshold": 2
            }
        });

        let config = device_config_from_settings("dev-1", &doc);

        assert_eq!(config.device_no, "dev-1");
        assert_eq!(config.channels.iter().flatten().count(), 2);

        let ch1 = config.channels[0].as_ref().unwrap();
        assert_eq!(ch1.on_threshold, 5.0);
        assert_eq!(ch1.low_efficiency_threshold, 20.5);
        assert_eq!(ch1.night_shift_start.as_deref(), Some("18:00"));

        let ch3 = config.channels[2].as_ref().unwrap();
        assert!(ch3.night_shift_start.is_none());
        assert!(config.channels[1].is_none());
    }

    #[test]
    fn malformed_channel_is_dropped_without_affecting_others() {
        let doc = json!({
            "ch1": { "ON_Threshold": "five", "LOW_Effeciency_Threshold": 20 },
            "ch2": { "ON_Threshold": 1, "LOW_Effeciency_Threshold": 2 },
            "ch4": null
        });

        let config = device_config_from_settings("dev-1", &doc);

        assert!(config.channels[0].is_none());
        assert!(config.channels[1].is_some());
        assert!(config.channels[3].is_none());
    }

    #[test]
    fn non_object_document_yields_empty_config() {
        let config = device_config_from_settings("dev-1", &json!([1, 2, 3]));
        assert!(config.channels.iter().all(Option::is_none));
    }
}
