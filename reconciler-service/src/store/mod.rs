use device_client::domain::{DeviceConfig, DeviceReading, ReadingUpdate};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::{PgConfigStore, PgReadingStore};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("reading store error: {0}")]
    Readings(String),
    #[error("config store error: {0}")]
    Config(String),
}

/// Backing store for device readings.
#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    /// Readings missing a channel-1 derived field, ordered by id.
    ///
    /// With `limit = None` every eligible reading is returned; otherwise a
    /// page of at most `limit` readings with `id > after_id`.
    async fn fetch_unenriched(
        &self,
        after_id: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<DeviceReading>, StoreError>;

    /// Apply partial updates; returns how many readings were modified.
    async fn apply_updates(&self, updates: &[ReadingUpdate]) -> Result<u64, StoreError>;
}

/// Point lookup of per-device channel configuration.
#[async_trait::async_trait]
pub trait ConfigStore: Send + Sync {
    async fn resolve(&self, device_no: &str) -> Result<Option<DeviceConfig>, StoreError>;
}
