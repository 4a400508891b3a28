use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use device_client::domain::{DeviceConfig, DeviceReading, ReadingUpdate};

use super::{ConfigStore, ReadingStore, StoreError};

/// In-process reading store keyed by id.
#[derive(Default)]
pub struct MemoryReadingStore {
    readings: Mutex<BTreeMap<i64, DeviceReading>>,
    pub fail_fetch: AtomicBool,
    pub fail_update: AtomicBool,
    pub update_calls: AtomicUsize,
}

impl MemoryReadingStore {
    pub fn new(readings: impl IntoIterator<Item = DeviceReading>) -> Self {
        Self {
            readings: Mutex::new(readings.into_iter().map(|r| (r.id, r)).collect()),
            ..Default::default()
        }
    }

    pub fn get(&self, id: i64) -> Option<DeviceReading> {
        self.readings.lock().unwrap().get(&id).cloned()
    }

    pub fn snapshot(&self) -> Vec<DeviceReading> {
        self.readings.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait::async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn fetch_unenriched(
        &self,
        after_id: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<DeviceReading>, StoreError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Readings("connection refused".to_string()));
        }

        let readings = self.readings.lock().unwrap();
        let eligible = readings
            .values()
            .filter(|r| !r.is_enriched())
            .filter(|r| after_id.map_or(true, |after| r.id > after))
            .cloned();

        Ok(match limit {
            Some(limit) => eligible.take(limit).collect(),
            None => eligible.collect(),
        })
    }

    async fn apply_updates(&self, updates: &[ReadingUpdate]) -> Result<u64, StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(StoreError::Readings("connection reset".to_string()));
        }

        let mut readings = self.readings.lock().unwrap();
        let mut updated = 0;
        for update in updates {
            if let Some(reading) = readings.get_mut(&update.id) {
                update.apply_to(reading);
                updated += 1;
            }
        }
        Ok(updated)
    }
}

/// In-process config store; devices listed in `failing` return an error.
#[derive(Default)]
pub struct MemoryConfigStore {
    configs: HashMap<String, DeviceConfig>,
    failing: Vec<String>,
    pub lookups: AtomicUsize,
}

impl MemoryConfigStore {
    pub fn new(configs: impl IntoIterator<Item = DeviceConfig>) -> Self {
        Self {
            configs: configs.into_iter().map(|c| (c.device_no.clone(), c)).collect(),
            ..Default::default()
        }
    }

    pub fn failing_for(mut self, device_no: &str) -> Self {
        self.failing.push(device_no.to_string());
        self
    }
}

#[async_trait::async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn resolve(&self, device_no: &str) -> Result<Option<DeviceConfig>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|d| d == device_no) {
            return Err(StoreError::Config(format!("timeout looking up {device_no}")));
        }
        Ok(self.configs.get(device_no).cloned())
    }
}
