use anyhow::Context;
use serde::Deserialize;
use std::{fs, time::Duration};

use crate::{
    classify::{ShiftLabels, ShiftMode},
    runner::{ScanStrategy, ShiftPolicy},
};

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    pub interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_ms: 30_000 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanKind {
    Exhaustive,
    #[default]
    Paged,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub strategy: ScanKind,
    pub page_size: usize,
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            strategy: ScanKind::Paged,
            page_size: 100,
            concurrency: 8,
        }
    }
}

impl ScanConfig {
    pub fn strategy(&self) -> ScanStrategy {
        match self.strategy {
            ScanKind::Exhaustive => ScanStrategy::Exhaustive,
            ScanKind::Paged => ScanStrategy::Paged {
                page_size: self.page_size.max(1),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShiftConfig {
    pub mode: ShiftMode,
    pub day_label: String,
    pub night_label: String,
    pub no_shift_label: String,
}

impl Default for ShiftConfig {
    fn default() -> Self {
        let labels = ShiftLabels::default();
        Self {
            mode: ShiftMode::default(),
            day_label: labels.day,
            night_label: labels.night,
            no_shift_label: labels.no_shift,
        }
    }
}

impl ShiftConfig {
    pub fn policy(&self) -> ShiftPolicy {
        ShiftPolicy {
            mode: self.mode,
            labels: ShiftLabels {
                day: self.day_label.clone(),
                night: self.night_label.clone(),
                no_shift: self.no_shift_label.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub shift: ShiftConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("RECONCILER_CONFIG").unwrap_or_else(|_| "reconciler-config.toml".to_string());
        let contents = fs::read_to_string(&path).with_context(|| format!("reading config file {path}"))?;
        Self::from_toml_str(&contents).with_context(|| format!("parsing config file {path}"))
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.schedule.interval_ms.max(1))
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout_ms() -> u64 {
    30_000
}
