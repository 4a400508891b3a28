use std::{collections::HashMap, time::Instant};

use device_client::domain::{ChannelSettings, DeviceConfig, DeviceReading, ReadingUpdate, CHANNEL_COLUMNS};
use futures::{stream, StreamExt};
use serde::Serialize;
use time::Time;

use crate::{
    classify::{
        classify_shift, classify_status, parse_clock_time, parse_reading_date, ClassifyError, ReadingDate,
        ShiftLabels, ShiftMode, ShiftWindow,
    },
    store::{ConfigStore, ReadingStore, StoreError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStrategy {
    /// One query returning every eligible reading.
    Exhaustive,
    /// Keyset pages of `page_size`, repeated until an empty page.
    Paged { page_size: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShiftPolicy {
    pub mode: ShiftMode,
    pub labels: ShiftLabels,
}

/// Counters for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub scanned: u64,
    /// Readings whose device has no settings document.
    pub skipped: u64,
    /// Readings whose device settings lookup errored.
    pub failed: u64,
    /// Readings where every derived field already matched.
    pub unchanged: u64,
    pub updated: u64,
    pub channel_errors: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// A shift that could not be computed. `channel` is `None` when the reading's
/// own date or time is at fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftIssue {
    pub channel: Option<&'static str>,
    pub error: ClassifyError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub update: ReadingUpdate,
    pub issues: Vec<ShiftIssue>,
}

/// Compute the derived fields for one reading.
///
/// Only channels present in both the reading and the config are touched.
/// Fields whose computed value matches what is already stored are left out
/// of the update.
pub fn derive_update(reading: &DeviceReading, config: &DeviceConfig, policy: &ShiftPolicy) -> Derivation {
    let mut update = ReadingUpdate::new(reading.id);
    let mut issues = Vec::new();

    let stamp = match (&reading.date, &reading.time) {
        (Some(date), Some(time)) => match (parse_reading_date(date), parse_clock_time(time)) {
            (Ok(date), Ok(at)) => Some((date, at)),
            (Err(error), _) | (_, Err(error)) => {
                issues.push(ShiftIssue { channel: None, error });
                None
            }
        },
        _ => None,
    };

    for (idx, cols) in CHANNEL_COLUMNS.iter().enumerate() {
        let (Some(value), Some(settings)) = (reading.values[idx], config.channels[idx].as_ref()) else {
            continue;
        };

        let status = classify_status(value, settings.on_threshold, settings.low_efficiency_threshold);
        if reading.status[idx] != Some(status) {
            update.status[idx] = Some(status);
        }

        let Some((date, at)) = stamp else {
            continue;
        };
        match channel_shift(settings, date, at, policy) {
            Ok(shift) => {
                if reading.shift[idx].as_deref() != Some(shift.as_str()) {
                    update.shift[idx] = Some(shift);
                }
            }
            Err(error) => issues.push(ShiftIssue {
                channel: Some(cols.key),
                error,
            }),
        }
    }

    Derivation { update, issues }
}

fn channel_shift(
    settings: &ChannelSettings,
    date: ReadingDate<'_>,
    at: Time,
    policy: &ShiftPolicy,
) -> Result<String, ClassifyError> {
    let night = ShiftWindow::parse(
        required(&settings.night_shift_start, "Night_shift_start")?,
        required(&settings.night_shift_end, "Night_shift_end")?,
    )?;

    let day = match policy.mode {
        ShiftMode::Complement => None,
        ShiftMode::DayWindow => Some(ShiftWindow::parse(
            required(&settings.morning_shift_start, "Morning_shift_start")?,
            required(&settings.morning_shift_end, "Morning_shift_end")?,
        )?),
    };

    Ok(classify_shift(date, at, night, day, &policy.labels))
}

fn required<'a>(field: &'a Option<String>, name: &'static str) -> Result<&'a str, ClassifyError> {
    field.as_deref().ok_or(ClassifyError::MissingWindow(name))
}

enum Resolution {
    Found(DeviceConfig),
    NotFound,
    Failed,
}

/// Scans unenriched readings and writes back channel status and shift labels.
pub struct Reconciler<R, C> {
    readings: R,
    configs: C,
    scan: ScanStrategy,
    policy: ShiftPolicy,
    concurrency: usize,
}

impl<R, C> Reconciler<R, C>
where
    R: ReadingStore,
    C: ConfigStore,
{
    pub fn new(readings: R, configs: C, scan: ScanStrategy, policy: ShiftPolicy) -> Self {
        Self {
            readings,
            configs,
            scan,
            policy,
            concurrency: 1,
        }
    }

    /// Maximum concurrent device settings lookups per page.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[cfg(test)]
    pub(crate) fn readings(&self) -> &R {
        &self.readings
    }

    /// Run one full pass. Only reading-store failures abort the pass.
    pub async fn run_pass(&self) -> Result<PassReport, ReconcileError> {
        let started = Instant::now();
        let result = self.reconcile_all().await;
        metrics::histogram!("reconcile_pass_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(report) => {
                metrics::counter!("reconcile_passes_total").increment(1);
                metrics::counter!("reconcile_records_scanned_total").increment(report.scanned);
                metrics::counter!("reconcile_records_skipped_total").increment(report.skipped);
                metrics::counter!("reconcile_records_failed_total").increment(report.failed);
                metrics::counter!("reconcile_records_updated_total").increment(report.updated);
                metrics::counter!("reconcile_channel_errors_total").increment(report.channel_errors);
                tracing::info!(
                    scanned = report.scanned,
                    skipped = report.skipped,
                    failed = report.failed,
                    unchanged = report.unchanged,
                    updated = report.updated,
                    channel_errors = report.channel_errors,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "reconciliation pass completed"
                );
            }
            Err(e) => {
                metrics::counter!("reconcile_pass_failures_total").increment(1);
                tracing::error!(error = %e, "reconciliation pass aborted");
            }
        }

        result
    }

    async fn reconcile_all(&self) -> Result<PassReport, ReconcileError> {
        let limit = match self.scan {
            ScanStrategy::Exhaustive => None,
            ScanStrategy::Paged { page_size } => Some(page_size.max(1)),
        };

        let mut report = PassReport::default();
        let mut resolved: HashMap<String, Resolution> = HashMap::new();
        let mut cursor: Option<i64> = None;

        loop {
            let page = self.readings.fetch_unenriched(cursor, limit).await?;
            if page.is_empty() {
                break;
            }
            cursor = page.iter().map(|r| r.id).max();
            report.scanned += page.len() as u64;
            tracing::debug!(records = page.len(), "processing page");

            self.resolve_devices(&page, &mut resolved).await;

            let mut staged = Vec::new();
            for reading in &page {
                let config = match resolved.get(&reading.device_no) {
                    Some(Resolution::Found(config)) => config,
                    Some(Resolution::Failed) => {
                        report.failed += 1;
                        tracing::warn!(
                            record_id = reading.id,
                            device_no = %reading.device_no,
                            "device settings unavailable, record skipped"
                        );
                        continue;
                    }
                    Some(Resolution::NotFound) | None => {
                        report.skipped += 1;
                        tracing::warn!(
                            record_id = reading.id,
                            device_no = %reading.device_no,
                            "no device settings found, record skipped"
                        );
                        continue;
                    }
                };

                let derivation = derive_update(reading, config, &self.policy);
                for issue in &derivation.issues {
                    report.channel_errors += 1;
                    tracing::warn!(
                        record_id = reading.id,
                        device_no = %reading.device_no,
                        channel = issue.channel.unwrap_or("all"),
                        error = %issue.error,
                        "shift not computed"
                    );
                }

                if derivation.update.is_empty() {
                    report.unchanged += 1;
                } else {
                    staged.push(derivation.update);
                }
            }

            if !staged.is_empty() {
                let updated = self.readings.apply_updates(&staged).await?;
                tracing::info!(staged = staged.len(), updated, "batch updated");
                report.updated += updated;
            }

            if limit.is_none() {
                break;
            }
        }

        Ok(report)
    }

    /// Resolve settings for devices in `page` not seen earlier in this pass.
    async fn resolve_devices(&self, page: &[DeviceReading], resolved: &mut HashMap<String, Resolution>) {
        let mut pending: Vec<String> = page
            .iter()
            .filter(|r| !resolved.contains_key(&r.device_no))
            .map(|r| r.device_no.clone())
            .collect();
        pending.sort_unstable();
        pending.dedup();

        let configs = &self.configs;
        let lookups: Vec<(String, Resolution)> = stream::iter(pending)
            .map(|device_no| async move {
                let resolution = match configs.resolve(&device_no).await {
                    Ok(Some(config)) => Resolution::Found(config),
                    Ok(None) => Resolution::NotFound,
                    Err(e) => {
                        tracing::error!(device_no = %device_no, error = %e, "device settings lookup failed");
                        Resolution::Failed
                    }
                };
                (device_no, resolution)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        resolved.extend(lookups);
    }
}
