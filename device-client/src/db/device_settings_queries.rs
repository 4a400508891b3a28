use anyhow::Result;
use sqlx::{types::Json, PgPool};

/// Raw `device_settings` row. `channels` is the per-channel JSON document
/// keyed by `ch1`..`ch8`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeviceSettingsRow {
    pub device_no: String,
    pub channels: Json<serde_json::Value>,
}

/// Look up the settings document for one device.
pub async fn device_settings(pool: &PgPool, device_no: &str) -> Result<Option<DeviceSettingsRow>> {
    let row = sqlx::query_as::<_, DeviceSettingsRow>(
        r#"
        SELECT
            device_no,
            channels
        FROM device_settings
        WHERE device_no = $1
        "#,
    )
    .bind(device_no)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
