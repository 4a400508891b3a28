use anyhow::Result;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::domain::{DeviceReading, ReadingUpdate, CHANNEL_COLUMNS, CHANNEL_COUNT};

/// Postgres caps bind parameters at 65535 per statement; each update row binds
/// `1 + 2 * CHANNEL_COUNT` values.
const MAX_UPDATE_ROWS_PER_STATEMENT: usize = 1000;

const READING_COLUMNS: &str = r#"
    id,
    device_no,
    date,
    time,
    ch1, ch2, ch3, ch4, ch5, ch6, ch7, ch8,
    ch1_status, ch2_status, ch3_status, ch4_status,
    ch5_status, ch6_status, ch7_status, ch8_status,
    ch1_shift, ch2_shift, ch3_shift, ch4_shift,
    ch5_shift, ch6_shift, ch7_shift, ch8_shift
"#;

/// Fetch every reading still missing a channel-1 derived field.
pub async fn unenriched_readings(pool: &PgPool) -> Result<Vec<DeviceReading>> {
    let sql = format!(
        r#"
        SELECT {READING_COLUMNS}
        FROM device_data
        WHERE ch1_status IS NULL OR ch1_shift IS NULL
        ORDER BY id
        "#
    );

    let rows = sqlx::query_as::<_, DeviceReading>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

/// Fetch one keyset page of unenriched readings with `id > after_id`.
pub async fn unenriched_readings_page(pool: &PgPool, after_id: Option<i64>, limit: i64) -> Result<Vec<DeviceReading>> {
    let sql = format!(
        r#"
        SELECT {READING_COLUMNS}
        FROM device_data
        WHERE (ch1_status IS NULL OR ch1_shift IS NULL)
          AND id > $1
        ORDER BY id
        LIMIT $2
        "#
    );

    let rows = sqlx::query_as::<_, DeviceReading>(&sql)
        .bind(after_id.unwrap_or(i64::MIN))
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Write derived fields back, leaving columns whose staged value is `None`
/// untouched. Returns the number of rows updated.
pub async fn apply_reading_updates(pool: &PgPool, updates: &[ReadingUpdate]) -> Result<u64> {
    let mut total = 0;
    for chunk in updates.chunks(MAX_UPDATE_ROWS_PER_STATEMENT) {
        let mut builder = update_statement(chunk);
        let result = builder.build().execute(pool).await?;
        total += result.rows_affected();
    }
    Ok(total)
}

fn update_statement(updates: &[ReadingUpdate]) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new("UPDATE device_data AS d SET ");

    let assignments: Vec<String> = CHANNEL_COLUMNS
        .iter()
        .flat_map(|c| [c.status, c.shift])
        .map(|col| format!("{col} = COALESCE(v.{col}, d.{col})"))
        .collect();
    builder.push(assignments.join(", "));

    builder.push(" FROM (");
    builder.push_values(updates, |mut b, u| {
        b.push_bind(u.id);
        for idx in 0..CHANNEL_COUNT {
            b.push_bind(u.status[idx].map(|s| s.as_str()));
        }
        for idx in 0..CHANNEL_COUNT {
            b.push_bind(u.shift[idx].clone());
        }
    });

    let value_columns: Vec<&str> = std::iter::once("id")
        .chain(CHANNEL_COLUMNS.iter().map(|c| c.status))
        .chain(CHANNEL_COLUMNS.iter().map(|c| c.shift))
        .collect();
    builder.push(format!(") AS v({}) WHERE d.id = v.id", value_columns.join(", ")));

    builder
}
