use anyhow::Result;
use reconciler_service::{
    config::AppConfig,
    observability,
    store::{PgConfigStore, PgReadingStore},
    Reconciler,
};
use sqlx::postgres::PgPoolOptions;

/// Run a single reconciliation pass and exit; non-zero exit if the pass aborts.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .acquire_timeout(cfg.database.connect_timeout())
        .connect(&cfg.database.uri)
        .await?;

    let reconciler = Reconciler::new(
        PgReadingStore::new(pool.clone()),
        PgConfigStore::new(pool.clone()),
        cfg.scan.strategy(),
        cfg.shift.policy(),
    )
    .with_concurrency(cfg.scan.concurrency);

    let report = reconciler.run_pass().await?;
    tracing::info!(
        scanned = report.scanned,
        skipped = report.skipped,
        updated = report.updated,
        "single pass finished"
    );

    pool.close().await;
    Ok(())
}
