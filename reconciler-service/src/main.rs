use anyhow::Result;
use reconciler_service::{
    config::AppConfig,
    metrics_server, observability,
    store::{PgConfigStore, PgReadingStore},
    Reconciler, Scheduler,
};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    // Lazy pool: an unreachable database fails individual passes, not startup.
    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .acquire_timeout(cfg.database.connect_timeout())
        .connect_lazy(&cfg.database.uri)?;

    let reconciler = Reconciler::new(
        PgReadingStore::new(pool.clone()),
        PgConfigStore::new(pool),
        cfg.scan.strategy(),
        cfg.shift.policy(),
    )
    .with_concurrency(cfg.scan.concurrency);
    let scheduler = Scheduler::new(reconciler, cfg.interval());

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr, scheduler.status())?;
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                shutdown.cancel();
            }
            Err(e) => tracing::error!(error = %e, "failed to listen for shutdown signal"),
        }
    });

    scheduler.run(cancel).await;

    Ok(())
}
