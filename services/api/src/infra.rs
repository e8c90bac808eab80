use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use treehub::config::AppConfig;
use treehub::error::AppError;
use treehub::marketplace::{Clock, Database, Marketplace, SqliteMarketplace, SystemClock};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Open the configured database and wire every marketplace service to it.
pub(crate) fn open_marketplace(
    config: &AppConfig,
    database_path: &str,
) -> Result<Marketplace<SqliteMarketplace>, AppError> {
    let db = Database::open(database_path)?;
    info!(database = %database_path, "database ready");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    Ok(Marketplace::sqlite(db, clock, &config.auth))
}
