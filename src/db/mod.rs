pub(crate) mod models;
pub(crate) mod types;

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use tracing::log::LevelFilter;

use crate::core::config::DatabaseSettings;

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);
const SLOW_STATEMENT: Duration = Duration::from_millis(500);

pub(crate) async fn init_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let options = PgConnectOptions::from_str(&settings.url)?
        .application_name(env!("CARGO_PKG_NAME"))
        .log_statements(LevelFilter::Trace)
        .log_slow_statements(LevelFilter::Warn, SLOW_STATEMENT);

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;

    tracing::info!(max_connections = settings.max_connections, "Database pool ready");
    Ok(pool)
}

/// Applies the migrations embedded from `migrations/`.
pub(crate) async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    let migrator = sqlx::migrate!("./migrations");
    migrator.run(pool).await?;
    tracing::info!(applied = migrator.iter().count(), "Migrations up to date");
    Ok(())
}
