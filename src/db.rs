use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{info, instrument};

use crate::configuration::Settings;

#[instrument(skip(settings))]
pub async fn init_db(settings: &Settings) -> anyhow::Result<DatabaseConnection> {
    info!("configuring database connection pool");

    let mut options = ConnectOptions::new(settings.database_url.clone());
    options
        .max_connections(settings.db_max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(settings.debug);

    // an in-memory sqlite database only lives as long as its one connection
    if settings.database_url.contains(":memory:") {
        let day = Duration::from_secs(24 * 60 * 60);
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(day)
            .max_lifetime(day);
    }

    let db = Database::connect(options).await?;
    info!(sqlite = settings.is_sqlite(), "database connection established");

    Ok(db)
}
