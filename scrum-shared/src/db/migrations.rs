/// Database migration runner
///
/// Migrations live in `scrum-shared/migrations/` and are embedded into the
/// binary at compile time by `sqlx::migrate!`.

use crate::repo::StoreResult;
use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Applies every pending migration
///
/// Already-applied migrations are skipped, so this is safe to call on every
/// startup.
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    info!("Starting database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("All database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}

/// Creates the database if it does not exist yet
pub async fn ensure_database_exists(database_url: &str) -> StoreResult<()> {
    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
    } else {
        debug!("Database already exists");
    }

    Ok(())
}
