/// Embedded schema migrations
///
/// Migration files live in `migrations/` at the workspace root and are
/// compiled into the binary by `sqlx::migrate!`. Each migration has an
/// `.up.sql` and a `.down.sql` half.

use sqlx::{migrate::Migrator, postgres::PgPool};
use tracing::{info, warn};

/// All migrations known to this build
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");

/// Applies every pending migration
///
/// # Errors
///
/// Returns an error if a migration fails to apply or if an already-applied
/// migration no longer matches its file.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(
        known_migrations = MIGRATOR.iter().count(),
        "Running database migrations"
    );

    match MIGRATOR.run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

/// Number of migrations recorded as applied
pub async fn applied_migrations(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
}
