/// Database layer for Recipebox
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Embedded schema migrations
///
/// Models live in the `models` module at crate root level.
///
/// # Example
///
/// ```no_run
/// use recipebox_shared::db::{migrations::run_migrations, pool::{create_pool, PoolConfig}};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&PoolConfig::new(std::env::var("DATABASE_URL")?)).await?;
/// run_migrations(&pool).await?;
/// # Ok(())
/// # }
/// ```

pub mod migrations;
pub mod pool;
