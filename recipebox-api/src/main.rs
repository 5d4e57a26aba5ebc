//! # Recipebox API Server
//!
//! HTTP API for managing recipes, tags and ingredients, with bearer-token
//! authentication and recipe image upload.
//!
//! ## Usage
//!
//! ```bash
//! # Run the server (default)
//! cargo run -p recipebox-api
//!
//! # Create an administrator account
//! cargo run -p recipebox-api -- createsuperuser --email admin@example.com --password secret
//! ```
//!
//! Both commands read their settings from the environment (see
//! `recipebox_api::config`) and apply pending migrations first.

use clap::{Parser, Subcommand};
use recipebox_api::{
    app::{build_router, AppState},
    config::{Config, LogFormat},
};
use recipebox_shared::{
    db::{
        migrations::run_migrations,
        pool::{create_pool, PoolConfig},
    },
    models::user::{CreateUser, User},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "recipebox-api")]
#[command(about = "Recipebox API server", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve,

    /// Create a user with staff and superuser flags set
    #[command(name = "createsuperuser")]
    CreateSuperuser {
        /// Email address for the superuser
        #[arg(long, value_name = "EMAIL")]
        email: String,

        /// Password for the superuser
        #[arg(long, value_name = "PASSWORD", env = "SUPERUSER_PASSWORD")]
        password: String,

        /// Display name
        #[arg(long, value_name = "NAME", default_value = "")]
        name: String,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "recipebox_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    tracing::info!(
        "Recipebox API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let pool = create_pool(
        &PoolConfig::new(config.database.url.clone())
            .with_max_connections(config.database.max_connections),
    )
    .await?;
    run_migrations(&pool).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(pool, config).await,
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let user =
                User::create_superuser(&pool, CreateUser::new(email, password).with_name(name))
                    .await?;
            tracing::info!(user_id = user.id, "Superuser {} created", user);
            Ok(())
        }
    }
}

async fn serve(pool: sqlx::PgPool, config: Config) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.media.root).await?;

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await;
}

/// Resolves once `signal` fires
///
/// If the listener itself fails there is no way to be told to stop, so
/// this never resolves and the server keeps running until it is killed.
async fn wait_for_signal<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, exiting...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_for_signal_resolves_on_signal() {
        let waited =
            tokio::time::timeout(Duration::from_millis(100), wait_for_signal(async { Ok(()) })).await;
        assert!(waited.is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_signal_keeps_running_when_listener_fails() {
        let failing = async { Err(std::io::Error::new(std::io::ErrorKind::Other, "no handler")) };
        let waited = tokio::time::timeout(Duration::from_millis(100), wait_for_signal(failing)).await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["recipebox-api"]).unwrap();
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from([
            "recipebox-api",
            "createsuperuser",
            "--email",
            "admin@example.com",
            "--password",
            "secret",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Command::CreateSuperuser { .. })));
    }
}
