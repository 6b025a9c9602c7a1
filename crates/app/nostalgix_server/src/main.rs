//! Nostalgix API server binary.
//!
//! Connects to PostgreSQL, runs migrations and serves the auth API until
//! interrupted.

use std::sync::Arc;

use clap::Parser;
use nostalgix_api::config::ApiConfig;
use nostalgix_core::auth::jwt::{DEFAULT_ACCESS_TOKEN_TTL_MINUTES, resolve_jwt_secret};
use nostalgix_core::auth::service::AuthService;
use nostalgix_core::auth::store::PgCredentialStore;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "nostalgix_server", about = "Nostalgix API server", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/nostalgix"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 10)]
    max_connections: u32,

    /// Access token lifetime in minutes.
    #[arg(long, env = "JWT_EXPIRATION_MINUTES", default_value_t = DEFAULT_ACCESS_TOKEN_TTL_MINUTES)]
    jwt_expiration_minutes: i64,

    /// Dedicated secret for refresh-token hashing (defaults to the JWT secret).
    #[arg(long, env = "REFRESH_TOKEN_SECRET", hide_env_values = true)]
    refresh_token_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,nostalgix_api=debug,nostalgix_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        bind_addr: args.bind_addr,
        pg_connection_url: args.database_url,
        jwt_secret: resolve_jwt_secret(),
        refresh_token_secret: args.refresh_token_secret,
        jwt_expiration_minutes: args.jwt_expiration_minutes,
    };

    info!(
        version = nostalgix_core::version(),
        max_connections = args.max_connections,
        "starting nostalgix_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.pg_connection_url)
        .await?;

    info!("running database migrations");
    nostalgix_core::migrate::migrate(&pool).await?;

    let issuer = config.token_issuer()?;
    let store = Arc::new(PgCredentialStore::new(pool));
    let state = nostalgix_api::AppState {
        auth: AuthService::new(store, issuer),
    };

    let app = nostalgix_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining connections");
}
