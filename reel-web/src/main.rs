//! reel-web - movie catalog browsing and live reviews service
//!
//! Serves the browse, movie, review and live feed endpoints for the UI.
//! Configuration: CLI arguments, then REEL_* environment variables, then the
//! TOML config file, then compiled defaults.

use anyhow::{Context, Result};
use clap::Parser;
use reel_catalog::TmdbClient;
use reel_common::config::{resolve_database_path, resolve_tmdb_access_token, TomlConfig};
use reel_common::db::init_database;
use reel_web::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "reel-web")]
#[command(about = "Movie catalog browsing and live review service")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref());

    // RUST_LOG wins over the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting Reel web service (reel-web) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let access_token = resolve_tmdb_access_token(&config)?;
    let tmdb = Arc::new(TmdbClient::new(&config.tmdb, access_token)?);
    info!(
        base_url = %config.tmdb.base_url,
        region = tmdb.region(),
        "Catalog client ready"
    );

    let db_path = resolve_database_path(args.database.as_deref(), &config);
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let state = AppState::assemble(&config, tmdb, pool);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let bind_addr = format!("{}:{}", config.bind_address, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("reel-web listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
