//! Excuse Server
//!
//! HTTP service that hands out excuses from an in-memory or PostgreSQL
//! store, accepts new ones, collects ratings and reports statistics.

mod config;
mod error;
mod handlers;
mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use clap::Parser;
use excuse_core::{ExcuseStore, ValidationPolicy};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, BackendKind, LogFormat, LoggingConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ExcuseStore>,
    pub policy: Arc<ValidationPolicy>,
}

#[derive(Parser)]
#[command(name = "excuse-server")]
#[command(author, version, about = "Excuse API server", long_about = None)]
struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = "EXCUSE_CONFIG")]
    config: Option<PathBuf>,

    /// Storage backend, overrides the config file
    #[arg(short, long, value_enum)]
    backend: Option<BackendKind>,

    /// Seed file loaded at startup, overrides the config file
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Start without loading any seed file
    #[arg(long, conflicts_with = "seed")]
    no_seed: bool,
}

#[tokio::main]
async fn main() {
    // Set up panic hook to log crashes
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()));
        let payload = if let Some(s) = info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        eprintln!("[PANIC] at {:?}: {}", location, payload);
        tracing::error!("PANIC at {:?}: {}", location, payload);
    }));

    let cli = Cli::parse();

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[FATAL] {:#}", e);
            std::process::exit(1);
        }
    };
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    if cli.no_seed {
        config.storage.seed_file = None;
    } else if let Some(seed) = cli.seed {
        config.storage.seed_file = Some(seed);
    }

    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("[FATAL] {:#}", e);
        std::process::exit(1);
    }

    info!("Starting Excuse Server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_server(config).await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("Invalid log level: {}", logging.level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match logging.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

async fn run_server(config: AppConfig) -> Result<()> {
    info!("Initializing {} storage...", config.storage.backend);
    let store = storage::build_store(&config).await?;

    if let Some(seed) = &config.storage.seed_file {
        storage::seed_store(store.as_ref(), seed).await;
    }

    let state = AppState {
        store,
        policy: Arc::new(config.validation.clone()),
    };

    let app = build_app(state);

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .context("Failed to parse bind address")?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/v1", api_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/excuses/random", get(handlers::excuses::random))
        .route(
            "/excuses",
            get(handlers::excuses::list).post(handlers::excuses::create),
        )
        .route("/excuses/:id/rate", post(handlers::excuses::rate))
        .route("/stats", get(handlers::stats::get))
}
