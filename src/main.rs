//! Campus Portal Server
//!
//! A departmental announcements portal: staff post PDF/image announcements
//! and calendar events; the public browses them. PDFs are stored in a
//! relational BLOB table and streamed to clients in fixed-size windows
//! with a write-through disk cache.

use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod documents;
mod error;
mod media;
mod routes;
mod state;

use config::Config;
use documents::DeliveryCache;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_portal_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    tracing::info!("Starting Campus Portal Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Upload directory: {}", config.storage.upload_dir.display());
    tracing::info!("PDF cache directory: {}", config.storage.pdf_cache_dir.display());

    // Initialize database
    let db_pool = db::create_pool(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    db::initialize_schema(&db_pool)
        .await
        .context("Failed to initialize base schema")?;
    db::initialize_documents_schema(&db_pool)
        .await
        .context("Failed to initialize documents schema")?;
    tracing::info!("Database initialized at {}", config.database.url);

    // Prepare storage directories
    std::fs::create_dir_all(&config.storage.upload_dir)
        .context("Failed to create upload directory")?;
    let cache = DeliveryCache::new(&config.storage.pdf_cache_dir)
        .context("Failed to create PDF cache directory")?;

    let upload_dir = config.storage.upload_dir.clone();
    let port = config.server.port;
    let app_state = AppState::new(config, db_pool, cache);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        .nest("/health", routes::health::router())
        .nest("/posts", routes::posts::router())
        .nest("/documents", routes::documents::router())
        .nest("/events", routes::events::router())
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Campus Portal Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind server address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
