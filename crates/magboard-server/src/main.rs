//! Magboard HTTP server binary.

use axum::http::HeaderValue;
use magboard_core::storage::{FileGateway, Gateway, MemoryGateway};
use magboard_server::{AppState, BlockingGateway, ServerConfig, router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "magboard_server=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let gateway: Arc<dyn Gateway> = match &config.data_dir {
        Some(dir) => {
            info!("Storing campaigns under {}", dir.display());
            Arc::new(BlockingGateway::new(FileGateway::new(dir.clone())?))
        }
        None => {
            warn!("MAGBOARD_DATA_DIR not set, campaigns are kept in memory only");
            Arc::new(MemoryGateway::new())
        }
    };

    let state = Arc::new(AppState::new(gateway, config.presence_staleness));
    let app = router(state).layer(cors_layer(&config));

    let addr = config.bind_addr()?;
    info!("Magboard server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
