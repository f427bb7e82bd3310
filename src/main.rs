use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use likeguess::{api, auth, source::SourceConfig, state::AppState, types::GameConfig, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "likeguess=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LikeGuess...");

    let auth_config = Arc::new(auth::AuthConfig::from_env());
    let game_config = GameConfig::from_env();

    let source_config = SourceConfig::from_env();
    let source = match source_config.build_source() {
        Ok(source) => {
            tracing::info!("Live source '{}' initialized", source.name());
            Some(source)
        }
        Err(e) => {
            tracing::warn!(
                "Live source unavailable: {}. Chat and likes will not be relayed.",
                e
            );
            None
        }
    };

    let state = Arc::new(AppState::with_config(game_config, source));

    if let Some(username) = &source_config.default_username {
        tracing::info!("Auto-connecting to @{}", username);
        if let Err(e) = state.connect_source(username).await {
            tracing::warn!("Auto-connect failed: {}", e);
        }
    }

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/connect", post(api::connect))
        .route("/api/state", get(api::game_state))
        .layer(middleware::from_fn_with_state(
            auth_config,
            auth::operator_auth_middleware,
        ))
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
