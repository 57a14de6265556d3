mod cache;
mod cli;
mod config;
mod dto;
mod error;
mod handlers;
mod models;
mod repositories;
mod services;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::RedisCache;
use crate::config::{AppState, Config};
use crate::handlers::{
    clients::{create_client_handler, deactivate_client_handler, get_client_handler},
    oauth::{
        approve_handler, authorize_handler, deny_handler, introspect_handler, revoke_handler,
        token_handler,
    },
    users::{create_user_handler, deactivate_user_handler, get_user_handler},
};

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check - verifies database connection
async fn ready_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<HealthResponse>, axum::http::StatusCode> {
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .map_err(|_| axum::http::StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(HealthResponse {
        status: "ready",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// Create the application router with all routes configured
///
/// ## OAuth2 protocol routes
/// - GET  /oauth2/authorize         - Authorization request validation
/// - POST /oauth2/authorize/approve - Consent approval, redirects with code
/// - POST /oauth2/authorize/deny    - Consent denial, redirects with error
/// - POST /oauth2/token             - Token endpoint (all grant types)
/// - POST /oauth2/introspect        - Token introspection (RFC 7662)
/// - POST /oauth2/revoke            - Token revocation (RFC 7009)
///
/// ## Management routes
/// - POST /users, GET /users/:id, POST /users/:id/deactivate
/// - POST /clients, GET /clients/:id, POST /clients/:id/deactivate
///
/// ## Operational routes
/// - GET /health, GET /ready
pub fn create_router(state: AppState) -> Router {
    let oauth_routes = Router::new()
        .route("/authorize", get(authorize_handler))
        .route("/authorize/approve", post(approve_handler))
        .route("/authorize/deny", post(deny_handler))
        .route("/token", post(token_handler))
        .route("/introspect", post(introspect_handler))
        .route("/revoke", post(revoke_handler));

    let user_routes = Router::new()
        .route("/", post(create_user_handler))
        .route("/:user_id", get(get_user_handler))
        .route("/:user_id/deactivate", post(deactivate_user_handler));

    let client_routes = Router::new()
        .route("/", post(create_client_handler))
        .route("/:client_id", get(get_client_handler))
        .route("/:client_id/deactivate", post(deactivate_client_handler));

    let allow_origin = if state.config.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .nest("/oauth2", oauth_routes)
        .nest("/users", user_routes)
        .nest("/clients", client_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server with the given configuration.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let cache = Arc::new(RedisCache::from_url(&config.redis_url)?);

    let addr = config.socket_addr();
    let state = AppState::new(pool, cache, config);

    // Periodic sweep of expired authorization codes and tokens.
    let maintenance = state.oauth.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        interval.tick().await;
        loop {
            interval.tick().await;
            match maintenance.cleanup_expired().await {
                Ok((codes, tokens)) => {
                    tracing::debug!(codes, tokens, "purged expired grants");
                }
                Err(e) => tracing::warn!(error = %e, "expired-grant cleanup failed"),
            }
        }
    });

    let app = create_router(state);

    tracing::info!(
        "Identity Service v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
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

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let cli = cli::Cli::parse();
    cli::run(cli).await
}
