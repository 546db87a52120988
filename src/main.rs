// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use std::env;
use std::time::Duration;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod address;
mod common;
mod logging_middleware;
mod services;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use address::session::SessionStore;
use common::AppState;
use services::{DirectoryService, SubmissionService};

// Default address-type identifiers tagged onto the submission payloads;
// overridable per deployment
const DEFAULT_PRESENT_ADDRESS_TYPE_ID: &str = "18731f89-91ca-4469-9c5a-674d307a5616";
const DEFAULT_PERMANENT_ADDRESS_TYPE_ID: &str = "2c2cdb7f-92a3-4c8c-a7bf-2d8ba56a31f2";

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let directory_api_url =
        env::var("DIRECTORY_API_URL").unwrap_or_else(|_| "http://localhost:4000".to_string());
    let profile_api_url =
        env::var("PROFILE_API_URL").unwrap_or_else(|_| "http://localhost:4000".to_string());
    let directory_timeout_seconds = env::var("DIRECTORY_TIMEOUT_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(10);
    let session_ttl_seconds = env::var("SESSION_TTL_SECONDS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1800);
    let present_type_id = env::var("PRESENT_ADDRESS_TYPE_ID")
        .unwrap_or_else(|_| DEFAULT_PRESENT_ADDRESS_TYPE_ID.to_string());
    let permanent_type_id = env::var("PERMANENT_ADDRESS_TYPE_ID")
        .unwrap_or_else(|_| DEFAULT_PERMANENT_ADDRESS_TYPE_ID.to_string());

    info!(
        directory_api_url = %directory_api_url,
        profile_api_url = %profile_api_url,
        "Loaded configuration"
    );

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(directory_timeout_seconds))
        .build()?;

    let directory = Arc::new(DirectoryService::new(
        http_client.clone(),
        directory_api_url,
    ));
    info!("DirectoryService initialized");

    let submission = Arc::new(SubmissionService::new(
        http_client,
        profile_api_url,
        present_type_id,
        permanent_type_id,
    ));
    info!("SubmissionService initialized");

    let sessions = SessionStore::new();
    SessionStore::start_cleanup_task(sessions.clone(), Duration::from_secs(session_ttl_seconds));
    info!("Session store cleanup task started");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        directory,
        submission,
        sessions,
    };

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        // ====================================================================
        // ADDRESS FORM ROUTES (Sessions, Prefill, Selection, Submission)
        // ====================================================================
        .merge(address::address_routes())
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        // Add request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared.clone()))
        .layer({
            // Get CORS origins from environment variable
            let cors_origins = std::env::var("CORS_ORIGINS").unwrap_or_else(|_| {
                "http://localhost:3000,http://localhost:3001".to_string()
            });

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
