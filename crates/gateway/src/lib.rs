//! HTTP API gateway for Wellmed AI.
//!
//! Exposes the chat completion proxy, PDF text extraction and a health
//! probe under `/api`. Built on Axum.

pub mod api;
pub mod error;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::response::{IntoResponse, Response};
use axum::{
    Router,
    routing::{get, post},
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{error, info, warn};

use wellmed_config::{AppConfig, GatewayConfig};
use wellmed_pipeline::ChatPipeline;
use wellmed_providers::OpenAiCompatProvider;

use crate::error::ApiError;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: ChatPipeline,
    pub environment: String,
    pub max_upload_bytes: usize,
}

impl GatewayState {
    pub fn new(pipeline: ChatPipeline, gateway: &GatewayConfig) -> Self {
        Self {
            pipeline,
            environment: gateway.environment.clone(),
            max_upload_bytes: gateway.max_upload_bytes,
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// Layers, innermost first:
/// - request body limit sized for the largest allowed upload
/// - CORS for the single configured origin
/// - panic recovery into a JSON 500
/// - HTTP trace logging
pub fn build_router(state: SharedState, gateway: &GatewayConfig) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/chat", post(api::chat))
        .route("/api/analyze-pdf", post(api::analyze_pdf))
        .with_state(state)
        .layer(DefaultBodyLimit::max(
            gateway.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(cors_layer(&gateway.allowed_origin))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match HeaderValue::from_str(origin) {
        Ok(origin) => cors.allow_origin(AllowOrigin::exact(origin)),
        Err(e) => {
            warn!(origin = %origin, error = %e, "Invalid allowed origin; cross-origin requests will be refused");
            cors
        }
    }
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into());
    error!(reason = %reason, "Handler panicked");
    ApiError::internal().into_response()
}

/// Start the gateway HTTP server.
///
/// The upstream provider and pipeline are built once and shared by every
/// request. A missing API key does not prevent startup.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = Arc::new(OpenAiCompatProvider::from_config(&config)?);
    let pipeline = ChatPipeline::from_config(&config, provider)?;
    let state = Arc::new(GatewayState::new(pipeline, &config.gateway));
    let app = build_router(state, &config.gateway);

    info!(
        addr = %addr,
        environment = %config.gateway.environment,
        upstream = %config.upstream.base_url,
        "Gateway starting"
    );
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
