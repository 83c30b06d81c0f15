//! Application startup and lifecycle management.

use crate::config::PalmConfig;
use crate::handlers;
use crate::services::providers::openai::{OpenAiConfig, OpenAiVisionProvider};
use crate::services::providers::VisionProvider;
use crate::services::{metrics, AnalysisStore, MemStorage, PalmReader};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub reader: PalmReader,
    pub store: Arc<dyn AnalysisStore>,
}

/// Build the HTTP router with all middleware applied.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics))
        .route("/api/analyze-palm", post(handlers::analyze_palm))
        .route("/api/analysis/:id", get(handlers::get_analysis))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application against the configured OpenAI endpoint.
    pub async fn build(config: PalmConfig) -> Result<Self, AppError> {
        if config.openai.has_placeholder_key() {
            tracing::warn!("OPENAI_API_KEY is not set; palm analyses will fail until it is");
        }

        let model = config.openai.model.clone();
        let max_tokens = config.openai.max_tokens;
        let provider = OpenAiVisionProvider::new(OpenAiConfig {
            api_key: config.openai.api_key,
            model: config.openai.model,
            base_url: config.openai.base_url,
        })
        .map_err(|e| {
            tracing::error!("Failed to initialize OpenAI provider: {}", e);
            AppError::ConfigError(anyhow::anyhow!(e))
        })?;

        tracing::info!(model = %model, max_tokens, "Initialized OpenAI vision provider");

        Self::build_with_provider(config.common, Arc::new(provider), max_tokens).await
    }

    /// Build the application around an explicit provider.
    pub async fn build_with_provider(
        common: service_core::config::Config,
        provider: Arc<dyn VisionProvider>,
        max_tokens: u32,
    ) -> Result<Self, AppError> {
        metrics::init_metrics();

        let state = AppState {
            reader: PalmReader::new(provider, max_tokens),
            store: Arc::new(MemStorage::new()),
        };
        let router = build_router(state.clone(), common.max_body_bytes);

        // Port 0 = random port for testing
        let addr = common.socket_addr()?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Palm service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            router,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a handle to the analysis store.
    pub fn store(&self) -> Arc<dyn AnalysisStore> {
        self.state.store.clone()
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
