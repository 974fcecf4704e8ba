//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the public and admin handlers
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Serve on a listener until the shutdown broadcast fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::admission::AdmissionController;
use crate::config::GateConfig;
use crate::http::handlers;
use crate::http::request::UuidRequestId;
use crate::upstream::{Completion, UpstreamClient, UpstreamError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<AdmissionController<Completion>>,
    pub upstream: Arc<UpstreamClient>,
    pub config: Arc<GateConfig>,
}

impl AppState {
    pub fn new(config: GateConfig) -> Result<Self, UpstreamError> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let controller = AdmissionController::from_config(&config);
        Ok(Self {
            controller: Arc::new(controller),
            upstream: Arc::new(upstream),
            config: Arc::new(config),
        })
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let config = Arc::clone(&state.config);

    let mut router = Router::new()
        .route("/v1/generate", post(handlers::generate))
        .route("/health", get(handlers::health));

    if config.admin.enabled {
        router = router.merge(admin::routes(state.clone()));
    }

    // Outermost last: the request ID must exist before tracing sees the request.
    router
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_secs),
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: GateConfig) -> Result<Self, UpstreamError> {
        let state = AppState::new(config)?;
        Ok(Self::with_state(state))
    }

    pub fn with_state(state: AppState) -> Self {
        let router = build_router(state.clone());
        Self { router, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            admin_enabled = self.state.config.admin.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal, draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
