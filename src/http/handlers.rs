//! Public API handlers.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admission::RunOptions;
use crate::error::GateError;
use crate::http::request::request_id;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::resilience::CircuitState;
use crate::upstream::Completion;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    /// Overrides the derived dedup key.
    #[serde(default)]
    pub dedup_key: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Maximum queue wait in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub completion: Completion,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub breaker: CircuitState,
}

/// `POST /v1/generate`
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let start = Instant::now();
    let result = match payload {
        Ok(Json(body)) => run_generate(&state, &headers, body).await,
        Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
    };

    let status = match &result {
        Ok(_) => 200,
        Err(err) => err.status().as_u16(),
    };
    metrics::record_http_request("/v1/generate", status, start);
    result
}

async fn run_generate(
    state: &AppState,
    headers: &HeaderMap,
    body: GenerateRequest,
) -> Result<Json<GenerateResponse>, ApiError> {
    if body.prompt.trim().is_empty() {
        return Err(ApiError::Validation("prompt must not be empty".to_string()));
    }

    let request_id = request_id(headers).map(str::to_string);
    let key = body.dedup_key.clone().unwrap_or_else(|| {
        derive_dedup_key(body.user_id.as_deref(), body.system.as_deref(), &body.prompt)
    });
    let options = RunOptions {
        dedup_key: Some(key),
        priority: body.priority.unwrap_or(state.config.queue.default_priority),
        timeout: body.timeout_ms.map(Duration::from_millis),
    };

    tracing::debug!(
        request_id = ?request_id,
        priority = options.priority,
        "Admitting generate request"
    );

    let upstream = Arc::clone(&state.upstream);
    let system = body.system;
    let prompt = body.prompt;
    let forwarded_id = request_id.clone();

    let completion = state
        .controller
        .run(options, move || {
            let upstream = Arc::clone(&upstream);
            let system = system.clone();
            let prompt = prompt.clone();
            let forwarded_id = forwarded_id.clone();
            async move {
                upstream
                    .complete(system.as_deref(), &prompt, forwarded_id.as_deref())
                    .await
                    .map_err(GateError::from)
            }
        })
        .await?;

    Ok(Json(GenerateResponse {
        request_id,
        completion,
    }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        breaker: state.controller.breaker().state(),
    })
}

/// Stable per-process key for identical prompts from the same user.
pub fn derive_dedup_key(user_id: Option<&str>, system: Option<&str>, prompt: &str) -> String {
    let mut hasher = DefaultHasher::new();
    user_id.hash(&mut hasher);
    system.hash(&mut hasher);
    prompt.hash(&mut hasher);
    format!("gen:{:016x}", hasher.finish())
}
