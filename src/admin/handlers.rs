use axum::{extract::State, Json};
use serde::Serialize;

use crate::admission::AdmissionSnapshot;
use crate::http::server::AppState;
use crate::resilience::{BreakerSnapshot, CircuitState};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub breaker: CircuitState,
    pub waiting: usize,
    pub active: usize,
}

#[derive(Serialize)]
pub struct ClearedQueue {
    pub cleared: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let queue = state.controller.queue().stats();
    let breaker = state.controller.breaker().state();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: if breaker == CircuitState::Open {
            "degraded"
        } else {
            "operational"
        },
        breaker,
        waiting: queue.waiting,
        active: queue.active,
    })
}

pub async fn get_stats(State(state): State<AppState>) -> Json<AdmissionSnapshot> {
    Json(state.controller.snapshot())
}

pub async fn reset_breaker(State(state): State<AppState>) -> Json<BreakerSnapshot> {
    state.controller.breaker().reset();
    tracing::info!("Circuit breaker reset via admin API");
    Json(state.controller.breaker().snapshot())
}

pub async fn clear_queue(State(state): State<AppState>) -> Json<ClearedQueue> {
    let cleared = state.controller.queue().clear();
    tracing::info!(cleared, "Queue cleared via admin API");
    Json(ClearedQueue { cleared })
}
