//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_queue_admitted_total` (counter)
//! - `gate_queue_rejected_total` (counter): queue full
//! - `gate_queue_timeouts_total` (counter): expired while waiting
//! - `gate_queue_cleared_total` (counter)
//! - `gate_queue_completed_total` (counter): by outcome
//! - `gate_queue_waiting` / `gate_queue_active` (gauges)
//! - `gate_queue_wait_seconds` / `gate_queue_run_seconds` (histograms)
//! - `gate_retries_total` (counter)
//! - `gate_breaker_transitions_total` (counter): by breaker, target state
//! - `gate_breaker_rejections_total` (counter): by breaker
//! - `gate_dedup_requests_total` (counter): hit or miss
//! - `gate_dedup_entries` (gauge)
//! - `gate_http_requests_total` / `gate_http_request_duration_seconds`: by route, status

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_queue_admitted() {
    counter!("gate_queue_admitted_total").increment(1);
}

pub fn record_queue_rejected() {
    counter!("gate_queue_rejected_total").increment(1);
}

pub fn record_queue_timeout() {
    counter!("gate_queue_timeouts_total").increment(1);
}

pub fn record_queue_cleared(count: usize) {
    counter!("gate_queue_cleared_total").increment(count as u64);
}

pub fn record_queue_wait(wait: Duration) {
    histogram!("gate_queue_wait_seconds").record(wait.as_secs_f64());
}

pub fn record_queue_completed(success: bool, run_time: Duration) {
    let outcome = if success { "success" } else { "failure" };
    counter!("gate_queue_completed_total", "outcome" => outcome).increment(1);
    histogram!("gate_queue_run_seconds").record(run_time.as_secs_f64());
}

pub fn set_queue_depth(waiting: usize, active: usize) {
    gauge!("gate_queue_waiting").set(waiting as f64);
    gauge!("gate_queue_active").set(active as f64);
}

pub fn record_retry() {
    counter!("gate_retries_total").increment(1);
}

pub fn record_breaker_transition(breaker: &str, to: &'static str) {
    counter!("gate_breaker_transitions_total", "breaker" => breaker.to_string(), "to" => to).increment(1);
}

pub fn record_breaker_rejection(breaker: &str) {
    counter!("gate_breaker_rejections_total", "breaker" => breaker.to_string()).increment(1);
}

pub fn record_dedup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("gate_dedup_requests_total", "result" => result).increment(1);
}

pub fn set_dedup_entries(entries: usize) {
    gauge!("gate_dedup_entries").set(entries as f64);
}

pub fn record_http_request(route: &'static str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!("gate_http_requests_total", "route" => route, "status" => status.clone()).increment(1);
    histogram!("gate_http_request_duration_seconds", "route" => route, "status" => status)
        .record(start.elapsed().as_secs_f64());
}
