//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_received_total` (counter)
//! - `api_responses_sent_total` (counter)
//! - `api_responses_by_status_total` (counter, `status` label)
//! - `api_request_duration_seconds` (histogram)
//! - `api_rate_limited_total` (counter)

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(err) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(error = %err, "failed to install metrics exporter");
        return;
    }
    describe_counter!("api_requests_received_total", "Requests entering the pipeline");
    describe_counter!("api_responses_sent_total", "Responses written");
    describe_counter!("api_responses_by_status_total", "Responses by HTTP status");
    describe_counter!("api_rate_limited_total", "Requests rejected by the rate limiter");
    describe_histogram!("api_request_duration_seconds", "Request processing time");
    tracing::info!(address = %addr, "metrics exposition listening");
}

pub fn record_rate_limited() {
    counter!("api_rate_limited_total").increment(1);
}

/// Outermost pipeline stage: counts the request in and the response out.
pub async fn track_requests(req: Request, next: Next) -> Response {
    counter!("api_requests_received_total").increment(1);
    let started = Instant::now();

    let response = next.run(req).await;

    counter!("api_responses_sent_total").increment(1);
    counter!(
        "api_responses_by_status_total",
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    histogram!("api_request_duration_seconds").record(started.elapsed().as_secs_f64());
    response
}
