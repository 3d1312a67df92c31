//! Prometheus metrics for feed-service.
//!
//! Exposes post, auth and realtime collectors and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec, register_int_gauge, Encoder, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    /// Post changes published to realtime subscribers, by action (create/update/delete).
    pub static ref POST_EVENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_post_events_total",
        "Post change events published segmented by action",
        &["action"]
    )
    .expect("failed to register feed_post_events_total");

    /// Signup and login attempts by outcome.
    pub static ref AUTH_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "feed_auth_attempts_total",
        "Authentication attempts segmented by operation and outcome",
        &["operation", "outcome"]
    )
    .expect("failed to register feed_auth_attempts_total");

    /// Currently connected realtime subscribers (WebSocket + GraphQL).
    pub static ref REALTIME_SUBSCRIBERS: IntGauge = register_int_gauge!(
        "feed_realtime_subscribers",
        "Number of connected realtime subscribers"
    )
    .expect("failed to register feed_realtime_subscribers");
}

pub fn record_auth(operation: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    AUTH_ATTEMPTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_metrics_exposed() {
        record_auth("login", true);
        POST_EVENTS_TOTAL.with_label_values(&["create"]).inc();

        let resp = serve_metrics().await;
        assert!(resp.status().is_success());

        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("feed_auth_attempts_total"));
        assert!(text.contains("feed_post_events_total"));
    }
}
