use crate::AppState;
use actix_web::{web, HttpResponse};

/// GET /health
pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "feed-service",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health/ready - the store must answer a query
pub async fn readiness(state: web::Data<AppState>) -> HttpResponse {
    match state.store.posts.count().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ready",
            "service": "feed-service",
            "realtimeSubscribers": state.broadcaster.subscriber_count()
        })),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unavailable",
                "service": "feed-service"
            }))
        }
    }
}
