use axum::{
    http::{header, HeaderName, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::handlers::{self, AppState};
use crate::webhook_handler;

/// Router without rate limiting. Used by tests and anywhere client IPs are unavailable.
pub fn build_router(state: Arc<AppState>) -> Router {
    assemble(state, protected_routes())
}

/// Router with per-IP rate limiting on everything except the status route.
///
/// Must be served with connect info so the limiter can fall back to the peer address.
pub fn build_rate_limited_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let replenish_ms = (1000 / state.config.rate_limit_per_second).max(1);
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(replenish_ms)
            .burst_size(state.config.rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
    );

    let protected = protected_routes().layer(GovernorLayer {
        config: governor_conf,
    });

    Ok(assemble(state, protected))
}

fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Form tool webhook
        .route("/webhook/scoreapp", post(webhook_handler::scoreapp_webhook))
        .route(
            "/webhook/scoreapp/:scorecard_id",
            post(webhook_handler::scoreapp_webhook),
        )
        // Dashboard API
        .route("/api/import", post(handlers::import_leads))
        .route("/api/stats", get(handlers::get_stats))
        .route(
            "/api/leads",
            get(handlers::list_leads).delete(handlers::delete_leads),
        )
        .route("/api/scorecards", get(handlers::list_scorecards))
        .route("/api/test-lead", post(handlers::create_test_lead))
}

fn assemble(state: Arc<AppState>, protected: Router<Arc<AppState>>) -> Router {
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        .route("/", get(handlers::status))
        .merge(protected)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-webhook-secret"),
        ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook_handler::SECRET_HEADER;

    #[test]
    fn test_secret_header_name_is_valid() {
        assert_eq!(
            HeaderName::from_static("x-webhook-secret"),
            HeaderName::try_from(SECRET_HEADER).unwrap()
        );
    }
}
