//! Plan entitlement gateway: decides whether a client-declared action is
//! permitted under its subscription plan and blocks clients trying to
//! forge or abuse that entitlement.

pub mod config;
pub mod fraud;
pub mod handlers;
pub mod integrity;
pub mod rate_limit;

#[cfg(test)]
mod tests;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use config::Config;
use fraud::FraudDetector;
use rate_limit::RateLimiter;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rate_limiter: Arc<RateLimiter>,
    pub fraud_detector: Arc<FraudDetector>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            rate_limiter: Arc::new(RateLimiter::new()),
            fraud_detector: Arc::new(FraudDetector::new()),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    let allowed_origin = state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| HeaderValue::from_static(config::DEFAULT_ORIGIN));

    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-request-id"),
            header::HeaderName::from_static("x-timestamp"),
        ]);

    Router::new()
        .route("/validate-plan-usage", post(handlers::validate_plan_usage))
        // Read-only catalog and entitlement views
        .route("/plans", get(handlers::list_plans))
        .route("/plans/:id", get(handlers::get_plan))
        .route("/features/:tier", get(handlers::feature_profile))
        .route("/health", get(handlers::health))
        // Security headers on every response, including rejections
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
