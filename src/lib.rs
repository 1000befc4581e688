//! Cold-chain logistics backend: demand forecasts, delivery planning and
//! live temperature monitoring over a relational store.

pub mod config;
pub mod error;
pub mod handlers;
pub mod logger;
pub mod models;
pub mod repository;
pub mod services;
pub mod utils;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::services::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Forecasts
        .route("/api/forecasts", post(handlers::forecasts::generate_forecast))
        .route("/api/forecasts/weekly", get(handlers::forecasts::weekly_forecast))
        .route("/api/forecasts/weekly/chart", get(handlers::forecasts::weekly_chart))
        // Deliveries
        .route("/api/deliveries", get(handlers::deliveries::list_deliveries))
        .route("/api/deliveries/plan", post(handlers::deliveries::generate_plan))
        .route("/api/deliveries/:id", get(handlers::deliveries::get_delivery))
        .route("/api/deliveries/:id/driver", put(handlers::deliveries::assign_driver))
        .route("/api/deliveries/:id/status", put(handlers::deliveries::update_status))
        .route("/api/drivers", get(handlers::deliveries::list_drivers))
        // Monitoring
        .route("/api/upload", post(handlers::sensors::upload_reading))
        .route("/api/sensor-data", get(handlers::sensors::latest_readings))
        .route("/api/dashboard", get(handlers::dashboard::summary))
        // Health
        .route("/health", get(handlers::health::health_check))
        .layer(cors_layer(state.config.cors_origin.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(e)) => {
            warn!(error = %e, "Ignoring invalid CORS_ORIGIN, allowing any origin");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}
