//! Business Marketplace - Backend
//!
//! REST API for listing small and medium businesses for sale: catalog
//! search, the seller submission workflow (email verification and listing
//! fee), buyer subscriptions, and PDF document attachments.

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod telemetry;

pub use config::Config;

use crate::middleware::auth_middleware;
use crate::services::PaymentSimulator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub payments: PaymentSimulator,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        let payments = PaymentSimulator::new(config.payments.success_rate);
        Self {
            db,
            config: Arc::new(config),
            payments,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::liveness))
        .nest("/api", routes::api_routes())
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Business Marketplace API v1.0"
}
