//! Route definitions for the Business Marketplace API

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};
use shared::MAX_DOCUMENT_SIZE_BYTES;

/// Multipart framing allowance on top of the largest accepted file
const UPLOAD_BODY_LIMIT: usize = MAX_DOCUMENT_SIZE_BYTES + 64 * 1024;

/// Create API routes
///
/// Authentication is resolved by the app-wide auth layer; handlers opt in
/// through the `CurrentUser` or `MaybeUser` extractors.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Reference data (public)
        .route("/industries", get(handlers::list_industries))
        .route("/regions", get(handlers::list_regions))
        .route("/risk-grades", get(handlers::list_risk_grades))
        .nest("/auth", auth_routes())
        .nest("/businesses", business_routes())
        .route("/subscription/payment", post(handlers::pay_subscription))
}

/// Authentication routes
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/me", get(handlers::me))
        .route("/verify-email", post(handlers::verify_email))
        .route("/verify-email/resend", post(handlers::resend_verification))
}

/// Listing routes
fn business_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_businesses).post(handlers::create_business),
        )
        .route("/mine", get(handlers::my_businesses))
        .route(
            "/:business_id",
            get(handlers::get_business)
                .put(handlers::update_business)
                .delete(handlers::delete_business),
        )
        .route("/:business_id/submit", post(handlers::submit_business))
        .route("/:business_id/payment", post(handlers::pay_listing_fee))
        .merge(document_routes())
}

/// Listing document routes
fn document_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:business_id/documents",
            get(handlers::list_documents).post(handlers::upload_document),
        )
        .route(
            "/:business_id/documents/:document_id",
            get(handlers::get_document).delete(handlers::delete_document),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}
