//! Simulated payment handlers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use super::ApiJson;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::PaymentService;
use crate::AppState;
use shared::{PaymentReceipt, PaymentRequest};

/// Pay the listing fee for a listing pending payment
///
/// A declined charge is still a 200 response; `status` in the receipt says `failed`.
pub async fn pay_listing_fee(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(business_id): Path<Uuid>,
    body: Option<ApiJson<PaymentRequest>>,
) -> AppResult<Json<PaymentReceipt>> {
    let request = body.map(|ApiJson(b)| b).unwrap_or_default();
    let service = PaymentService::new(state.db.clone(), &state.config, state.payments);
    Ok(Json(service.pay_listing_fee(&user, business_id, request).await?))
}

/// Buy or extend a buyer subscription
pub async fn pay_subscription(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Option<ApiJson<PaymentRequest>>,
) -> AppResult<Json<PaymentReceipt>> {
    let request = body.map(|ApiJson(b)| b).unwrap_or_default();
    let service = PaymentService::new(state.db.clone(), &state.config, state.payments);
    Ok(Json(service.pay_subscription(&user, request).await?))
}
