//! Authentication and email verification handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::ApiJson;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthResponse, LoginInput, RegisterInput};
use crate::services::verification::{CodeIssued, VerificationResult};
use crate::services::{AuthService, VerificationService};
use crate::AppState;
use shared::User;

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub code: String,
}

/// Register endpoint handler
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterInput>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let response = auth_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginInput>,
) -> AppResult<Json<AuthResponse>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    Ok(Json(auth_service.login(body).await?))
}

/// Current account
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<User>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    Ok(Json(auth_service.me(user.user_id).await?))
}

/// Confirm the emailed code
pub async fn verify_email(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(body): ApiJson<VerifyEmailRequest>,
) -> AppResult<Json<VerificationResult>> {
    let service = VerificationService::new(state.db.clone(), &state.config);
    Ok(Json(service.verify(user.user_id, &body.code).await?))
}

/// Issue a new verification code
pub async fn resend_verification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<(StatusCode, Json<CodeIssued>)> {
    let service = VerificationService::new(state.db.clone(), &state.config);
    let issued = service.resend(user.user_id).await?;
    Ok((StatusCode::ACCEPTED, Json(issued)))
}
