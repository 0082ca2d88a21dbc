//! Business listing HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use super::{ApiJson, ApiQuery};
use crate::error::AppResult;
use crate::middleware::{AuthUser, CurrentUser, MaybeUser};
use crate::services::{ListingService, VerificationService};
use crate::AppState;
use shared::{
    CreateListingInput, ListingCard, ListingDetail, ListingFilter, PaginatedResponse,
    SubmissionResult, UpdateListingInput,
};

/// Public catalog with filters, sorting and pagination
pub async fn list_businesses(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<ListingFilter>,
) -> AppResult<Json<PaginatedResponse<ListingCard>>> {
    let service = ListingService::new(state.db.clone());
    Ok(Json(service.search(&filter).await?))
}

/// Listing detail; seller contact is included only for entitled viewers
pub async fn get_business(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(business_id): Path<Uuid>,
) -> AppResult<Json<ListingDetail>> {
    let service = ListingService::new(state.db.clone());
    Ok(Json(service.view(business_id, viewer.as_ref()).await?))
}

/// Listings owned by the current seller, any status
pub async fn my_businesses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<ListingDetail>>> {
    let service = ListingService::new(state.db.clone());
    Ok(Json(service.list_mine(&user).await?))
}

/// Create a draft, or submit it straight away when `publish` is set
pub async fn create_business(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<CreateListingInput>,
) -> AppResult<(StatusCode, Json<ListingDetail>)> {
    let service = ListingService::new(state.db.clone());
    let (detail, submission) = service.create(&user, input).await?;

    if let Some(submission) = &submission {
        issue_code_if_required(&state, &user, submission).await?;
    }

    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_business(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(business_id): Path<Uuid>,
    ApiJson(input): ApiJson<UpdateListingInput>,
) -> AppResult<Json<ListingDetail>> {
    let service = ListingService::new(state.db.clone());
    Ok(Json(service.update(&user, business_id, input).await?))
}

pub async fn delete_business(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(business_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = ListingService::new(state.db.clone());
    service.delete(&user, business_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit a draft for publication
pub async fn submit_business(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(business_id): Path<Uuid>,
) -> AppResult<Json<SubmissionResult>> {
    let service = ListingService::new(state.db.clone());
    let submission = service.submit(&user, business_id).await?;
    issue_code_if_required(&state, &user, &submission).await?;
    Ok(Json(submission))
}

async fn issue_code_if_required(
    state: &AppState,
    user: &AuthUser,
    submission: &SubmissionResult,
) -> AppResult<()> {
    if submission.verification_required {
        VerificationService::new(state.db.clone(), &state.config)
            .issue_code(user.user_id)
            .await?;
    }
    Ok(())
}
