//! Listing document HTTP handlers

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{CurrentUser, MaybeUser};
use crate::services::document::UploadedFile;
use crate::services::DocumentService;
use crate::AppState;
use shared::{Document, DocumentRef};

/// Multipart field carrying the PDF
const FILE_FIELD: &str = "file";

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File exceeds the 10MB limit".to_string())
    } else {
        AppError::validation(FILE_FIELD, err.body_text())
    }
}

/// Upload a PDF (`multipart/form-data`, field `file`)
pub async fn upload_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(business_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DocumentRef>)> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some(UploadedFile {
            filename,
            content_type,
            data: data.to_vec(),
        });
        break;
    }

    let file = upload
        .ok_or_else(|| AppError::validation(FILE_FIELD, "A PDF file is required"))?;

    let service = DocumentService::new(state.db.clone());
    let document = service.upload(&user, business_id, file).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list_documents(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path(business_id): Path<Uuid>,
) -> AppResult<Json<Vec<DocumentRef>>> {
    let service = DocumentService::new(state.db.clone());
    Ok(Json(service.list(viewer.as_ref(), business_id).await?))
}

/// Download a document as base64 JSON
pub async fn get_document(
    State(state): State<AppState>,
    MaybeUser(viewer): MaybeUser,
    Path((business_id, document_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Document>> {
    let service = DocumentService::new(state.db.clone());
    Ok(Json(
        service.get(viewer.as_ref(), business_id, document_id).await?,
    ))
}

pub async fn delete_document(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((business_id, document_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let service = DocumentService::new(state.db.clone());
    service.delete(&user, business_id, document_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
