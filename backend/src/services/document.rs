//! PDF documents attached to listings

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::listing::{
    can_view_seller_contact, ensure_owner, is_listing_visible, viewer_subscribed,
};
use shared::{
    validate_document_capacity, validate_pdf_upload, Document, DocumentRef, ListingStatus,
    MAX_DOCUMENT_SIZE_BYTES, PDF_CONTENT_TYPE,
};

/// Document service
#[derive(Clone)]
pub struct DocumentService {
    db: PgPool,
}

/// A file received from a multipart upload
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRefRow {
    business_id: Uuid,
    id: Uuid,
    filename: String,
    content_type: String,
    file_size: i64,
    uploaded_at: DateTime<Utc>,
}

impl From<DocumentRefRow> for DocumentRef {
    fn from(row: DocumentRefRow) -> Self {
        DocumentRef {
            id: row.id,
            filename: row.filename,
            content_type: row.content_type,
            file_size: row.file_size,
            uploaded_at: row.uploaded_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: Uuid,
    business_id: Uuid,
    filename: String,
    content_type: String,
    file_size: i64,
    data: Vec<u8>,
    uploaded_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OwnerRow {
    seller_id: Uuid,
    status: String,
}

impl OwnerRow {
    fn status(&self) -> AppResult<ListingStatus> {
        self.status
            .parse::<ListingStatus>()
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}

/// Document metadata for several listings at once, grouped by listing, oldest first
pub async fn document_refs_for(
    db: &PgPool,
    business_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<DocumentRef>>> {
    if business_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, DocumentRefRow>(
        r#"
        SELECT business_id, id, filename, content_type, file_size, uploaded_at
        FROM business_documents
        WHERE business_id = ANY($1)
        ORDER BY uploaded_at, id
        "#,
    )
    .bind(business_ids)
    .fetch_all(db)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<DocumentRef>> = HashMap::new();
    for row in rows {
        grouped.entry(row.business_id).or_default().push(row.into());
    }
    Ok(grouped)
}

/// Map an upload check failure to the right status
fn upload_error(data_len: usize, message: &str) -> AppError {
    if data_len > MAX_DOCUMENT_SIZE_BYTES {
        AppError::PayloadTooLarge(message.to_string())
    } else {
        AppError::validation("file", message)
    }
}

impl DocumentService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Attach a PDF to a listing owned by `user`
    pub async fn upload(
        &self,
        user: &AuthUser,
        business_id: Uuid,
        file: UploadedFile,
    ) -> AppResult<DocumentRef> {
        validate_pdf_upload(&file.filename, file.content_type.as_deref(), &file.data)
            .map_err(|msg| upload_error(file.data.len(), msg))?;

        let mut tx = self.db.begin().await?;

        // Row lock serializes concurrent uploads so the count check holds
        let owner = sqlx::query_as::<_, OwnerRow>(
            "SELECT seller_id, status FROM businesses WHERE id = $1 FOR UPDATE",
        )
        .bind(business_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Business".to_string()))?;

        ensure_owner(user, owner.seller_id)?;
        let status = owner.status()?;
        if !status.is_editable() {
            return Err(AppError::InvalidStateTransition(format!(
                "Documents cannot be added to a {} listing",
                status
            )));
        }

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM business_documents WHERE business_id = $1",
        )
        .bind(business_id)
        .fetch_one(&mut *tx)
        .await?;
        validate_document_capacity(usize::try_from(existing).unwrap_or(usize::MAX))
            .map_err(|msg| AppError::validation("file", msg))?;

        let filename = file.filename.trim().to_string();
        let file_size = file.data.len() as i64;
        let row = sqlx::query_as::<_, DocumentRefRow>(
            r#"
            INSERT INTO business_documents (id, business_id, filename, content_type, file_size, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING business_id, id, filename, content_type, file_size, uploaded_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(business_id)
        .bind(&filename)
        .bind(PDF_CONTENT_TYPE)
        .bind(file_size)
        .bind(&file.data)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            %business_id,
            document_id = %row.id,
            file_size,
            "Document uploaded"
        );

        Ok(row.into())
    }

    /// Metadata of every document on a listing the caller can see
    pub async fn list(
        &self,
        viewer: Option<&AuthUser>,
        business_id: Uuid,
    ) -> AppResult<Vec<DocumentRef>> {
        self.visible_listing(viewer, business_id).await?;
        Ok(document_refs_for(&self.db, &[business_id])
            .await?
            .remove(&business_id)
            .unwrap_or_default())
    }

    /// Document payload; restricted like the seller's contact details
    pub async fn get(
        &self,
        viewer: Option<&AuthUser>,
        business_id: Uuid,
        document_id: Uuid,
    ) -> AppResult<Document> {
        let owner = self.visible_listing(viewer, business_id).await?;

        let Some(viewer) = viewer else {
            return Err(AppError::Unauthorized(
                "Sign in to download documents".to_string(),
            ));
        };
        let subscribed = viewer_subscribed(&self.db, Some(viewer)).await?;
        if !can_view_seller_contact(Some(viewer), owner.seller_id, subscribed) {
            return Err(AppError::InsufficientPermissions);
        }

        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, business_id, filename, content_type, file_size, data, uploaded_at
            FROM business_documents
            WHERE id = $1 AND business_id = $2
            "#,
        )
        .bind(document_id)
        .bind(business_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Document".to_string()))?;

        Ok(Document {
            id: row.id,
            business_id: row.business_id,
            filename: row.filename,
            content_type: row.content_type,
            file_size: row.file_size,
            data_base64: BASE64.encode(&row.data),
            uploaded_at: row.uploaded_at,
        })
    }

    /// Remove a document from a listing owned by `user`
    pub async fn delete(&self, user: &AuthUser, business_id: Uuid, document_id: Uuid) -> AppResult<()> {
        let owner = self.owner_row(business_id).await?;
        ensure_owner(user, owner.seller_id)?;

        let deleted = sqlx::query(
            "DELETE FROM business_documents WHERE id = $1 AND business_id = $2",
        )
        .bind(document_id)
        .bind(business_id)
        .execute(&self.db)
        .await?
        .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound("Document".to_string()));
        }

        tracing::info!(%business_id, %document_id, "Document deleted");
        Ok(())
    }

    async fn owner_row(&self, business_id: Uuid) -> AppResult<OwnerRow> {
        sqlx::query_as::<_, OwnerRow>("SELECT seller_id, status FROM businesses WHERE id = $1")
            .bind(business_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Business".to_string()))
    }

    async fn visible_listing(
        &self,
        viewer: Option<&AuthUser>,
        business_id: Uuid,
    ) -> AppResult<OwnerRow> {
        let owner = self.owner_row(business_id).await?;
        if !is_listing_visible(viewer, owner.seller_id, owner.status()?) {
            return Err(AppError::NotFound("Business".to_string()));
        }
        Ok(owner)
    }
}
