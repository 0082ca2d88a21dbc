//! PDF document attachments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum number of documents attached to a single listing
pub const MAX_DOCUMENTS_PER_LISTING: usize = 10;

/// Maximum size of a single document in bytes (10 MB)
pub const MAX_DOCUMENT_SIZE_BYTES: usize = 10 * 1024 * 1024;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A document with its payload, base64-encoded for JSON transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub business_id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub data_base64: String,
    pub uploaded_at: DateTime<Utc>,
}
