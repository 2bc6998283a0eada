use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::documents::repo::DocumentRecord;
use crate::documents::specs::DocumentType;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignUploadRequest {
    pub document_type: DocumentType,
    pub content_type: String,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub upload_url: String,
    pub s3_key: String,
    pub public_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedDownload {
    pub image_url: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub registration_id: String,
    pub document_type: DocumentType,
    pub s3_key: String,
    pub file_size: i64,
    pub file_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i64>,
    pub uploaded_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_url: Option<String>,
}

impl DocumentView {
    pub fn from_record(record: &DocumentRecord, view_url: Option<String>) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            registration_id: record.registration_id.clone(),
            document_type: record.document_type,
            s3_key: record.s3_key.clone(),
            file_size: record.file_size,
            file_type: record.file_type.clone(),
            width: record.width,
            height: record.height,
            uploaded_at: record.uploaded_at,
            view_url,
        }
    }
}
