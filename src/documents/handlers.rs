use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::db::now_ts;
use crate::documents::dto::{
    DocumentView, PresignUploadRequest, PresignedDownload, PresignedUpload,
};
use crate::documents::repo::{self, DocumentRecord};
use crate::documents::specs::{extension_for, spec_for, validate_file, validate_mime, DocumentType};
use crate::error::{ApiError, Envelope};
use crate::state::AppState;

const PRESIGN_PUT_SECS: u64 = 60;
const PRESIGN_GET_SECS: u64 = 600;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .route("/upload/url", post(presign_upload))
        .route("/download/*s3_key", get(presign_download))
        .route("/documents/:registration_id", get(list))
        .route("/document/:id", delete(remove))
}

struct UploadFields {
    document_type: Option<DocumentType>,
    registration_id: Option<String>,
    user_id: Option<Uuid>,
    file: Option<(Bytes, String)>,
}

async fn collect_fields(mut multipart: Multipart) -> Result<UploadFields, ApiError> {
    let mut fields = UploadFields {
        document_type: None,
        registration_id: None,
        user_id: None,
        file: None,
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "documentType" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                fields.document_type = Some(
                    serde_json::from_value(serde_json::Value::String(raw.clone())).map_err(
                        |_| ApiError::BadRequest(format!("Unknown document type: {raw}")),
                    )?,
                );
            }
            "registrationId" => {
                fields.registration_id = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.to_string()))?,
                );
            }
            "userId" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                fields.user_id = Some(
                    raw.parse::<Uuid>()
                        .map_err(|_| ApiError::BadRequest("Invalid userId".into()))?,
                );
            }
            "file" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
                fields.file = Some((bytes, content_type));
            }
            _ => {}
        }
    }
    Ok(fields)
}

async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let fields = collect_fields(multipart).await?;
    let doc_type = fields
        .document_type
        .ok_or(ApiError::BadRequest("documentType is required".into()))?;
    let registration_id = fields
        .registration_id
        .ok_or(ApiError::BadRequest("registrationId is required".into()))?;
    let user_id = fields
        .user_id
        .ok_or(ApiError::BadRequest("userId is required".into()))?;
    let (bytes, content_type) = fields.file.ok_or(ApiError::Upload {
        code: "NO_FILE",
        error: "No file was uploaded".into(),
    })?;

    validate_file(doc_type, &content_type, &bytes)?;
    let (width, height) = match spec_for(doc_type).dimensions {
        Some(_) => {
            let size = imagesize::blob_size(&bytes).map_err(|_| ApiError::Upload {
                code: "DIMENSION_READ_ERROR",
                error: "Could not read image dimensions".into(),
            })?;
            (Some(size.width as i64), Some(size.height as i64))
        }
        None => (None, None),
    };

    let id = Uuid::new_v4();
    let s3_key = format!(
        "documents/{user_id}/{}/{id}.{}",
        doc_type.as_str(),
        extension_for(&content_type)
    );
    state
        .storage
        .put_object(&s3_key, bytes.clone(), &content_type)
        .await
        .map_err(ApiError::Internal)?;

    let record = DocumentRecord {
        id,
        user_id,
        registration_id,
        document_type: doc_type,
        s3_key: s3_key.clone(),
        file_size: bytes.len() as i64,
        file_type: content_type,
        width,
        height,
        uploaded_at: now_ts(),
    };
    repo::create(&state.db, &record).await?;

    let view_url = state
        .storage
        .presign_get(&s3_key, PRESIGN_GET_SECS)
        .await
        .map_err(ApiError::Internal)?;
    info!(document_id = %id, document_type = doc_type.as_str(), "document uploaded");
    Ok((
        StatusCode::CREATED,
        Envelope::data(
            "Document uploaded",
            DocumentView::from_record(&record, Some(view_url)),
        ),
    ))
}

async fn presign_upload(
    State(state): State<AppState>,
    Json(request): Json<PresignUploadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_mime(request.document_type, &request.content_type)?;
    let s3_key = format!(
        "documents/{}/{}/{}.{}",
        request.user_id,
        request.document_type.as_str(),
        Uuid::new_v4(),
        extension_for(&request.content_type)
    );
    let upload_url = state
        .storage
        .presign_put(&s3_key, &request.content_type, PRESIGN_PUT_SECS)
        .await
        .map_err(ApiError::Internal)?;
    let public_url = format!(
        "https://{}.s3.{}.amazonaws.com/{}",
        state.config.aws.s3_bucket, state.config.aws.region, s3_key
    );
    Ok(Envelope::data(
        "Upload URL created",
        PresignedUpload {
            upload_url,
            s3_key,
            public_url,
        },
    ))
}

async fn presign_download(
    State(state): State<AppState>,
    Path(s3_key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let image_url = state
        .storage
        .presign_get(&s3_key, PRESIGN_GET_SECS)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Envelope::data(
        "Download URL created",
        PresignedDownload {
            image_url,
            expires_at: now_ts() + PRESIGN_GET_SECS as i64,
        },
    ))
}

async fn list(
    State(state): State<AppState>,
    Path(registration_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let records = repo::list_by_registration(&state.db, &registration_id).await?;
    let views: Vec<DocumentView> = records
        .iter()
        .map(|r| DocumentView::from_record(r, None))
        .collect();
    Ok(Envelope::data("Documents fetched", views))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Document not found".into()))?;
    repo::delete(&state.db, id).await?;
    state
        .storage
        .delete_object(&record.s3_key)
        .await
        .map_err(ApiError::Internal)?;
    info!(document_id = %id, "document deleted");
    Ok(Envelope::message("Document deleted"))
}
