use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, Envelope};
use crate::forms::dto::{ExportQuery, SavedForm, SubmitFormRequest, SubmittedForm};
use crate::forms::validation::{validate_save, validate_submission};
use crate::forms::{export, repo};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(submit))
        .route("/save", post(save))
        .route("/form/:id", get(fetch))
        .route("/export", get(export_csv))
}

async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitFormRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = validate_submission(&request);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    let fields = serde_json::to_value(&request)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("form not serializable: {e}")))?;
    let record = repo::put_new(&state.db, fields).await?;
    info!(submission_id = %record.id, "form submitted");
    Ok((
        StatusCode::CREATED,
        Envelope::data(
            "Form submitted successfully",
            SubmittedForm {
                submission_id: record.id,
            },
        ),
    ))
}

/// Envelope keys the save protocol owns; client copies are discarded on merge
/// so a stale draft can never rewind timestamps or versions.
const RESERVED_KEYS: [&str; 4] = ["id", "version", "createdAt", "updatedAt"];

async fn save(
    State(state): State<AppState>,
    Json(mut body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let errors = validate_save(&body);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let id = match body.get("id").and_then(|v| v.as_str()) {
        Some(raw) => Some(
            raw.parse::<Uuid>()
                .map_err(|_| ApiError::BadRequest("Invalid form id".into()))?,
        ),
        None => None,
    };

    if let Some(obj) = body.as_object_mut() {
        for key in RESERVED_KEYS {
            obj.remove(key);
        }
    }

    match id {
        None => {
            let record = repo::put_new(&state.db, body).await?;
            info!(form_id = %record.id, "draft created");
            Ok((
                StatusCode::CREATED,
                Envelope::data(
                    "Form saved",
                    SavedForm {
                        id: record.id,
                        version: record.version,
                    },
                ),
            ))
        }
        Some(id) => {
            let mut record = repo::get(&state.db, id, true)
                .await?
                .ok_or(ApiError::NotFound("Form not found".into()))?;
            if let (Some(target), Some(incoming)) =
                (record.fields.as_object_mut(), body.as_object())
            {
                for (key, value) in incoming {
                    target.insert(key.clone(), value.clone());
                }
            }
            record.version += 1;
            record.updated_at = crate::db::now_ts();
            repo::put_update(&state.db, &record).await?;
            info!(form_id = %record.id, version = record.version, "draft updated");
            Ok((
                StatusCode::OK,
                Envelope::data(
                    "Form saved",
                    SavedForm {
                        id: record.id,
                        version: record.version,
                    },
                ),
            ))
        }
    }
}

async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = repo::get(&state.db, id, false)
        .await?
        .ok_or(ApiError::NotFound("Form not found".into()))?;
    Ok(Envelope::data("Form fetched", record.to_json()))
}

async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = repo::scan(
        &state.db,
        query.test_level.as_deref(),
        query.country.as_deref(),
    )
    .await?;
    info!(rows = records.len(), "exporting registrations");
    let csv = export::render_csv(records).map_err(ApiError::Internal)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"registrations.csv\"",
            ),
        ],
        csv,
    ))
}
