use std::collections::BTreeMap;

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::auth::services::AdminUser;
use crate::db::{n, now_ts, s, DbError};
use crate::error::{ApiError, Envelope};
use crate::forms::repo as forms_repo;
use crate::global::GLOBAL_DATA_ID;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/global-data", post(upsert_global_data))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Dashboard {
    total_registrations: usize,
    registrations_by_level: BTreeMap<String, usize>,
}

async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let records = forms_repo::scan(&state.db, None, None).await?;
    let mut by_level: BTreeMap<String, usize> = BTreeMap::new();
    for record in &records {
        let level = match record.fields.get("testLevel") {
            Some(serde_json::Value::String(v)) if !v.is_empty() => v.clone(),
            Some(serde_json::Value::Number(v)) => v.to_string(),
            _ => "unknown".to_string(),
        };
        *by_level.entry(level).or_default() += 1;
    }
    Ok(Envelope::data(
        "Dashboard",
        Dashboard {
            total_registrations: records.len(),
            registrations_by_level: by_level,
        },
    ))
}

async fn upsert_global_data(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    if !body.is_object() {
        return Err(ApiError::BadRequest("Body must be a JSON object".into()));
    }
    let payload = serde_json::to_string(&body)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("global data not serializable: {e}")))?;
    state
        .db
        .client
        .put_item()
        .table_name(&state.db.tables.global)
        .item("id", s(GLOBAL_DATA_ID))
        .item("payload", s(payload))
        .item("updatedAt", n(now_ts()))
        .send()
        .await
        .map_err(|e| {
            ApiError::from(DbError::Other(anyhow::Error::new(e.into_service_error())))
        })?;
    info!("global data updated");
    Ok(Envelope::message("Global data saved"))
}
