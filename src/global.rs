use axum::{extract::State, response::IntoResponse, routing::get, Router};

use crate::auth::services::AuthUser;
use crate::db::{get_json, s, DbError};
use crate::error::{ApiError, Envelope};
use crate::state::AppState;

/// Singleton item id for the shared exam metadata (levels, fees, dates).
pub const GLOBAL_DATA_ID: &str = "GLOBAL_JLPT_DATA";

pub fn router() -> Router<AppState> {
    Router::new().route("/getData", get(fetch))
}

async fn fetch(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .db
        .client
        .get_item()
        .table_name(&state.db.tables.global)
        .key("id", s(GLOBAL_DATA_ID))
        .send()
        .await
        .map_err(|e| {
            ApiError::from(DbError::Other(anyhow::Error::new(e.into_service_error())))
        })?;
    let item = result
        .item
        .ok_or(ApiError::NotFound("Global data not found".into()))?;
    let payload = get_json(&item, "payload").map_err(ApiError::from)?;
    Ok(Envelope::data("Global data", payload))
}
