use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::auth::dto::PublicUser;
use crate::auth::repo::{self, UserUpdate};
use crate::auth::services::AuthUser;
use crate::error::{ApiError, Envelope};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(fetch).put(update))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
}

async fn fetch(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user = repo::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or(ApiError::NotFound("User not found".into()))?;
    Ok(Envelope::data("Profile fetched", PublicUser::from(&user)))
}

async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(name) = &request.full_name {
        if name.trim().is_empty() || name.len() > 100 {
            return Err(ApiError::Validation(vec!["Invalid fullName".into()]));
        }
    }
    if let Some(phone) = &request.phone_number {
        if !crate::auth::services::is_valid_phone(phone) {
            return Err(ApiError::Validation(vec!["Invalid phoneNumber".into()]));
        }
    }
    if request.full_name.is_none() && request.phone_number.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".into()));
    }

    let update = UserUpdate {
        full_name: request.full_name,
        phone_number: request.phone_number,
        ..UserUpdate::default()
    };
    let user = repo::update(&state.db, auth.user_id, update).await?;
    info!(user_id = %auth.user_id, "profile updated");
    Ok(Envelope::data("Profile updated", PublicUser::from(&user)))
}
