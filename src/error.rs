use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::db::DbError;

/// Error taxonomy shared by every handler. Converting into a response
/// produces the same `{success, message, errors?}` body everywhere.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<String>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{error}")]
    Upload { code: &'static str, error: String },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::Upload { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(errors) => json!({
                "success": false,
                "message": "Validation failed",
                "errors": errors,
            }),
            ApiError::Upload { code, error } => json!({
                "success": false,
                "error": error,
                "code": code,
            }),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                // Raw cause goes to the client only outside production.
                let detail = std::env::var("APP_ENV")
                    .map(|v| v == "development")
                    .unwrap_or(false)
                    .then(|| e.to_string());
                json!({
                    "success": false,
                    "message": "Internal server error",
                    "error": detail,
                })
            }
            other => json!({
                "success": false,
                "message": other.to_string(),
            }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict => {
                ApiError::Conflict("Record was modified concurrently".to_string())
            }
            DbError::NotFound(entity) => ApiError::NotFound(format!("{entity} not found")),
            DbError::Malformed(msg) => ApiError::Internal(anyhow::anyhow!("malformed item: {msg}")),
            DbError::Other(e) => ApiError::Internal(e),
        }
    }
}

/// Success envelope: `{success: true, message?, data?}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        })
    }
}

impl Envelope<()> {
    pub fn message(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message.into()),
            data: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_skips_empty_fields() {
        let json = serde_json::to_string(&Envelope::message("done").0).unwrap();
        assert_eq!(json, r#"{"success":true,"message":"done"}"#);
    }

    #[test]
    fn conflict_maps_from_db_error() {
        let err = ApiError::from(DbError::Conflict);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn not_found_carries_entity_name() {
        let err = ApiError::from(DbError::NotFound("Form"));
        assert_eq!(err.to_string(), "Form not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
