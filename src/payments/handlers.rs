use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use tracing::{info, warn};

use crate::error::{ApiError, Envelope};
use crate::payments::dto::{CreateOrderRequest, PaymentDetailsRequest};
use crate::payments::gateway::verify_signature;
use crate::payments::repo;
use crate::state::AppState;

/// Receipt tag sent with every order, matching what the checkout page
/// reconciles against.
const RECEIPT_TAG: &str = "order_rcptid_11";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/details", post(details))
}

async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.amount <= 0 {
        return Err(ApiError::BadRequest("Amount must be positive".into()));
    }
    let order = state
        .gateway
        .create_order(request.amount, "INR", RECEIPT_TAG)
        .await
        .map_err(ApiError::Internal)?;
    info!(amount = request.amount, "gateway order created");
    Ok(Envelope::data("Order created", order))
}

async fn details(
    State(state): State<AppState>,
    Json(request): Json<PaymentDetailsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let valid = verify_signature(
        &state.config.gateway.key_secret,
        &request.order_id,
        &request.payment_id,
        &request.signature,
    );
    if !valid {
        warn!(order_id = %request.order_id, "payment signature mismatch");
        return Err(ApiError::BadRequest("Invalid signature".into()));
    }
    let payment = state
        .gateway
        .fetch_payment(&request.payment_id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Envelope::data("Payment verified", payment))
}

/// Versioned payment-record save mounted under the registration routes.
pub async fn save_payment(
    State(state): State<AppState>,
    Json(mut body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, ApiError> {
    let pid = body
        .get("pid")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or(ApiError::BadRequest("pid is required".into()))?;

    if let Some(obj) = body.as_object_mut() {
        for key in ["pid", "version", "createdAt", "updatedAt"] {
            obj.remove(key);
        }
    }

    match repo::get(&state.db, &pid, true).await? {
        None => {
            let record = repo::put_new(&state.db, pid, body).await?;
            info!(pid = %record.pid, "payment recorded");
            Ok((
                StatusCode::CREATED,
                Envelope::data("Payment saved", record.to_json()),
            ))
        }
        Some(mut record) => {
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
            info!(pid = %record.pid, version = record.version, "payment updated");
            Ok((
                StatusCode::OK,
                Envelope::data("Payment saved", record.to_json()),
            ))
        }
    }
}
