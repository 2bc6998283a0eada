pub mod dto;
pub mod export;
pub mod handlers;
pub mod repo;
pub mod validation;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
