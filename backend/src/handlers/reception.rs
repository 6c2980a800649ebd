//! HTTP handlers for reception lookups

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::ReceptionService;
use crate::AppState;
use shared::Reception;

/// Get a reception with its final and cumulative output weights
pub async fn get_reception(
    State(state): State<AppState>,
    Path(reception_id): Path<Uuid>,
) -> AppResult<Json<Reception>> {
    let service = ReceptionService::new(state.db);
    let reception = service.get_reception(reception_id).await?;
    Ok(Json(reception))
}
