//! HTTP handlers for discount threshold lookups

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::ThresholdService;
use crate::AppState;
use shared::DiscountThreshold;

/// List a fruit type's discount thresholds
pub async fn list_thresholds(
    State(state): State<AppState>,
    Path(fruit_type_id): Path<Uuid>,
) -> AppResult<Json<Vec<DiscountThreshold>>> {
    let service = ThresholdService::new(state.db);
    let thresholds = service.list_thresholds(fruit_type_id).await?;
    Ok(Json(thresholds))
}
