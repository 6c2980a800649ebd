//! HTTP handlers for quality evaluation and weight discount endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::quality::{
    DiscountRecord, OverrideDiscountInput, QualityService, RecordEvaluationInput,
};
use crate::AppState;
use shared::QualityEvaluation;

fn service(state: &AppState) -> QualityService {
    QualityService::new(state.db.clone(), state.config.engine.consistency_epsilon())
}

/// Record or replace the quality measurements of a reception
pub async fn record_evaluation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(reception_id): Path<Uuid>,
    Json(input): Json<RecordEvaluationInput>,
) -> AppResult<Json<QualityEvaluation>> {
    let evaluation = service(&state)
        .record_evaluation(reception_id, input, current_user.0.user_id, Utc::now())
        .await?;
    Ok(Json(evaluation))
}

/// Calculate the weight discount of a reception
pub async fn calculate_discount(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(reception_id): Path<Uuid>,
) -> AppResult<Json<DiscountRecord>> {
    let record = service(&state)
        .calculate_discount(reception_id, current_user.0.user_id, Utc::now())
        .await?;
    Ok(Json(record))
}

/// Replace the computed discount with manually supplied figures
pub async fn override_discount(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(reception_id): Path<Uuid>,
    Json(input): Json<OverrideDiscountInput>,
) -> AppResult<Json<DiscountRecord>> {
    let record = service(&state)
        .apply_override(reception_id, input, current_user.0.user_id, Utc::now())
        .await?;
    Ok(Json(record))
}

/// Get the stored weight discount of a reception
pub async fn get_discount(
    State(state): State<AppState>,
    Path(reception_id): Path<Uuid>,
) -> AppResult<Json<DiscountRecord>> {
    let record = service(&state).get_discount(reception_id).await?;
    Ok(Json(record))
}
