//! HTTP handlers for batch endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::CurrentUser,
    services::batch::{BatchService, CompleteBatchInput, CreateBatchInput},
    AppState,
};

fn service(state: &AppState) -> BatchService {
    BatchService::new(state.db.clone(), state.config.engine.completion_policy())
}

/// Form a batch from receptions
pub async fn create_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<impl IntoResponse> {
    let batch = service(&state)
        .create_batch(input, current_user.0.user_id, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// Complete a batch and distribute its output weight
pub async fn complete_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<CompleteBatchInput>,
) -> AppResult<impl IntoResponse> {
    let batch = service(&state)
        .complete_batch(batch_id, input, current_user.0.user_id, Utc::now())
        .await?;
    Ok(Json(batch))
}

/// Get a batch with its members
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let batch = service(&state).get_batch(batch_id).await?;
    Ok(Json(batch))
}
