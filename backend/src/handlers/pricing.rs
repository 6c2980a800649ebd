//! HTTP handlers for pricing endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::pricing::{PriceReceptionInput, PricingRecord, PricingService};
use crate::AppState;

/// Price a reception at the active daily price
pub async fn price_reception(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(reception_id): Path<Uuid>,
    input: Option<Json<PriceReceptionInput>>,
) -> AppResult<Json<PricingRecord>> {
    let input = input.map(|Json(input)| input).unwrap_or_default();
    let service = PricingService::new(state.db);
    let record = service
        .price_reception(reception_id, input, current_user.0.user_id, Utc::now())
        .await?;
    Ok(Json(record))
}

/// Get the stored pricing of a reception
pub async fn get_pricing(
    State(state): State<AppState>,
    Path(reception_id): Path<Uuid>,
) -> AppResult<Json<PricingRecord>> {
    let service = PricingService::new(state.db);
    let record = service.get_pricing(reception_id).await?;
    Ok(Json(record))
}
