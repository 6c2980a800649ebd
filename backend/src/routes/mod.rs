//! Route definitions for the Commodity Reception Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - discount threshold lookups
        .nest("/fruit-types", fruit_type_routes(state.clone()))
        // Protected routes - evaluation, discount and pricing per reception
        .nest("/receptions", reception_routes(state.clone()))
        // Protected routes - batch processing
        .nest("/batches", batch_routes(state))
}

/// Fruit type routes (protected)
fn fruit_type_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:fruit_type_id/thresholds", get(handlers::list_thresholds))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Reception routes (protected)
fn reception_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:reception_id", get(handlers::get_reception))
        .route("/:reception_id/evaluation", put(handlers::record_evaluation))
        .route(
            "/:reception_id/discount",
            post(handlers::calculate_discount).get(handlers::get_discount),
        )
        .route(
            "/:reception_id/discount/override",
            post(handlers::override_discount),
        )
        .route(
            "/:reception_id/pricing",
            post(handlers::price_reception).get(handlers::get_pricing),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Batch routes (protected)
fn batch_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_batch))
        .route("/:batch_id", get(handlers::get_batch))
        .route("/:batch_id/complete", post(handlers::complete_batch))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
