use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;

use crate::{
    db::Value,
    error::ApiError,
    models::shipping::{CreatedWindow, ShippingWindow, ShippingWindowRequest, ShippingWindowSummary},
    services::shipping::ShippingService,
    AppState,
};

/// GET /shipping
pub async fn list_windows(
    State(state): State<AppState>,
) -> Result<Json<Vec<ShippingWindowSummary>>, ApiError> {
    ShippingService::list(state.store.as_ref(), state.config.page_size)
        .await
        .map(Json)
}

/// GET /shipping/current-notifications: windows active at the server clock
pub async fn current_notifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<ShippingWindow>>, ApiError> {
    ShippingService::current(state.store.as_ref(), Utc::now())
        .await
        .map(Json)
}

/// POST /shipping
pub async fn create_window(
    State(state): State<AppState>,
    body: Result<Json<ShippingWindowRequest>, JsonRejection>,
) -> Result<Json<CreatedWindow>, ApiError> {
    let Json(body) = body?;
    ShippingService::create(state.store.as_ref(), &body)
        .await
        .map(|id| Json(CreatedWindow { shipping_document: id }))
}

/// PATCH /shipping/{shipping_date_id}/edit
pub async fn update_window(
    State(state): State<AppState>,
    Path(shipping_date_id): Path<String>,
    body: Result<Json<ShippingWindowRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body?;
    ShippingService::update(state.store.as_ref(), &shipping_date_id, &body)
        .await
        .map(Json)
}

/// DELETE /shipping/{shipping_date_id}
pub async fn delete_window(
    State(state): State<AppState>,
    Path(shipping_date_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    ShippingService::delete(state.store.as_ref(), &shipping_date_id)
        .await
        .map(Json)
}
