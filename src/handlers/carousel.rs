use crate::core::error::AppError;
use crate::core::state::AppState;
use crate::handlers::JsonBody;
use crate::models::api::{Ack, CarouselListResponse, CarouselRequest, CreatedResponse};
use crate::session::extract::AdminUser;
use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;

/// GET /api/carousel/insights
///
/// Cards come back in the nested layout whatever shape they were stored in.
pub async fn list_carousel_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CarouselListResponse>, AppError> {
    let data = state.content.list_carousel().await?;
    Ok(Json(CarouselListResponse { success: true, data }))
}

/// POST /api/carousel/insights (admin)
pub async fn create_carousel_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    JsonBody(body): JsonBody<CarouselRequest>,
) -> Result<Json<CreatedResponse<i64>>, AppError> {
    let id = state.content.create_carousel(&admin.identity, body).await?;
    Ok(Json(CreatedResponse { success: true, id }))
}

/// PUT /api/carousel/insights/{id} (admin)
pub async fn update_carousel_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    JsonBody(body): JsonBody<CarouselRequest>,
) -> Result<Json<CreatedResponse<i64>>, AppError> {
    state.content.update_carousel(&admin.identity, id, body).await?;
    Ok(Json(CreatedResponse { success: true, id }))
}

/// DELETE /api/carousel/insights/{id} (admin)
pub async fn delete_carousel_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Ack>, AppError> {
    state.content.delete_carousel(&admin.identity, id).await?;
    Ok(Json(Ack { success: true }))
}
