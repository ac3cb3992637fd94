use crate::core::error::AppError;
use crate::core::state::AppState;
use crate::handlers::JsonBody;
use crate::models::api::{Ack, CompetitionListResponse, CompetitionRequest, CreatedResponse};
use crate::session::extract::AdminUser;
use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;

/// GET /api/competitions
pub async fn list_competitions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CompetitionListResponse>, AppError> {
    let data = state.content.list_competitions().await?;
    Ok(Json(CompetitionListResponse { success: true, data }))
}

/// POST /api/competitions (admin)
pub async fn create_competition_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    JsonBody(body): JsonBody<CompetitionRequest>,
) -> Result<Json<CreatedResponse<i64>>, AppError> {
    let id = state
        .content
        .create_competition(&admin.identity, body.name, body.icon)
        .await?;

    Ok(Json(CreatedResponse { success: true, id }))
}

/// DELETE /api/competitions/{id} (admin)
pub async fn delete_competition_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
) -> Result<Json<Ack>, AppError> {
    state.content.delete_competition(&admin.identity, id).await?;
    Ok(Json(Ack { success: true }))
}
