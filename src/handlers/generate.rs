use crate::core::error::AppError;
use crate::core::state::AppState;
use crate::handlers::JsonBody;
use crate::models::api::{GenerateRequest, GenerateResponse};
use crate::services::non_blank;
use crate::session::extract::CurrentUser;
use axum::{extract::State, response::Json};
use std::sync::Arc;
use tracing::debug;

/// Forward a prompt to the text generation backend
///
/// POST /api/generate
pub async fn generate_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(auth): CurrentUser,
    JsonBody(body): JsonBody<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let prompt = non_blank(body.prompt)
        .ok_or_else(|| AppError::Validation("Prompt is required".to_string()))?;

    let generator = state.generator.as_ref().ok_or(AppError::GeneratorUnavailable)?;

    debug!(user_id = auth.identity.user_id, prompt_len = prompt.len(), "Generating text");
    let response = generator.generate(&prompt).await.map_err(AppError::Upstream)?;

    Ok(Json(GenerateResponse {
        success: true,
        response,
    }))
}
