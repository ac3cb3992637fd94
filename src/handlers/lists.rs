use crate::core::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::path::Path;
use std::sync::Arc;
use tracing::error;

/// Non-empty lines of a list file
pub fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

async fn serve_list(dir: &Path, file: &str, label: &str) -> Response {
    let path = dir.join(file);

    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Json(parse_lines(&content)).into_response(),
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read list file");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error reading {} file", label),
            )
                .into_response()
        }
    }
}

/// GET /teams
pub async fn teams_handler(State(state): State<Arc<AppState>>) -> Response {
    serve_list(&state.config.server.data_dir, "teams.txt", "teams").await
}

/// GET /leagues
pub async fn leagues_handler(State(state): State<Arc<AppState>>) -> Response {
    serve_list(&state.config.server.data_dir, "leagues.txt", "leagues").await
}
