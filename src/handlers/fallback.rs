use crate::core::error::AppError;
use axum::{http::Uri, response::{IntoResponse, Response}};
use tracing::debug;

/// Unmatched `/api/*` paths answer in JSON instead of falling through to
/// the static site
pub async fn api_fallback_handler(uri: Uri) -> Response {
    debug!(path = %uri.path(), "No API route matched");
    AppError::NotFound("Endpoint").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_api_fallback_is_json_404() {
        let response = api_fallback_handler(Uri::from_static("/api/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Endpoint not found");
    }
}
