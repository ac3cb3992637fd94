pub mod accounts;
pub mod admin_users;
pub mod carousel;
pub mod competitions;
pub mod fallback;
pub mod generate;
pub mod health;
pub mod lists;

use crate::core::error::AppError;
use axum::extract::{rejection::JsonRejection, FromRequest, Json, Request};

/// JSON request body whose rejections are reported as validation errors in
/// the usual `{success, message}` shape
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}
