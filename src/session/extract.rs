use crate::core::error::AppError;
use crate::core::state::AppState;
use crate::security::gate::AuthSession;
use anyhow::anyhow;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;
use tower_sessions::Session;

/// A logged-in caller
///
/// Runs the gate while extracting, so a handler that lists this before its
/// path or body extractors answers 401 before looking at either.
pub struct CurrentUser(pub AuthSession);

/// A logged-in admin, re-checked against the stored role
pub struct AdminUser(pub AuthSession);

async fn session_of(parts: &mut Parts, state: &Arc<AppState>) -> Result<Session, AppError> {
    Session::from_request_parts(parts, state)
        .await
        .map_err(|(_, message)| AppError::Internal(anyhow!(message)))
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = session_of(parts, state).await?;
        Ok(CurrentUser(state.gate.require_authenticated(&session).await?))
    }
}

impl FromRequestParts<Arc<AppState>> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let session = session_of(parts, state).await?;
        Ok(AdminUser(state.gate.require_admin(&session).await?))
    }
}
