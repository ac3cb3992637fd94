use crate::core::error::AppError;
use crate::core::state::AppState;
use crate::handlers::JsonBody;
use crate::models::api::{
    AccountResponse, Ack, ChangePasswordRequest, DeleteAccountRequest, LoginRequest,
    LoginResponse, ProfileRequest, ProfileResponse, SessionStatus, SignupRequest,
    SuccessResponse,
};
use crate::session::extract::CurrentUser;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tower_sessions::Session;

/// POST /api/signup
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(body): JsonBody<SignupRequest>,
) -> Result<Response, AppError> {
    state
        .accounts
        .signup(body.name, body.email, body.password)
        .await?;

    Ok((
        StatusCode::OK,
        Json(SuccessResponse::ok("User registered successfully")),
    )
        .into_response())
}

/// POST /api/login
///
/// Replaces any session the browser already carried. The session layer
/// sets the cookie.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let identity = state
        .accounts
        .login(&session, body.email, body.password)
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        role: identity.role,
    }))
}

/// GET /api/session
pub async fn session_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<SessionStatus>, AppError> {
    Ok(Json(state.accounts.session_status(&session).await?))
}

/// POST /api/logout
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Ack>, AppError> {
    state.accounts.logout(&session).await?;
    Ok(Json(Ack { success: true }))
}

/// POST /api/change-password
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(auth): CurrentUser,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .accounts
        .change_password(&auth, body.old_password, body.new_password, body.confirm_password)
        .await?;

    Ok(Json(SuccessResponse::ok("Password changed successfully")))
}

/// DELETE /api/delete-account
pub async fn delete_account_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(auth): CurrentUser,
    JsonBody(body): JsonBody<DeleteAccountRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.accounts.delete_account(&auth, body.password).await?;
    Ok(Json(SuccessResponse::ok("Account deleted successfully")))
}

/// GET /api/account
pub async fn get_account_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(auth): CurrentUser,
) -> Result<Json<AccountResponse>, AppError> {
    let user = state.accounts.get_account(&auth).await?;
    Ok(Json(AccountResponse {
        success: true,
        user,
    }))
}

/// PUT /api/account
pub async fn update_account_handler(
    State(state): State<Arc<AppState>>,
    CurrentUser(auth): CurrentUser,
    JsonBody(body): JsonBody<ProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = state
        .accounts
        .update_profile(&auth, body.name, body.email)
        .await?;

    Ok(Json(ProfileResponse {
        success: true,
        message: "Profile updated successfully".to_string(),
        user,
    }))
}
