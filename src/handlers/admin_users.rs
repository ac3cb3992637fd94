use crate::core::error::AppError;
use crate::core::state::AppState;
use crate::handlers::JsonBody;
use crate::models::api::{AdminUserRequest, CreatedResponse, SuccessResponse, UserListResponse};
use crate::session::extract::AdminUser;
use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;

/// GET /api/admin/users
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<UserListResponse>, AppError> {
    let data = state.users.list().await?;
    Ok(Json(UserListResponse { success: true, data }))
}

/// POST /api/admin/users
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    JsonBody(body): JsonBody<AdminUserRequest>,
) -> Result<Json<CreatedResponse<String>>, AppError> {
    let id = state.users.create(&admin, body).await?;
    Ok(Json(CreatedResponse { success: true, id }))
}

/// PUT /api/admin/users/{public_id}
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(public_id): Path<String>,
    JsonBody(body): JsonBody<AdminUserRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.users.update(&admin, &public_id, body).await?;
    Ok(Json(SuccessResponse::ok("User updated successfully")))
}

/// DELETE /api/admin/users/{public_id}
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(public_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.users.delete(&admin, &public_id).await?;
    Ok(Json(SuccessResponse::ok("User deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::create_test_app;
    use crate::models::user::Role;
    use crate::stores::CredentialStore;

    #[tokio::test]
    async fn test_admin_lists_users_without_hashes() {
        let app = create_test_app();
        let admin = app.auth_session("admin@example.com", "pw", Role::Admin).await;

        let Json(list) = list_users_handler(State(app.state.clone()), AdminUser(admin))
            .await
            .unwrap();
        assert_eq!(list.data.len(), 1);

        let json = serde_json::to_value(&list.data[0]).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("id").is_none());
        assert_eq!(json["role"], "admin");
    }

    #[tokio::test]
    async fn test_admin_creates_and_deletes_user() {
        let app = create_test_app();
        let admin = app.auth_session("admin@example.com", "pw", Role::Admin).await;

        let Json(created) = create_user_handler(
            State(app.state.clone()),
            AdminUser(admin.clone()),
            JsonBody(AdminUserRequest {
                name: Some("Bea".to_string()),
                email: Some("bea@example.com".to_string()),
                password: Some("p@ss1234".to_string()),
                role: Some("user".to_string()),
            }),
        )
        .await
        .unwrap();

        let Json(reply) = delete_user_handler(State(app.state.clone()), AdminUser(admin), Path(created.id))
            .await
            .unwrap();
        assert!(reply.success);

        assert_eq!(app.users.list_users().await.unwrap().len(), 1);
    }
}
