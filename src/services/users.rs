use crate::core::error::{AppError, StoreError};
use crate::models::api::AdminUserRequest;
use crate::models::user::{AccountView, Identity, NewUser, Role, User};
use crate::security::gate::AuthSession;
use crate::security::password;
use crate::services::{non_blank, trimmed};
use crate::session::store::SessionRegistry;
use crate::session::IDENTITY_KEY;
use crate::stores::{CredentialStore, ProfileUpdate};
use std::sync::Arc;
use tracing::info;

/// Admin-side user management
///
/// Callers have already passed the admin gate. Editing or deleting someone
/// ends all of their sessions, so a changed role takes effect on their next
/// request.
#[derive(Clone)]
pub struct UserAdminService {
    users: Arc<dyn CredentialStore>,
    sessions: SessionRegistry,
}

fn parse_role(role: Option<String>) -> Result<Option<Role>, AppError> {
    match trimmed(role) {
        Some(role) => role
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation("Role must be 'user' or 'admin'".to_string())),
        None => Ok(None),
    }
}

impl UserAdminService {
    pub fn new(users: Arc<dyn CredentialStore>, sessions: SessionRegistry) -> Self {
        Self { users, sessions }
    }

    pub async fn list(&self) -> Result<Vec<AccountView>, AppError> {
        let users = self.users.list_users().await?;
        Ok(users.iter().map(AccountView::from).collect())
    }

    /// Create an account with a chosen role; returns its public id
    pub async fn create(&self, admin: &AuthSession, request: AdminUserRequest) -> Result<String, AppError> {
        let (name, email, password) = match (
            trimmed(request.name),
            trimmed(request.email),
            non_blank(request.password),
        ) {
            (Some(n), Some(e), Some(p)) => (n, e, p),
            _ => return Err(AppError::missing_fields()),
        };
        let role = parse_role(request.role)?.unwrap_or_default();

        let password_hash = password::hash_blocking(password).await?;
        let new_user = NewUser::new(name, email, password_hash, role);
        let public_id = new_user.public_id.clone();

        match self.users.insert_user(new_user).await {
            Ok(id) => {
                info!(user_id = id, role = %role, admin_id = admin.identity.user_id, "User created by admin");
                Ok(public_id)
            }
            Err(StoreError::UniqueViolation) => Err(AppError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    async fn target(&self, public_id: &str) -> Result<User, AppError> {
        self.users
            .find_by_public_id(public_id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    pub async fn update(
        &self,
        admin: &AuthSession,
        public_id: &str,
        request: AdminUserRequest,
    ) -> Result<(), AppError> {
        let (name, email) = match (trimmed(request.name), trimmed(request.email)) {
            (Some(n), Some(e)) => (n, e),
            _ => return Err(AppError::missing_fields()),
        };
        let role = parse_role(request.role)?;

        let user = self.target(public_id).await?;
        let update = ProfileUpdate {
            name,
            email,
            role: role.unwrap_or(user.role),
        };

        match self.users.update_profile(user.id, &update).await {
            Ok(true) => {}
            Ok(false) => return Err(AppError::NotFound("User")),
            Err(StoreError::UniqueViolation) => return Err(AppError::DuplicateEmail),
            Err(e) => return Err(e.into()),
        }

        if user.id == admin.identity.user_id {
            let identity = Identity {
                name: update.name,
                email: update.email,
                role: update.role,
                ..admin.identity.clone()
            };
            admin.session.insert(IDENTITY_KEY, &identity).await?;
            self.sessions
                .refresh_user(&identity)
                .map_err(|e| AppError::Internal(e.into()))?;
        } else {
            let ended = self.sessions.destroy_user(user.id);
            info!(user_id = user.id, sessions_ended = ended, "Ended sessions of edited user");
        }

        info!(user_id = user.id, role = %update.role, admin_id = admin.identity.user_id, "User updated by admin");
        Ok(())
    }

    pub async fn delete(&self, admin: &AuthSession, public_id: &str) -> Result<(), AppError> {
        let user = self.target(public_id).await?;

        if user.id == admin.identity.user_id {
            return Err(AppError::Validation(
                "Use account deletion to remove your own account".to_string(),
            ));
        }

        if !self.users.delete_user(user.id).await? {
            return Err(AppError::NotFound("User"));
        }
        self.sessions.destroy_user(user.id);

        info!(user_id = user.id, admin_id = admin.identity.user_id, "User deleted by admin");
        Ok(())
    }
}
