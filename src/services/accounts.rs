use crate::core::error::{AppError, StoreError};
use crate::models::api::SessionStatus;
use crate::models::user::{AccountView, Identity, NewUser, Role, SessionUser};
use crate::security::gate::AuthSession;
use crate::security::password;
use crate::services::{non_blank, trimmed};
use crate::session::store::SessionRegistry;
use crate::session::{current_identity, touch, IDENTITY_KEY};
use crate::stores::{CredentialStore, ProfileUpdate};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{info, warn};

/// Self-service account lifecycle: signup, login, logout, password change,
/// profile edit and deletion
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn CredentialStore>,
    sessions: SessionRegistry,
}

impl AccountService {
    pub fn new(users: Arc<dyn CredentialStore>, sessions: SessionRegistry) -> Self {
        Self { users, sessions }
    }

    /// Register a `user`-role account. No session is created.
    pub async fn signup(
        &self,
        name: Option<String>,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<(), AppError> {
        let (name, email, password) = match (trimmed(name), trimmed(email), non_blank(password)) {
            (Some(n), Some(e), Some(p)) => (n, e, p),
            _ => return Err(AppError::missing_fields()),
        };

        let password_hash = password::hash_blocking(password).await?;
        let new_user = NewUser::new(name, email, password_hash, Role::User);
        let public_id = new_user.public_id.clone();

        match self.users.insert_user(new_user).await {
            Ok(id) => {
                info!(user_id = id, public_id = %public_id, "User registered");
                Ok(())
            }
            Err(StoreError::UniqueViolation) => Err(AppError::DuplicateEmail),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify credentials and log the session in under a fresh id. Unknown
    /// email and wrong password fail identically. Any session the caller
    /// already held is replaced.
    pub async fn login(
        &self,
        session: &Session,
        email: Option<String>,
        password: Option<String>,
    ) -> Result<Identity, AppError> {
        let (email, password) = match (trimmed(email), non_blank(password)) {
            (Some(e), Some(p)) => (e, p),
            _ => return Err(AppError::Validation("Email and password are required".to_string())),
        };

        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                password::verify_dummy(password).await?;
                warn!("Failed login attempt");
                return Err(AppError::InvalidCredentials);
            }
        };

        if !password::verify_blocking(password, user.password_hash.clone()).await? {
            warn!(user_id = user.id, "Failed login attempt");
            return Err(AppError::InvalidCredentials);
        }

        let identity = user.identity();
        session.cycle_id().await?;
        session.insert(IDENTITY_KEY, &identity).await?;
        touch(session).await?;
        session.save().await?;

        // Deletion removes the row before it ends sessions, so once this
        // session is stored a row that is still present cannot vanish
        // without taking the session with it.
        if self.users.find_by_id(user.id).await?.is_none() {
            warn!(user_id = user.id, "Account deleted during login");
            session.flush().await?;
            return Err(AppError::InvalidCredentials);
        }

        info!(user_id = user.id, role = %user.role, "User logged in");
        Ok(identity)
    }

    pub async fn logout(&self, session: &Session) -> Result<(), AppError> {
        let identity = current_identity(session).await?;
        session.flush().await?;

        if let Some(identity) = identity {
            info!(user_id = identity.user_id, "User logged out");
        }
        Ok(())
    }

    pub async fn session_status(&self, session: &Session) -> Result<SessionStatus, AppError> {
        Ok(match current_identity(session).await? {
            Some(identity) => {
                touch(session).await?;
                SessionStatus {
                    logged_in: true,
                    user: Some(SessionUser::from(&identity)),
                }
            }
            None => SessionStatus {
                logged_in: false,
                user: None,
            },
        })
    }

    /// Fresh projection of the stored record behind the session
    pub async fn get_account(&self, auth: &AuthSession) -> Result<AccountView, AppError> {
        match self.users.find_by_id(auth.identity.user_id).await? {
            Some(user) => Ok(AccountView::from(&user)),
            None => {
                auth.session.flush().await?;
                Err(AppError::NotFound("Account"))
            }
        }
    }

    pub async fn update_profile(
        &self,
        auth: &AuthSession,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<SessionUser, AppError> {
        let (name, email) = match (trimmed(name), trimmed(email)) {
            (Some(n), Some(e)) => (n, e),
            _ => return Err(AppError::missing_fields()),
        };

        let user = self
            .users
            .find_by_id(auth.identity.user_id)
            .await?
            .ok_or(AppError::NotFound("Account"))?;

        let update = ProfileUpdate {
            name,
            email,
            role: user.role,
        };

        match self.users.update_profile(user.id, &update).await {
            Ok(true) => {}
            Ok(false) => return Err(AppError::NotFound("Account")),
            Err(StoreError::UniqueViolation) => return Err(AppError::DuplicateEmail),
            Err(e) => return Err(e.into()),
        }

        let identity = Identity {
            name: update.name,
            email: update.email,
            ..user.identity()
        };
        auth.session.insert(IDENTITY_KEY, &identity).await?;
        self.sessions
            .refresh_user(&identity)
            .map_err(|e| AppError::Internal(e.into()))?;
        info!(user_id = user.id, "Profile updated");

        Ok(SessionUser::from(&identity))
    }

    pub async fn change_password(
        &self,
        auth: &AuthSession,
        old_password: Option<String>,
        new_password: Option<String>,
        confirm_password: Option<String>,
    ) -> Result<(), AppError> {
        let (old, new, confirm) = match (
            non_blank(old_password),
            non_blank(new_password),
            non_blank(confirm_password),
        ) {
            (Some(o), Some(n), Some(c)) => (o, n, c),
            _ => return Err(AppError::missing_fields()),
        };

        if new != confirm {
            return Err(AppError::Validation("New passwords do not match".to_string()));
        }

        let user = self
            .users
            .find_by_id(auth.identity.user_id)
            .await?
            .ok_or(AppError::NotFound("Account"))?;

        if !password::verify_blocking(old, user.password_hash.clone()).await? {
            warn!(user_id = user.id, "Password change with wrong current password");
            return Err(AppError::IncorrectPassword);
        }

        let password_hash = password::hash_blocking(new).await?;
        if !self.users.update_password(user.id, &password_hash).await? {
            return Err(AppError::NotFound("Account"));
        }

        info!(user_id = user.id, "Password changed");
        Ok(())
    }

    /// Delete the account behind the session and end every session it has.
    ///
    /// The caller's session is detached before the row is deleted and put
    /// back if the delete fails, so afterwards either both exist or neither.
    pub async fn delete_account(
        &self,
        auth: &AuthSession,
        password: Option<String>,
    ) -> Result<(), AppError> {
        let password = non_blank(password)
            .ok_or_else(|| AppError::Validation("Password is required".to_string()))?;

        let user_id = auth.identity.user_id;
        let user = match self.users.find_by_id(user_id).await? {
            Some(user) => user,
            None => {
                self.sessions.destroy_user(user_id);
                auth.session.flush().await?;
                return Err(AppError::NotFound("Account"));
            }
        };

        if !password::verify_blocking(password, user.password_hash.clone()).await? {
            warn!(user_id = user_id, "Account deletion with wrong password");
            return Err(AppError::IncorrectPassword);
        }

        let detached = auth.session.id().and_then(|id| self.sessions.take(&id));

        match self.users.delete_user(user_id).await {
            Ok(deleted) => {
                self.sessions.destroy_user(user_id);
                auth.session.flush().await?;
                if !deleted {
                    return Err(AppError::NotFound("Account"));
                }
                info!(user_id = user_id, "Account deleted");
                Ok(())
            }
            Err(e) => {
                if let Some(record) = detached {
                    self.sessions.restore(record);
                }
                Err(e.into())
            }
        }
    }
}
