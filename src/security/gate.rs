use crate::core::error::AppError;
use crate::models::user::Identity;
use crate::session::{current_identity, touch, IDENTITY_KEY};
use crate::stores::CredentialStore;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{info, warn};

/// An authenticated request: its session handle and the identity snapshot
/// the session maps to
#[derive(Clone)]
pub struct AuthSession {
    pub session: Session,
    pub identity: Identity,
}

/// Access decisions derived from the session
///
/// Authentication is always checked first so that anonymous callers learn
/// nothing about which routes are admin-only.
#[derive(Clone)]
pub struct AuthGate {
    users: Arc<dyn CredentialStore>,
}

impl AuthGate {
    pub fn new(users: Arc<dyn CredentialStore>) -> Self {
        Self { users }
    }

    pub async fn require_authenticated(&self, session: &Session) -> Result<AuthSession, AppError> {
        let identity = current_identity(session)
            .await?
            .ok_or(AppError::Unauthenticated)?;
        touch(session).await?;

        Ok(AuthSession {
            session: session.clone(),
            identity,
        })
    }

    /// Admin check against the stored role, not the login-time snapshot.
    /// A vanished user loses the session; a changed user gets a fresh
    /// snapshot.
    pub async fn require_admin(&self, session: &Session) -> Result<AuthSession, AppError> {
        let auth = self.require_authenticated(session).await?;

        let user = match self.users.find_by_id(auth.identity.user_id).await? {
            Some(user) => user,
            None => {
                warn!(
                    user_id = auth.identity.user_id,
                    "Session user no longer exists, destroying session"
                );
                session.flush().await?;
                return Err(AppError::Unauthenticated);
            }
        };

        let identity = user.identity();
        if identity != auth.identity {
            info!(user_id = identity.user_id, role = %identity.role, "Refreshing stale session snapshot");
            session.insert(IDENTITY_KEY, &identity).await?;
        }

        if !identity.is_admin() {
            warn!(user_id = identity.user_id, "Admin route refused");
            return Err(AppError::Forbidden);
        }

        Ok(AuthSession {
            session: auth.session,
            identity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{NewUser, Role};
    use crate::session::store::SessionRegistry;
    use crate::stores::memory::MemoryCredentialStore;
    use crate::stores::ProfileUpdate;
    use tower_sessions::session::Id;

    struct Fixture {
        gate: AuthGate,
        store: Arc<MemoryCredentialStore>,
        registry: SessionRegistry,
        id: Id,
        user_id: i64,
    }

    async fn setup(role: Role) -> Fixture {
        let store = Arc::new(MemoryCredentialStore::new());
        let registry = SessionRegistry::new();
        let user_id = store
            .insert_user(NewUser::new("Ann".into(), "ann@example.com".into(), "h".into(), role))
            .await
            .unwrap();
        let user = store.find_by_id(user_id).await.unwrap().unwrap();
        let id = registry.seed(&user.identity());

        Fixture {
            gate: AuthGate::new(store.clone()),
            store,
            registry,
            id,
            user_id,
        }
    }

    #[tokio::test]
    async fn test_anonymous_is_unauthenticated_even_for_admin_routes() {
        let f = setup(Role::Admin).await;
        let anonymous = f.registry.open(None);

        assert!(matches!(
            f.gate.require_authenticated(&anonymous).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            f.gate.require_admin(&anonymous).await,
            Err(AppError::Unauthenticated)
        ));

        let unknown = f.registry.open(Some(Id::default()));
        assert!(matches!(
            f.gate.require_admin(&unknown).await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_user_forbidden_admin_allowed() {
        let f = setup(Role::User).await;
        let session = f.registry.open(Some(f.id));
        assert!(f.gate.require_authenticated(&session).await.is_ok());
        assert!(matches!(f.gate.require_admin(&session).await, Err(AppError::Forbidden)));

        let f = setup(Role::Admin).await;
        let auth = f.gate.require_admin(&f.registry.open(Some(f.id))).await.unwrap();
        assert!(auth.identity.is_admin());
    }

    #[tokio::test]
    async fn test_revoked_admin_is_forbidden_immediately() {
        let f = setup(Role::Admin).await;
        let session = f.registry.open(Some(f.id));

        let demote = ProfileUpdate {
            name: "Ann".into(),
            email: "ann@example.com".into(),
            role: Role::User,
        };
        f.store.update_profile(f.user_id, &demote).await.unwrap();

        assert!(matches!(f.gate.require_admin(&session).await, Err(AppError::Forbidden)));

        // snapshot now reflects the store once the session is saved
        session.save().await.unwrap();
        assert_eq!(f.registry.identity_of(&f.id).unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_deleted_user_loses_session() {
        let f = setup(Role::Admin).await;
        let session = f.registry.open(Some(f.id));
        f.store.delete_user(f.user_id).await.unwrap();

        assert!(matches!(
            f.gate.require_admin(&session).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(f.registry.is_empty());
    }
}
