//! Persistence seams. Services only see these traits; the MySQL backend is
//! used in production and the in-memory backend in tests and local runs.

pub mod memory;
pub mod mysql;

use crate::core::error::StoreError;
use crate::models::content::{CarouselDraft, CarouselRecord, Competition};
use crate::models::user::{NewUser, Role, User};
use async_trait::async_trait;

/// Mutable profile fields of a user
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user, failing with `UniqueViolation` on a taken email
    async fn insert_user(&self, user: NewUser) -> Result<i64, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Returns false when no such user exists
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, StoreError>;

    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<bool, StoreError>;

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Competitions ordered by name
    async fn list_competitions(&self) -> Result<Vec<Competition>, StoreError>;

    async fn insert_competition(&self, name: &str, icon: Option<&str>) -> Result<i64, StoreError>;

    async fn delete_competition(&self, id: i64) -> Result<bool, StoreError>;

    /// Raw carousel rows, newest first
    async fn list_carousel(&self) -> Result<Vec<CarouselRecord>, StoreError>;

    async fn insert_carousel(&self, draft: &CarouselDraft) -> Result<i64, StoreError>;

    async fn update_carousel(&self, id: i64, draft: &CarouselDraft) -> Result<bool, StoreError>;

    async fn delete_carousel(&self, id: i64) -> Result<bool, StoreError>;
}
