use crate::core::error::StoreError;
use crate::models::content::{CarouselDraft, CarouselRecord, Competition};
use crate::models::user::{NewUser, User};
use crate::stores::{ContentStore, CredentialStore, ProfileUpdate};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory user store
///
/// Email uniqueness is enforced through a secondary index claimed with the
/// entry API before the row is written.
pub struct MemoryCredentialStore {
    users: DashMap<i64, User>,
    emails: DashMap<String, i64>,
    next_id: AtomicI64,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            emails: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn insert_user(&self, user: NewUser) -> Result<i64, StoreError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::UniqueViolation),
            Entry::Vacant(slot) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                self.users.insert(
                    id,
                    User {
                        id,
                        public_id: user.public_id,
                        name: user.name,
                        email: user.email,
                        password_hash: user.password_hash,
                        role: user.role,
                        created_at: Utc::now(),
                    },
                );
                slot.insert(id);
                Ok(id)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let id = match self.emails.get(email) {
            Some(entry) => *entry.value(),
            None => return Ok(None),
        };
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().public_id == public_id)
            .map(|entry| entry.value().clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().map(|e| e.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, StoreError> {
        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<bool, StoreError> {
        let current_email = match self.users.get(&id) {
            Some(user) => user.email.clone(),
            None => return Ok(false),
        };

        if current_email != update.email {
            match self.emails.entry(update.email.clone()) {
                Entry::Occupied(_) => return Err(StoreError::UniqueViolation),
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
            self.emails.remove(&current_email);
        }

        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.name = update.name.clone();
                user.email = update.email.clone();
                user.role = update.role;
                Ok(true)
            }
            None => {
                self.emails.remove(&update.email);
                Ok(false)
            }
        }
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        match self.users.remove(&id) {
            Some((_, user)) => {
                self.emails.remove(&user.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// In-memory competitions and carousel cards
pub struct MemoryContentStore {
    competitions: DashMap<i64, Competition>,
    names: DashMap<String, i64>,
    carousel: DashMap<i64, CarouselRecord>,
    next_id: AtomicI64,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self {
            competitions: DashMap::new(),
            names: DashMap::new(),
            carousel: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Insert a raw row as an older release would have written it
    pub fn insert_raw_carousel(&self, record: CarouselRecord) {
        self.next_id.fetch_max(record.id + 1, Ordering::Relaxed);
        self.carousel.insert(record.id, record);
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn list_competitions(&self) -> Result<Vec<Competition>, StoreError> {
        let mut list: Vec<Competition> =
            self.competitions.iter().map(|e| e.value().clone()).collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn insert_competition(&self, name: &str, icon: Option<&str>) -> Result<i64, StoreError> {
        match self.names.entry(name.to_string()) {
            Entry::Occupied(_) => Err(StoreError::UniqueViolation),
            Entry::Vacant(slot) => {
                let id = self.next_id();
                self.competitions.insert(
                    id,
                    Competition {
                        id,
                        name: name.to_string(),
                        icon: icon.map(str::to_string),
                        created_at: Utc::now(),
                    },
                );
                slot.insert(id);
                Ok(id)
            }
        }
    }

    async fn delete_competition(&self, id: i64) -> Result<bool, StoreError> {
        match self.competitions.remove(&id) {
            Some((_, competition)) => {
                self.names.remove(&competition.name);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_carousel(&self) -> Result<Vec<CarouselRecord>, StoreError> {
        let mut rows: Vec<CarouselRecord> = self.carousel.iter().map(|e| e.value().clone()).collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn insert_carousel(&self, draft: &CarouselDraft) -> Result<i64, StoreError> {
        let parents = draft
            .parents_json()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let id = self.next_id();
        self.carousel.insert(
            id,
            CarouselRecord {
                id,
                title: draft.title.clone(),
                date: draft.date.clone(),
                subtitle: draft.subtitle.clone(),
                description: draft.description.clone(),
                parents: Some(parents),
                dropdowns: None,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn update_carousel(&self, id: i64, draft: &CarouselDraft) -> Result<bool, StoreError> {
        let parents = draft
            .parents_json()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        match self.carousel.get_mut(&id) {
            Some(mut row) => {
                row.title = draft.title.clone();
                row.date = draft.date.clone();
                row.subtitle = draft.subtitle.clone();
                row.description = draft.description.clone();
                row.parents = Some(parents);
                row.dropdowns = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_carousel(&self, id: i64) -> Result<bool, StoreError> {
        Ok(self.carousel.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser::new("Ann".to_string(), email.to_string(), "hash".to_string(), Role::User)
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryCredentialStore::new();
        store.insert_user(new_user("ann@example.com")).await.unwrap();

        let err = store.insert_user(new_user("ann@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_email_case_sensitive() {
        let store = MemoryCredentialStore::new();
        store.insert_user(new_user("ann@example.com")).await.unwrap();
        assert!(store.insert_user(new_user("Ann@example.com")).await.is_ok());
        assert!(store.find_by_email("ANN@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_profile_email_change_moves_index() {
        let store = MemoryCredentialStore::new();
        let id = store.insert_user(new_user("old@example.com")).await.unwrap();
        store.insert_user(new_user("taken@example.com")).await.unwrap();

        let taken = ProfileUpdate {
            name: "Ann".to_string(),
            email: "taken@example.com".to_string(),
            role: Role::User,
        };
        assert!(matches!(
            store.update_profile(id, &taken).await,
            Err(StoreError::UniqueViolation)
        ));

        let update = ProfileUpdate {
            name: "Ann B".to_string(),
            email: "new@example.com".to_string(),
            role: Role::Admin,
        };
        assert!(store.update_profile(id, &update).await.unwrap());
        assert!(store.find_by_email("old@example.com").await.unwrap().is_none());

        let user = store.find_by_email("new@example.com").await.unwrap().unwrap();
        assert_eq!(user.name, "Ann B");
        assert_eq!(user.role, Role::Admin);

        // the old address is free again
        assert!(store.insert_user(new_user("old@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_user_frees_email() {
        let store = MemoryCredentialStore::new();
        let id = store.insert_user(new_user("ann@example.com")).await.unwrap();

        assert!(store.delete_user(id).await.unwrap());
        assert!(!store.delete_user(id).await.unwrap());
        assert!(store.find_by_id(id).await.unwrap().is_none());
        assert!(store.insert_user(new_user("ann@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_competitions_sorted_and_unique() {
        let store = MemoryContentStore::new();
        store.insert_competition("Serie A", None).await.unwrap();
        store.insert_competition("La Liga", Some("/l.png")).await.unwrap();

        assert!(matches!(
            store.insert_competition("Serie A", None).await,
            Err(StoreError::UniqueViolation)
        ));

        let names: Vec<String> = store
            .list_competitions()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["La Liga", "Serie A"]);
    }

    #[tokio::test]
    async fn test_carousel_update_clears_legacy_column() {
        let store = MemoryContentStore::new();
        store.insert_raw_carousel(CarouselRecord {
            id: 5,
            title: "old".to_string(),
            date: None,
            subtitle: None,
            description: None,
            parents: None,
            dropdowns: Some(r#"[{"title":"x"}]"#.to_string()),
            created_at: Utc::now(),
        });

        let draft = CarouselDraft {
            title: "new".to_string(),
            date: None,
            subtitle: None,
            description: None,
            parents: Vec::new(),
        };
        assert!(store.update_carousel(5, &draft).await.unwrap());

        let rows = store.list_carousel().await.unwrap();
        assert_eq!(rows[0].title, "new");
        assert!(rows[0].dropdowns.is_none());
        assert_eq!(rows[0].parents.as_deref(), Some("[]"));

        // ids keep increasing past raw inserts
        let id = store.insert_carousel(&draft).await.unwrap();
        assert!(id > 5);
    }
}
