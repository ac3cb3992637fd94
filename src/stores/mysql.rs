use crate::core::error::StoreError;
use crate::models::content::{CarouselDraft, CarouselRecord, Competition};
use crate::models::user::{NewUser, User};
use crate::stores::{ContentStore, CredentialStore, ProfileUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::MySqlPool;
use sqlx::FromRow;

const USER_COLUMNS: &str =
    "id, public_id, name, email, password, CAST(role AS CHAR) AS role, created_at";

const CAROUSEL_COLUMNS: &str =
    "id, title, date, subtitle, description, parents, dropdowns, created_at";

/// MySQL-backed store over a bounded connection pool
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    public_id: String,
    name: String,
    email: String,
    password: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse()
            .map_err(|e: String| StoreError::Corrupt(format!("user {}: {}", row.id, e)))?;

        Ok(User {
            id: row.id,
            public_id: row.public_id,
            name: row.name,
            email: row.email,
            password_hash: row.password,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct CompetitionRow {
    id: i64,
    name: String,
    icon: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CompetitionRow> for Competition {
    fn from(row: CompetitionRow) -> Self {
        Competition {
            id: row.id,
            name: row.name,
            icon: row.icon,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct CarouselRow {
    id: i64,
    title: String,
    date: Option<String>,
    subtitle: Option<String>,
    description: Option<String>,
    parents: Option<String>,
    dropdowns: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CarouselRow> for CarouselRecord {
    fn from(row: CarouselRow) -> Self {
        CarouselRecord {
            id: row.id,
            title: row.title,
            date: row.date,
            subtitle: row.subtitle,
            description: row.description,
            parents: row.parents,
            dropdowns: row.dropdowns,
            created_at: row.created_at,
        }
    }
}

impl MySqlStore {
    async fn find_user_where(&self, clause: &str, value: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, clause);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }
}

#[async_trait]
impl CredentialStore for MySqlStore {
    async fn insert_user(&self, user: NewUser) -> Result<i64, StoreError> {
        let result = sqlx::query(
            "INSERT INTO users (public_id, name, email, password, role) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.public_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id() as i64)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_user_where("email", email).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn find_by_public_id(&self, public_id: &str) -> Result<Option<User>, StoreError> {
        self.find_user_where("public_id", public_id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(User::try_from)
            .collect()
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET name = ?, email = ?, role = ? WHERE id = ?")
            .bind(&update.name)
            .bind(&update.email)
            .bind(update.role.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        // MySQL reports zero affected rows when nothing changed
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        Ok(self.find_by_id(id).await?.is_some())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ContentStore for MySqlStore {
    async fn list_competitions(&self) -> Result<Vec<Competition>, StoreError> {
        let rows = sqlx::query_as::<_, CompetitionRow>(
            "SELECT id, name, icon, created_at FROM competitions ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Competition::from).collect())
    }

    async fn insert_competition(&self, name: &str, icon: Option<&str>) -> Result<i64, StoreError> {
        let result = sqlx::query("INSERT INTO competitions (name, icon) VALUES (?, ?)")
            .bind(name)
            .bind(icon)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_id() as i64)
    }

    async fn delete_competition(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM competitions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_carousel(&self) -> Result<Vec<CarouselRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM carousel_insights ORDER BY created_at DESC, id DESC",
            CAROUSEL_COLUMNS
        );
        let rows = sqlx::query_as::<_, CarouselRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CarouselRecord::from).collect())
    }

    async fn insert_carousel(&self, draft: &CarouselDraft) -> Result<i64, StoreError> {
        let parents = draft
            .parents_json()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO carousel_insights (title, date, subtitle, description, parents) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&draft.title)
        .bind(&draft.date)
        .bind(&draft.subtitle)
        .bind(&draft.description)
        .bind(parents)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id() as i64)
    }

    async fn update_carousel(&self, id: i64, draft: &CarouselDraft) -> Result<bool, StoreError> {
        let parents = draft
            .parents_json()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // dropdowns is the legacy column; a rewrite always drops it
        let result = sqlx::query(
            "UPDATE carousel_insights \
             SET title = ?, date = ?, subtitle = ?, description = ?, parents = ?, dropdowns = NULL \
             WHERE id = ?",
        )
        .bind(&draft.title)
        .bind(&draft.date)
        .bind(&draft.subtitle)
        .bind(&draft.description)
        .bind(parents)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM carousel_insights WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(exists.is_some())
    }

    async fn delete_carousel(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM carousel_insights WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
