use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Stored user record
#[derive(Clone, Debug)]
pub struct User {
    /// Internal row id, never sent to clients
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.id,
            public_id: self.public_id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Fields needed to insert a user
#[derive(Clone, Debug)]
pub struct NewUser {
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl NewUser {
    pub fn new(name: String, email: String, password_hash: String, role: Role) -> Self {
        Self {
            public_id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            role,
        }
    }
}

/// Identity snapshot carried by a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Client-facing view of a session identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionUser {
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&Identity> for SessionUser {
    fn from(identity: &Identity) -> Self {
        Self {
            public_id: identity.public_id.clone(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            role: identity.role,
        }
    }
}

/// Client-facing view of a stored user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for AccountView {
    fn from(user: &User) -> Self {
        Self {
            public_id: user.public_id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("Admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_new_user_gets_public_id() {
        let a = NewUser::new("Ann".into(), "ann@example.com".into(), "h".into(), Role::User);
        let b = NewUser::new("Ann".into(), "ann@example.com".into(), "h".into(), Role::User);
        assert_ne!(a.public_id, b.public_id);
        assert_eq!(a.public_id.len(), 36);
    }
}
