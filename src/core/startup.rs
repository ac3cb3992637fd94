use anyhow::{Context, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use std::time::Duration;
use tracing::{info, warn};

use crate::core::config::DatabaseConfig;
use crate::models::user::Role;
use crate::stores::{CredentialStore, ProfileUpdate};

// this runs at boot time, a failure here halts startup
pub async fn connect_mysql(config: &DatabaseConfig) -> Result<MySqlPool> {
    let host = config.host.as_deref().context("DB_HOST is not set")?;
    let user = config.user.as_deref().context("DB_USER is not set")?;
    let database = config.name.as_deref().context("DB_NAME is not set")?;

    let mut options = MySqlConnectOptions::new()
        .host(host)
        .port(config.port)
        .username(user)
        .database(database);

    if let Some(password) = &config.password {
        options = options.password(password);
    }

    options = match &config.ssl_ca {
        Some(ca) => options.ssl_mode(MySqlSslMode::VerifyCa).ssl_ca(ca),
        None => {
            warn!("DB_SSL_CA not set, database link will not verify the server certificate");
            options.ssl_mode(MySqlSslMode::Preferred)
        }
    };

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout))
        .connect_with(options)
        .await
        .context(format!("Failed to connect to MySQL at {}:{}", host, config.port))?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("Database ping failed")?;

    info!(
        host = %host,
        port = config.port,
        database = %database,
        max_connections = config.max_connections,
        tls_verified = config.ssl_ca.is_some(),
        "Database pool ready"
    );

    Ok(pool)
}

pub async fn run_migrations(pool: &MySqlPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;

    info!("Database migrations applied");
    Ok(())
}

/// Promote the listed accounts to `admin`. Unknown emails are skipped.
/// Returns how many accounts changed role.
pub async fn promote_admins(store: &dyn CredentialStore, emails: &[String]) -> Result<usize> {
    let mut promoted = 0;

    for email in emails.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        let user = match store
            .find_by_email(email)
            .await
            .context("Failed to look up bootstrap admin")?
        {
            Some(user) => user,
            None => {
                warn!(email = %email, "Bootstrap admin not registered, skipping");
                continue;
            }
        };

        if user.role == Role::Admin {
            continue;
        }

        let update = ProfileUpdate {
            name: user.name.clone(),
            email: user.email.clone(),
            role: Role::Admin,
        };
        store
            .update_profile(user.id, &update)
            .await
            .context("Failed to promote bootstrap admin")?;

        info!(user_id = user.id, "User promoted to admin");
        promoted += 1;
    }

    Ok(promoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::NewUser;
    use crate::stores::memory::MemoryCredentialStore;

    #[tokio::test]
    async fn test_promote_admins() {
        let store = MemoryCredentialStore::new();
        let id = store
            .insert_user(NewUser::new("Ann".into(), "ann@example.com".into(), "h".into(), Role::User))
            .await
            .unwrap();

        let emails = vec![
            " ann@example.com ".to_string(),
            "ghost@example.com".to_string(),
            String::new(),
        ];
        assert_eq!(promote_admins(&store, &emails).await.unwrap(), 1);
        assert_eq!(store.find_by_id(id).await.unwrap().unwrap().role, Role::Admin);

        // already admin
        assert_eq!(promote_admins(&store, &emails).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connect_requires_host() {
        let config = DatabaseConfig::default();
        let err = connect_mysql(&config).await.unwrap_err();
        assert!(err.to_string().contains("DB_HOST"));
    }
}
