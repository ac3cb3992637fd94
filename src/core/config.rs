use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ai: Option<AiConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_num_threads")]
    pub num_threads: usize,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mysql,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    /// CA bundle used to verify the database server certificate
    pub ssl_ca: Option<PathBuf>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: u64,
    #[serde(default)]
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: i64,
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval: u64,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    pub endpoint: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_timeout")]
    pub timeout: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub blocked_countries: Vec<String>,
    #[serde(default = "default_country_header")]
    pub country_header: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_db_port(),
            user: None,
            password: None,
            name: None,
            ssl_ca: None,
            max_connections: default_max_connections(),
            acquire_timeout: default_acquire_timeout(),
            run_migrations: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            idle_timeout: default_idle_timeout(),
            cleanup_interval: default_cleanup_interval(),
            secret: String::new(),
            secure: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            blocked_countries: Vec::new(),
            country_header: default_country_header(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_num_threads() -> usize {
    num_cpus::get()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("public")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_db_port() -> u16 {
    3306
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    10
}

fn default_cookie_name() -> String {
    "sid".to_string()
}

fn default_idle_timeout() -> i64 {
    3600 // 1 hour
}

fn default_cleanup_interval() -> u64 {
    300 // 5 minutes
}

fn default_ai_model() -> String {
    "mistral".to_string()
}

fn default_ai_timeout() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

fn default_country_header() -> String {
    "cf-ipcountry".to_string()
}

/// Minimum length of the cookie signing secret in bytes
pub const MIN_SECRET_LEN: usize = 32;

impl Config {
    /// Load configuration from a TOML file, overlay the process environment
    /// and validate the result
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Overlay values provided through the environment. Environment wins over
    /// the file.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DB_HOST") {
            self.database.host = Some(host);
        }
        if let Some(port) = lookup("DB_PORT").and_then(|p| p.parse().ok()) {
            self.database.port = port;
        }
        if let Some(user) = lookup("DB_USER") {
            self.database.user = Some(user);
        }
        if let Some(password) = lookup("DB_PASS") {
            self.database.password = Some(password);
        }
        if let Some(name) = lookup("DB_NAME") {
            self.database.name = Some(name);
        }
        if let Some(ca) = lookup("DB_SSL_CA") {
            self.database.ssl_ca = Some(PathBuf::from(ca));
        }
        if let Some(secret) = lookup("SESSION_SECRET") {
            self.session.secret = secret;
        }
        if let Some(key) = lookup("AI_API_KEY") {
            if let Some(ai) = self.ai.as_mut() {
                ai.api_key = Some(key);
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            bail!("Server port must be greater than 0");
        }

        if self.server.num_threads == 0 {
            bail!("num_threads must be greater than 0");
        }

        if self.store.backend == StoreBackend::Mysql {
            let db = &self.database;
            let missing: Vec<&str> = [
                ("DB_HOST", db.host.is_none()),
                ("DB_USER", db.user.is_none()),
                ("DB_NAME", db.name.is_none()),
            ]
            .iter()
            .filter(|(_, absent)| *absent)
            .map(|(name, _)| *name)
            .collect();

            if !missing.is_empty() {
                bail!("Missing required database parameters: {}", missing.join(", "));
            }

            if db.max_connections == 0 {
                bail!("database max_connections must be greater than 0");
            }
        }

        if self.session.secret.len() < MIN_SECRET_LEN {
            bail!(
                "Session secret must be at least {} bytes (set SESSION_SECRET)",
                MIN_SECRET_LEN
            );
        }

        if self.session.cookie_name.is_empty()
            || !self.session.cookie_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            bail!("cookie_name must be non-empty and alphanumeric");
        }

        if self.session.idle_timeout <= 0 {
            bail!("idle_timeout must be greater than 0");
        }

        if self.session.cleanup_interval == 0 {
            bail!("cleanup_interval must be greater than 0");
        }

        if let Some(ai) = &self.ai {
            if ai.endpoint.is_empty() {
                bail!("ai endpoint must not be empty");
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            bail!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            );
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            bail!(
                "Invalid log format '{}'. Must be one of: json, console",
                self.logging.format
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn memory_config() -> Config {
        Config::from_toml_str(&format!(
            r#"
            [server]
            port = 8080

            [store]
            backend = "memory"

            [session]
            secret = "{SECRET}"
            "#
        ))
        .expect("Failed to parse config")
    }

    #[test]
    fn test_defaults_applied() {
        let config = memory_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.cookie_name, "sid");
        assert_eq!(config.session.idle_timeout, 3600);
        assert_eq!(config.database.port, 3306);
        assert_eq!(config.security.country_header, "cf-ipcountry");
        assert!(config.ai.is_none());
    }

    #[test]
    fn test_missing_database_params_is_fatal() {
        let config = Config::from_toml_str(&format!(
            r#"
            [server]
            port = 8080

            [session]
            secret = "{SECRET}"
            "#
        ))
        .unwrap();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("DB_HOST"));
        assert!(err.contains("DB_NAME"));
    }

    #[test]
    fn test_env_overlay_wins() {
        let mut config = Config::from_toml_str(&format!(
            r#"
            [server]
            port = 8080

            [database]
            host = "file-host"

            [session]
            secret = "{SECRET}"

            [ai]
            endpoint = "http://localhost:11434/api/generate"
            "#
        ))
        .unwrap();

        let env: HashMap<&str, &str> = [
            ("DB_HOST", "env-host"),
            ("DB_PORT", "3307"),
            ("DB_USER", "site"),
            ("DB_NAME", "site"),
            ("DB_SSL_CA", "/etc/ssl/ca.pem"),
            ("AI_API_KEY", "k"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.host.as_deref(), Some("env-host"));
        assert_eq!(config.database.port, 3307);
        assert_eq!(config.database.ssl_ca, Some(PathBuf::from("/etc/ssl/ca.pem")));
        assert_eq!(config.ai.unwrap().api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = memory_config();
        config.session.secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format_rejected() {
        let mut config = memory_config();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }
}
