//! Configuration module for fileshelf.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, ShelfError};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection string.
    #[serde(default = "default_db_url")]
    pub url: String,
}

fn default_db_url() -> String {
    "sqlite://data/fileshelf.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
        }
    }
}

/// Object storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Local filesystem.
    #[default]
    Disk,
    /// Supabase Storage REST API.
    Supabase,
    /// In-process memory (lost on restart).
    Memory,
}

/// Object storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Which backend to use.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Bucket name.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Root directory for the disk backend.
    #[serde(default = "default_disk_path")]
    pub disk_path: String,
    /// Externally visible base URL used to build signed URLs for local backends.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Supabase project URL (e.g. `https://xyz.supabase.co`).
    #[serde(default)]
    pub supabase_url: String,
    /// Supabase service key.
    #[serde(default)]
    pub supabase_key: String,
    /// Request timeout for remote backends in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_bucket() -> String {
    "Files-upload".to_string()
}

fn default_disk_path() -> String {
    "data/files".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: default_bucket(),
            disk_path: default_disk_path(),
            public_base_url: default_public_base_url(),
            supabase_url: String::new(),
            supabase_key: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Quota limits.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Maximum number of files per user.
    #[serde(default = "default_max_files_per_user")]
    pub max_files_per_user: usize,
    /// Maximum size of a single file in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Lifetime of signed view URLs in seconds.
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_secs: u64,
    /// Maximum number of registered users.
    #[serde(default = "default_max_users")]
    pub max_users: i64,
}

fn default_max_files_per_user() -> usize {
    12
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_signed_url_ttl() -> u64 {
    300 // 5 minutes
}

fn default_max_users() -> i64 {
    15
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_files_per_user: default_max_files_per_user(),
            max_file_size_bytes: default_max_file_size(),
            signed_url_ttl_secs: default_signed_url_ttl(),
            max_users: default_max_users(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/fileshelf.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (required).
    #[serde(default)]
    pub jwt_secret: String,
    /// Session token expiry in seconds.
    #[serde(default = "default_jwt_expiry")]
    pub jwt_expiry_secs: u64,
    /// Mark the session cookie `Secure`.
    #[serde(default)]
    pub secure_cookies: bool,
    /// Rate limit for login/register endpoints (requests per minute).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Rate limit for general API endpoints (requests per minute).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

fn default_jwt_expiry() -> u64 {
    86400 // 1 day
}

fn default_login_rate_limit() -> u32 {
    5
}

fn default_api_rate_limit() -> u32 {
    100
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_expiry_secs: default_jwt_expiry(),
            secure_cookies: false,
            login_rate_limit: default_login_rate_limit(),
            api_rate_limit: default_api_rate_limit(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Quota limits.
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ShelfError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShelfError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILESHELF_JWT_SECRET` (or `JWT_SECRET`): session signing key
    /// - `PORT`: listen port
    /// - `DATABASE_URL`: SQLite connection string
    /// - `SUPABASE_URL`, `SUPABASE_KEY`, `SUPABASE_BUCKET`: Supabase storage credentials
    pub fn apply_env_overrides(&mut self) {
        if let Some(secret) =
            env_non_empty("FILESHELF_JWT_SECRET").or_else(|| env_non_empty("JWT_SECRET"))
        {
            self.web.jwt_secret = secret;
        }
        if let Some(port) = env_non_empty("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(url) = env_non_empty("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(url) = env_non_empty("SUPABASE_URL") {
            self.storage.supabase_url = url;
        }
        if let Some(key) = env_non_empty("SUPABASE_KEY") {
            self.storage.supabase_key = key;
        }
        if let Some(bucket) = env_non_empty("SUPABASE_BUCKET") {
            self.storage.bucket = bucket;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - JWT secret is not set
    /// - Supabase backend is selected without URL or key
    /// - A quota limit is zero
    /// - The signed URL lifetime is zero or does not fit a unix timestamp
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(ShelfError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via FILESHELF_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::Supabase
            && (self.storage.supabase_url.is_empty() || self.storage.supabase_key.is_empty())
        {
            return Err(ShelfError::Config(
                "supabase backend requires supabase_url and supabase_key".to_string(),
            ));
        }
        if self.quota.max_files_per_user == 0 || self.quota.max_file_size_bytes == 0 {
            return Err(ShelfError::Config(
                "quota limits must be greater than zero".to_string(),
            ));
        }
        let ttl = self.quota.signed_url_ttl_secs;
        if ttl == 0 || i64::try_from(ttl).is_err() {
            return Err(ShelfError::Config(
                "signed_url_ttl_secs must be between 1 and i64::MAX".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);

        assert_eq!(config.database.url, "sqlite://data/fileshelf.db");

        assert_eq!(config.storage.backend, StorageBackend::Disk);
        assert_eq!(config.storage.bucket, "Files-upload");
        assert_eq!(config.storage.disk_path, "data/files");
        assert_eq!(config.storage.request_timeout_secs, 30);

        assert_eq!(config.quota.max_files_per_user, 12);
        assert_eq!(config.quota.max_file_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.quota.signed_url_ttl_secs, 300);
        assert_eq!(config.quota.max_users, 15);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/fileshelf.log");

        assert!(config.web.cors_origins.is_empty());
        assert!(config.web.jwt_secret.is_empty());
        assert_eq!(config.web.jwt_expiry_secs, 86400);
        assert!(!config.web.secure_cookies);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080

[database]
url = "sqlite://custom/db.sqlite"

[storage]
backend = "supabase"
bucket = "uploads"
supabase_url = "https://example.supabase.co"
supabase_key = "service-key"
request_timeout_secs = 10

[quota]
max_files_per_user = 3
max_file_size_bytes = 1024
signed_url_ttl_secs = 60
max_users = 100

[logging]
level = "debug"
file = "custom/logs/app.log"

[web]
cors_origins = ["http://localhost:5173"]
jwt_secret = "test-secret-key"
jwt_expiry_secs = 600
secure_cookies = true
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite://custom/db.sqlite");
        assert_eq!(config.storage.backend, StorageBackend::Supabase);
        assert_eq!(config.storage.bucket, "uploads");
        assert_eq!(config.storage.supabase_url, "https://example.supabase.co");
        assert_eq!(config.storage.supabase_key, "service-key");
        assert_eq!(config.storage.request_timeout_secs, 10);
        assert_eq!(config.quota.max_files_per_user, 3);
        assert_eq!(config.quota.max_file_size_bytes, 1024);
        assert_eq!(config.quota.signed_url_ttl_secs, 60);
        assert_eq!(config.quota.max_users, 100);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.web.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.web.jwt_secret, "test-secret-key");
        assert_eq!(config.web.jwt_expiry_secs, 600);
        assert!(config.web.secure_cookies);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 4000

[quota]
max_files_per_user = 20
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.quota.max_files_per_user, 20);

        // Default values
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.quota.max_file_size_bytes, 5 * 1024 * 1024);
        assert_eq!(config.storage.backend, StorageBackend::Disk);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(ShelfError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_parse_unknown_backend() {
        let result = Config::parse("[storage]\nbackend = \"ftp\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(ShelfError::Io(_))));
    }

    // Environment variables are process-wide, so all override cases live in one test.
    #[test]
    fn test_apply_env_overrides() {
        let keys = ["FILESHELF_JWT_SECRET", "PORT", "SUPABASE_BUCKET"];
        let original: Vec<_> = keys.iter().map(|k| std::env::var(k).ok()).collect();

        std::env::set_var("FILESHELF_JWT_SECRET", "env-secret-key");
        std::env::set_var("PORT", "8181");
        std::env::set_var("SUPABASE_BUCKET", "env-bucket");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.web.jwt_secret, "env-secret-key");
        assert_eq!(config.server.port, 8181);
        assert_eq!(config.storage.bucket, "env-bucket");

        // Empty values never override
        std::env::set_var("FILESHELF_JWT_SECRET", "");
        let mut config = Config::default();
        config.web.jwt_secret = "original-secret".to_string();
        config.apply_env_overrides();
        if std::env::var("JWT_SECRET").is_err() {
            assert_eq!(config.web.jwt_secret, "original-secret");
        }

        for (key, value) in keys.iter().zip(original) {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }

    #[test]
    fn test_validate_missing_secret() {
        let config = Config::default();
        let result = config.validate();
        assert!(matches!(result, Err(ShelfError::Config(msg)) if msg.contains("jwt_secret")));
    }

    #[test]
    fn test_validate_supabase_without_credentials() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        config.storage.backend = StorageBackend::Supabase;

        assert!(config.validate().is_err());

        config.storage.supabase_url = "https://example.supabase.co".to_string();
        config.storage.supabase_key = "key".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_quota() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        config.quota.max_files_per_user = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_signed_url_ttl_bounds() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();

        config.quota.signed_url_ttl_secs = 0;
        assert!(matches!(config.validate(), Err(ShelfError::Config(_))));

        config.quota.signed_url_ttl_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(ShelfError::Config(_))));

        config.quota.signed_url_ttl_secs = 300;
        assert!(config.validate().is_ok());
    }
}
