//! Configuration for Mailcast

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "MAILCAST_CONFIG";

/// Prefix for environment overrides, e.g. `MAILCAST__CACHE__ENABLED=true`
const ENV_PREFIX: &str = "MAILCAST";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Outbound mail configuration
    #[serde(default)]
    pub mail: MailConfig,

    /// Mailing list cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Account/token configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the HTTP API
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Public base URL, used to build links in outbound mail
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            base_url: default_base_url(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: Option<String>,

    /// Maximum connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Outbound mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Sender address for every outbound message
    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// SMTP relay host
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// SMTP relay port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username
    pub username: Option<String>,

    /// SMTP password
    pub password: Option<String>,

    /// Use implicit TLS
    #[serde(default)]
    pub use_tls: bool,

    /// Use STARTTLS
    #[serde(default = "default_use_starttls")]
    pub use_starttls: bool,

    /// Timeout for a single SMTP exchange
    #[serde(default = "default_smtp_timeout")]
    pub timeout_secs: u64,

    /// Where contact form submissions are delivered
    pub contact_address: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from_address: default_from_address(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            use_tls: false,
            use_starttls: default_use_starttls(),
            timeout_secs: default_smtp_timeout(),
            contact_address: None,
        }
    }
}

fn default_from_address() -> String {
    "noreply@example.com".to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_use_starttls() -> bool {
    true
}

fn default_smtp_timeout() -> u64 {
    30
}

/// Mailing list cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable the read-through mailing list cache
    #[serde(default)]
    pub enabled: bool,
}

/// Account and token configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Lifetime of a login token in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    /// Lifetime of a password reset token in minutes
    #[serde(default = "default_reset_token_ttl_minutes")]
    pub reset_token_ttl_minutes: i64,

    /// Superuser created at startup when missing
    pub admin_email: Option<String>,

    /// Password for `admin_email`
    pub admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_hours: default_token_ttl_hours(),
            reset_token_ttl_minutes: default_reset_token_ttl_minutes(),
            admin_email: None,
            admin_password: None,
        }
    }
}

/// Longest accepted login token lifetime (ten years)
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365 * 10;

/// Longest accepted password reset token lifetime (one week)
pub const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 7;

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_reset_token_ttl_minutes() -> i64 {
    60
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Config {
    /// Load configuration from a TOML file, with `MAILCAST__*` environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.to_path_buf()).format(::config::FileFormat::Toml))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that parse but cannot be used
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&self.auth.token_ttl_hours) {
            return Err(Error::Config(format!(
                "auth.token_ttl_hours must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_HOURS, self.auth.token_ttl_hours
            )));
        }
        if !(1..=MAX_RESET_TOKEN_TTL_MINUTES).contains(&self.auth.reset_token_ttl_minutes) {
            return Err(Error::Config(format!(
                "auth.reset_token_ttl_minutes must be between 1 and {}, got {}",
                MAX_RESET_TOKEN_TTL_MINUTES, self.auth.reset_token_ttl_minutes
            )));
        }
        Ok(())
    }

    /// Load configuration from `MAILCAST_CONFIG` or the default locations
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Self::from_file(Path::new(&path));
        }

        let paths = [
            PathBuf::from("./config.toml"),
            PathBuf::from("/etc/mailcast/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(Error::Config("No configuration file found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let server = ServerConfig::default();
        assert_eq!(server.bind_address, "0.0.0.0:8080");

        let mail = MailConfig::default();
        assert_eq!(mail.smtp_port, 587);
        assert!(mail.use_starttls);

        assert!(!CacheConfig::default().enabled);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[server]
base_url = "https://mail.example.com"

[database]
url = "postgres://localhost/mailcast"

[mail]
from_address = "robot@example.com"
smtp_host = "smtp.example.com"
smtp_port = 465
use_tls = true

[cache]
enabled = true
"#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.server.base_url, "https://mail.example.com");
        assert_eq!(config.database.url.as_deref(), Some("postgres://localhost/mailcast"));
        assert_eq!(config.mail.from_address, "robot@example.com");
        assert_eq!(config.mail.smtp_port, 465);
        assert!(config.cache.enabled);
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_token_ttls_must_be_positive_and_bounded() {
        for auth in [
            "token_ttl_hours = -1",
            "token_ttl_hours = 0",
            "token_ttl_hours = 9223372036854775807",
            "reset_token_ttl_minutes = -30",
            "reset_token_ttl_minutes = 100000000",
        ] {
            let toml = format!("[database]\n\n[auth]\n{}\n", auth);
            let err = Config::from_toml_str(&toml).unwrap_err();
            assert_eq!(err.code(), "CONFIG_ERROR", "{} was accepted", auth);
        }

        let config = Config::from_toml_str("[database]\n\n[auth]\ntoken_ttl_hours = 1\n").unwrap();
        assert_eq!(config.auth.token_ttl_hours, 1);
        assert_eq!(config.auth.reset_token_ttl_minutes, 60);
    }

    #[test]
    fn test_missing_database_section_is_rejected() {
        let err = Config::from_toml_str("[cache]\nenabled = true\n").unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
