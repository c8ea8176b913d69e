//! # Server Configuration
//!
//! Loads `gstbill.toml`, then applies `GSTBILL_*` environment overrides.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     GSTBILL_PORT=9000                                                  │
//! │     GSTBILL_JWT_SECRET=...                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path> or GSTBILL_CONFIG                                  │
//! │     ~/.config/gstbill/gstbill.toml (Linux)                             │
//! │     ~/Library/Application Support/in.gstbill.gstbill/gstbill.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     sqlite at ./gstbill.db, IST, clamp stock at zero                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [storage]
//! backend = "sqlite"          # sqlite | memory
//! database_path = "gstbill.db"
//! max_connections = 5
//! min_connections = 1
//! connect_timeout_secs = 30     # wait for a free pooled connection
//! busy_timeout_ms = 5000        # wait on another writer's lock
//!
//! [billing]
//! stock_policy = "clamp_at_zero"  # clamp_at_zero | allow_negative
//! utc_offset_minutes = 330
//! max_commit_attempts = 3
//!
//! [shop]                      # seeds Settings on first start only
//! state_code = "27"
//! state_name = "Maharashtra"
//! invoice_prefix = "INV"
//! shop_name = "My Shop"
//!
//! [auth]
//! jwt_secret = "..."
//! allow_unapproved = false
//!
//! [logging]
//! filter = "info,gstbill=debug,sqlx=warn"
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use gstbill_core::{Settings, StockPolicy};
use gstbill_db::service::{offset_from_minutes, DEFAULT_COMMIT_ATTEMPTS, IST_OFFSET_MINUTES};
use gstbill_db::{DbConfig, ServiceOptions};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "GSTBILL_CONFIG";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available")]
    NoPath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Storage Backend
// =============================================================================

/// Which `BillingStore` the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite file with WAL; the production backend.
    #[default]
    Sqlite,
    /// Process-local; everything is lost on exit.
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Sqlite => write!(f, "sqlite"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid(format!(
                "unknown storage backend '{}', expected sqlite or memory",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSection {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("gstbill.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_path: default_database_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout_secs(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StorageSection {
    /// Pool settings for the SQLite backend.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingSection {
    #[serde(default)]
    pub stock_policy: StockPolicy,
    /// Shop time zone, minutes east of UTC.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_max_commit_attempts")]
    pub max_commit_attempts: u32,
}

fn default_utc_offset_minutes() -> i32 {
    IST_OFFSET_MINUTES
}

fn default_max_commit_attempts() -> u32 {
    DEFAULT_COMMIT_ATTEMPTS
}

impl Default for BillingSection {
    fn default() -> Self {
        Self {
            stock_policy: StockPolicy::default(),
            utc_offset_minutes: default_utc_offset_minutes(),
            max_commit_attempts: default_max_commit_attempts(),
        }
    }
}

/// Seeds the settings row the first time the server starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopSection {
    #[serde(default = "default_state_code")]
    pub state_code: String,
    #[serde(default = "default_state_name")]
    pub state_name: String,
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,
    #[serde(default = "default_shop_name")]
    pub shop_name: String,
}

fn default_state_code() -> String {
    "27".to_string()
}

fn default_state_name() -> String {
    "Maharashtra".to_string()
}

fn default_invoice_prefix() -> String {
    gstbill_core::DEFAULT_INVOICE_PREFIX.to_string()
}

fn default_shop_name() -> String {
    gstbill_core::DEFAULT_SHOP_NAME.to_string()
}

impl Default for ShopSection {
    fn default() -> Self {
        Self {
            state_code: default_state_code(),
            state_name: default_state_name(),
            invoice_prefix: default_invoice_prefix(),
            shop_name: default_shop_name(),
        }
    }
}

impl ShopSection {
    /// The settings row to create when none exists.
    pub fn initial_settings(&self, now: DateTime<Utc>) -> Settings {
        let mut settings = Settings::new(&self.state_code, &self.state_name, now);
        settings.shop_name = self.shop_name.clone();
        settings.invoice_prefix = self.invoice_prefix.clone();
        settings
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSection {
    /// HS256 secret shared with the identity provider.
    #[serde(default)]
    pub jwt_secret: String,
    /// Accept verified tokens whose email is not on the allowlist.
    #[serde(default)]
    pub allow_unapproved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info,gstbill=debug,sqlx=warn".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Server Config
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub billing: BillingSection,
    #[serde(default)]
    pub shop: ShopSection,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl ServerConfig {
    /// Loads configuration from file and environment.
    ///
    /// A missing file is not an error; defaults apply. The result is
    /// validated after environment overrides.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(default_config_path) {
            if path.exists() {
                info!(?path, "Loading server config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load server config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(default_config_path)
            .ok_or(ConfigError::NoPath)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Server config saved");
        Ok(path)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret must be set (or GSTBILL_JWT_SECRET)".into(),
            ));
        }

        if offset_from_minutes(self.billing.utc_offset_minutes).is_none() {
            return Err(ConfigError::Invalid(format!(
                "billing.utc_offset_minutes out of range: {}",
                self.billing.utc_offset_minutes
            )));
        }

        if self.billing.max_commit_attempts == 0 {
            return Err(ConfigError::Invalid(
                "billing.max_commit_attempts must be greater than 0".into(),
            ));
        }

        if self.storage.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "storage.max_connections must be greater than 0".into(),
            ));
        }

        if self.storage.min_connections > self.storage.max_connections {
            return Err(ConfigError::Invalid(format!(
                "storage.min_connections ({}) exceeds max_connections ({})",
                self.storage.min_connections, self.storage.max_connections
            )));
        }

        if self.storage.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "storage.connect_timeout_secs must be greater than 0".into(),
            ));
        }

        gstbill_core::validation::validate_state_code(&self.shop.state_code)
            .map_err(|e| ConfigError::Invalid(format!("shop.{}", e)))?;

        gstbill_core::validation::validate_invoice_prefix(&self.shop.invoice_prefix)
            .map_err(|e| ConfigError::Invalid(format!("shop.{}", e)))?;

        Ok(())
    }

    /// Billing options for the service.
    pub fn service_options(&self) -> ConfigResult<ServiceOptions> {
        let utc_offset = offset_from_minutes(self.billing.utc_offset_minutes).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "billing.utc_offset_minutes out of range: {}",
                self.billing.utc_offset_minutes
            ))
        })?;

        Ok(ServiceOptions {
            stock_policy: self.billing.stock_policy,
            utc_offset,
            max_commit_attempts: self.billing.max_commit_attempts,
        })
    }

    /// `bind_addr:port`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.port)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("GSTBILL_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Ok(port) = std::env::var("GSTBILL_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(port = %port, "Ignoring invalid GSTBILL_PORT"),
            }
        }

        if let Ok(backend) = std::env::var("GSTBILL_STORAGE_BACKEND") {
            match backend.parse() {
                Ok(parsed) => {
                    debug!(backend = %backend, "Overriding storage backend from environment");
                    self.storage.backend = parsed;
                }
                Err(e) => warn!(error = %e, "Ignoring GSTBILL_STORAGE_BACKEND"),
            }
        }

        if let Ok(path) = std::env::var("GSTBILL_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.storage.database_path = PathBuf::from(path);
        }

        if let Ok(policy) = std::env::var("GSTBILL_STOCK_POLICY") {
            match policy.parse() {
                Ok(parsed) => self.billing.stock_policy = parsed,
                Err(_) => warn!(policy = %policy, "Unknown stock policy in environment"),
            }
        }

        if let Ok(minutes) = std::env::var("GSTBILL_UTC_OFFSET_MINUTES") {
            if let Ok(m) = minutes.parse::<i32>() {
                self.billing.utc_offset_minutes = m;
            }
        }

        if let Ok(secret) = std::env::var("GSTBILL_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }

        if let Ok(flag) = std::env::var("GSTBILL_ALLOW_UNAPPROVED") {
            self.auth.allow_unapproved = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Ok(filter) = std::env::var("GSTBILL_LOG") {
            self.logging.filter = filter;
        }
    }
}

/// `gstbill.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("in", "gstbill", "gstbill")
        .map(|dirs| dirs.config_dir().join("gstbill.toml"))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = "test-secret-value".to_string();
        config
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("sqlite".parse::<StorageBackend>().unwrap(), StorageBackend::Sqlite);
        assert_eq!("Memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert!("postgres".parse::<StorageBackend>().is_err());
        assert_eq!(StorageBackend::Memory.to_string(), "memory");
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.billing.utc_offset_minutes, 330);
        assert_eq!(config.billing.max_commit_attempts, 3);
        assert_eq!(config.billing.stock_policy, StockPolicy::ClampAtZero);
        assert_eq!(config.shop.state_code, "27");
        assert_eq!(config.shop.invoice_prefix, "INV");
        assert!(!config.auth.allow_unapproved);
        assert_eq!(config.logging.filter, "info,gstbill=debug,sqlx=warn");
    }

    #[test]
    fn test_validation() {
        // no secret
        assert!(ServerConfig::default().validate().is_err());

        let mut config = valid();
        assert!(config.validate().is_ok());

        config.billing.utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.billing.max_commit_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.shop.state_code = "ABC".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [storage]
            backend = "memory"

            [billing]
            stock_policy = "allow_negative"

            [auth]
            jwt_secret = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.max_connections, 5);
        assert_eq!(config.storage.busy_timeout_ms, 5_000);
        assert_eq!(config.billing.stock_policy, StockPolicy::AllowNegative);
        assert_eq!(config.billing.utc_offset_minutes, 330);
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_storage_pool_settings() {
        let config: ServerConfig = toml::from_str(
            r#"
            [storage]
            database_path = "/var/lib/gstbill/shop.db"
            max_connections = 8
            min_connections = 2
            connect_timeout_secs = 10
            busy_timeout_ms = 2500

            [auth]
            jwt_secret = "abc"
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        let db = config.storage.db_config();
        assert_eq!(db.database_path, PathBuf::from("/var/lib/gstbill/shop.db"));
        assert_eq!(db.max_connections, 8);
        assert_eq!(db.min_connections, 2);
        assert_eq!(db.connect_timeout, Duration::from_secs(10));
        assert_eq!(db.busy_timeout, Duration::from_millis(2500));

        let mut config = valid();
        config.storage.min_connections = config.storage.max_connections + 1;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.storage.connect_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_service_options() {
        let mut config = valid();
        config.billing.utc_offset_minutes = -300;
        let options = config.service_options().unwrap();
        assert_eq!(options.utc_offset.local_minus_utc(), -300 * 60);
        assert_eq!(options.max_commit_attempts, 3);
    }

    #[test]
    fn test_initial_settings() {
        let mut config = valid();
        config.shop.shop_name = "Sharma General Store".to_string();
        config.shop.invoice_prefix = "SGS".to_string();
        let settings = config.shop.initial_settings(Utc::now());
        assert_eq!(settings.shop_name, "Sharma General Store");
        assert_eq!(settings.invoice_prefix, "SGS");
        assert_eq!(settings.state_code, "27");
        assert_eq!(settings.next_invoice_number, 1);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("gstbill-config-{}", uuid::Uuid::new_v4()))
            .join("gstbill.toml");

        let mut config = valid();
        config.server.port = 9191;
        config.storage.backend = StorageBackend::Memory;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[server]"));
        assert!(contents.contains("[billing]"));

        let loaded = ServerConfig::load(Some(path.clone())).unwrap();
        assert_eq!(loaded.server.port, 9191);
        assert_eq!(loaded.storage.backend, StorageBackend::Memory);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_or_default_on_bad_file() {
        let path = std::env::temp_dir().join(format!("gstbill-bad-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[server\nport = ").unwrap();

        let config = ServerConfig::load_or_default(Some(path.clone()));
        assert_eq!(config.server.port, 8080);

        let _ = std::fs::remove_file(path);
    }
}
