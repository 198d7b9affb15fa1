//! Configuration management for the Memo Service
//!
//! Loads settings from TOML file at ~/.memo-service/config.toml

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Cross-origin settings for the web client
    #[serde(default)]
    pub cors: CorsConfig,

    /// Memo limits
    #[serde(default)]
    pub memo: MemoConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Data directory (defaults to ~/.memo-service)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".memo-service"))
        .unwrap_or_else(|| PathBuf::from(".memo-service"))
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port (default: 8420)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Server host (default: 127.0.0.1 - localhost only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8420
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
            host: default_host(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Origins allowed to call the API. Empty mirrors any requesting origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// Whether browsers may send credentials (cookies, Authorization)
    #[serde(default = "default_true")]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        CorsConfig {
            allowed_origins: vec![],
            allow_credentials: true,
        }
    }
}

impl CorsConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty()
    }
}

/// Memo limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoConfig {
    /// Maximum memo length in characters
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
}

fn default_max_content_length() -> usize {
    10_000
}

impl Default for MemoConfig {
    fn default() -> Self {
        MemoConfig {
            max_content_length: default_max_content_length(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotated log files (stdout only when unset)
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            dir: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            cors: CorsConfig::default(),
            memo: MemoConfig::default(),
            logging: LoggingConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path.as_ref());

        if !expanded_path.exists() {
            return Err(CoreError::Config(format!(
                "Configuration file not found: {}",
                expanded_path.display()
            )));
        }

        let content = std::fs::read_to_string(&expanded_path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .map(|p| p.join(".memo-service").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".memo-service/config.toml"))
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.memo.max_content_length == 0 {
            return Err(CoreError::Config(
                "memo.max_content_length must be greater than 0".to_string(),
            ));
        }
        if self.server.max_body_bytes == 0 {
            return Err(CoreError::Config(
                "server.max_body_bytes must be greater than 0".to_string(),
            ));
        }
        if let Some(origin) = self
            .cors
            .allowed_origins
            .iter()
            .find(|o| axum::http::HeaderValue::from_str(o).is_err())
        {
            return Err(CoreError::Config(format!(
                "cors.allowed_origins contains an invalid origin: {}",
                origin
            )));
        }
        Ok(())
    }

    /// Get the data directory, expanding ~ if present
    pub fn data_dir(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    /// Path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("memo-service.db")
    }

    /// Get the expanded log directory, if file logging is enabled
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.logging.dir.as_deref().map(expand_path)
    }

    /// Get the server socket address
    pub fn server_addr(&self) -> SocketAddr {
        use std::net::ToSocketAddrs;

        format!("{}:{}", self.server.host, self.server.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], self.server.port)))
    }

    /// Get list of active environment overrides
    pub fn active_env_overrides() -> Vec<String> {
        [
            "MEMO_SERVER_HOST",
            "MEMO_SERVER_PORT",
            "MEMO_DATA_DIR",
            "MEMO_CORS_ORIGINS",
            "MEMO_LOG_LEVEL",
        ]
        .iter()
        .filter(|name| std::env::var(name).is_ok())
        .map(|name| name.to_string())
        .collect()
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("MEMO_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("MEMO_SERVER_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid MEMO_SERVER_PORT: {}", port),
            }
        }
        if let Some(data_dir) = lookup("MEMO_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Some(origins) = lookup("MEMO_CORS_ORIGINS") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(level) = lookup("MEMO_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Create a default configuration file at the given path
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let content = r#"# Memo Service Configuration

# Where the SQLite database lives
data_dir = "~/.memo-service"

[server]
# Port to listen on (default: 8420)
port = 8420

# Host to bind to
# "127.0.0.1" = localhost only (recommended behind a reverse proxy)
# "0.0.0.0" = all interfaces
host = "127.0.0.1"

# Largest accepted request body (default: 10 MiB)
max_body_bytes = 10485760

[cors]
# Origins the web client is served from. Leave empty to accept any origin.
# allowed_origins = ["https://crm.example.com"]
allowed_origins = []
allow_credentials = true

[memo]
# Maximum memo length in characters
max_content_length = 10000

[logging]
# Used when RUST_LOG is not set
level = "info"
# Also write daily-rotated log files here
# dir = "~/.memo-service/logs"
"#;

        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Expand ~ to home directory in paths
pub fn expand_path(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
