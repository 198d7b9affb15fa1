//! Memo Service - customer memo backend for the customer-management application
//!
//! This crate provides:
//! - SQLite storage for customer memos
//! - An authorization gate for customer-facing staff
//! - Payload validation with field-level errors
//! - HTTP API for listing, creating, updating and deleting memos
//!
//! # Usage
//!
//! As a library:
//! ```ignore
//! use memo_service::{Config, Core};
//!
//! let config = Config::from_file("~/.memo-service/config.toml").unwrap();
//! let core = Core::new(config).unwrap();
//! // core.start_api_server().await.unwrap();
//! ```
//!
//! As a standalone server (CLI):
//! ```text
//! memo-service --config ~/.memo-service/config.toml
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod validation;

// Re-export main types for convenience
pub use config::Config;
pub use db::Database;
pub use error::{CoreError, Result};

use handlers::{AccountHandler, MemoHandler};
use std::sync::Arc;

/// Core service that owns configuration and storage
pub struct Core {
    /// Configuration
    pub config: Config,

    /// Database connection
    pub db: Arc<Database>,
}

impl Core {
    /// Create a new Core instance with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let db = Database::new(config.database_path())?;
        Ok(Core {
            config,
            db: Arc::new(db),
        })
    }

    /// Create a Core instance with an existing database
    pub fn with_database(config: Config, db: Arc<Database>) -> Self {
        Core { config, db }
    }

    /// Start the HTTP API server (blocks until shutdown)
    pub async fn start_api_server(&self) -> Result<()> {
        let addr = self.config.server_addr();
        tracing::info!("Starting API server on {}", addr);
        api::serve(addr, self.db.clone(), &self.config).await
    }

    /// Memo operations over this core's database
    pub fn memos(&self) -> MemoHandler {
        MemoHandler::new(self.db.clone())
    }

    /// Customer and manager operations over this core's database
    pub fn accounts(&self) -> AccountHandler {
        AccountHandler::new(self.db.clone())
    }

    /// Get a reference to the database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}
