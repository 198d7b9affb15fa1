//! Customer and manager records
//!
//! The customer-management application owns these entities. The memo service
//! keeps just enough of them to enforce memo ownership and to identify callers.

use crate::db::{now_timestamp, parse_timestamp, Database};
use crate::error::{CoreError, Result};
use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A customer that memos can be attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    #[serde(serialize_with = "crate::db::serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Staff account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Platform operator
    Owner,
    /// Staff member of a customer organisation
    Customer,
}

/// Capabilities checked by the authorization gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Work with customer records and their memos
    CustomerFacing,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Customer => "customer",
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::CustomerFacing => matches!(self, Role::Customer),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "owner" => Ok(Role::Owner),
            "customer" => Ok(Role::Customer),
            other => Err(CoreError::Config(format!("Unknown role: {}", other))),
        }
    }
}

/// An authenticated staff account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Manager {
    pub id: i64,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(serialize_with = "crate::db::serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// A newly provisioned manager and the bearer token it authenticates with
#[derive(Debug, Clone)]
pub struct ProvisionedManager {
    pub manager: Manager,
    pub token: String,
}

fn row_to_customer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Customer> {
    let created_at: String = row.get(2)?;
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_timestamp(2, &created_at)?,
    })
}

fn row_to_manager(row: &rusqlite::Row<'_>) -> rusqlite::Result<Manager> {
    let role: String = row.get(2)?;
    let created_at: String = row.get(4)?;
    Ok(Manager {
        id: row.get(0)?,
        name: row.get(1)?,
        role: role.parse::<Role>().map_err(|e: CoreError| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())),
            )
        })?,
        is_active: row.get(3)?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

/// Whether a customer row exists
pub fn customer_exists(conn: &Connection, customer_id: i64) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM customers WHERE id = ?)",
        [customer_id],
        |row| row.get(0),
    )?)
}

/// Account operations used by provisioning and the authorization gate
pub struct AccountHandler {
    db: Arc<Database>,
}

impl AccountHandler {
    pub fn new(db: Arc<Database>) -> Self {
        AccountHandler { db }
    }

    pub async fn create_customer(&self, name: &str) -> Result<Customer> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationErrors::single("name", "This field may not be blank.").into());
        }

        self.db
            .with_tx(move |tx| {
                tx.execute(
                    "INSERT INTO customers (name, created_at) VALUES (?, ?)",
                    params![name, now_timestamp()],
                )?;
                let id = tx.last_insert_rowid();
                Ok(tx.query_row(
                    "SELECT id, name, created_at FROM customers WHERE id = ?",
                    [id],
                    row_to_customer,
                )?)
            })
            .await
    }

    pub async fn get_customer(&self, customer_id: i64) -> Result<Option<Customer>> {
        self.db
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, name, created_at FROM customers WHERE id = ?",
                        [customer_id],
                        row_to_customer,
                    )
                    .optional()?)
            })
            .await
    }

    /// Create a manager with a freshly generated bearer token
    pub async fn create_manager(&self, name: &str, role: Role) -> Result<ProvisionedManager> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationErrors::single("name", "This field may not be blank.").into());
        }
        let token = uuid::Uuid::new_v4().simple().to_string();
        let token_clone = token.clone();

        let manager = self
            .db
            .with_tx(move |tx| {
                tx.execute(
                    "INSERT INTO managers (name, role, api_token, created_at) VALUES (?, ?, ?, ?)",
                    params![name, role.as_str(), token_clone, now_timestamp()],
                )?;
                let id = tx.last_insert_rowid();
                Ok(tx.query_row(
                    "SELECT id, name, role, is_active, created_at FROM managers WHERE id = ?",
                    [id],
                    row_to_manager,
                )?)
            })
            .await?;

        tracing::info!(manager_id = manager.id, role = %manager.role, "Provisioned manager");

        Ok(ProvisionedManager { manager, token })
    }

    /// Resolve a bearer token to an active manager
    pub async fn find_manager_by_token(&self, token: &str) -> Result<Option<Manager>> {
        let token = token.to_string();
        self.db
            .with_conn(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, name, role, is_active, created_at
                         FROM managers WHERE api_token = ? AND is_active = 1",
                        [token],
                        row_to_manager,
                    )
                    .optional()?)
            })
            .await
    }

    /// Revoke a manager's access; their token stops resolving
    pub async fn deactivate_manager(&self, manager_id: i64) -> Result<()> {
        let changed = self
            .db
            .with_tx(move |tx| {
                Ok(tx.execute(
                    "UPDATE managers SET is_active = 0 WHERE id = ?",
                    [manager_id],
                )?)
            })
            .await?;

        if changed == 0 {
            return Err(CoreError::NotFound("Manager", manager_id.to_string()));
        }
        Ok(())
    }
}
