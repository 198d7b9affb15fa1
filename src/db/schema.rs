//! SQLite schema for the Memo Service
//!
//! Customers and managers are owned by the wider customer-management
//! application; only the columns memos and the authorization gate need are kept here.

use rusqlite::{Connection, Result};

/// Initialize the database with required tables
pub fn init_db(conn: &Connection) -> Result<()> {
    // Enable foreign key enforcement for CASCADE deletes
    conn.execute_batch("PRAGMA foreign_keys = ON")?;

    // Customers that memos are attached to
    conn.execute(
        "CREATE TABLE IF NOT EXISTS customers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // Staff accounts; the bearer token identifies the caller
    conn.execute(
        "CREATE TABLE IF NOT EXISTS managers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('owner', 'customer')),
            api_token TEXT NOT NULL UNIQUE,
            is_active BOOLEAN NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS customer_memos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            customer_id INTEGER NOT NULL,
            manager_id INTEGER NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (customer_id) REFERENCES customers(id) ON DELETE CASCADE,
            FOREIGN KEY (manager_id) REFERENCES managers(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_customer_memos_customer_created
            ON customer_memos(customer_id, created_at DESC)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_init_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();

        let tables = table_names(&conn);
        for expected in ["customers", "managers", "customer_memos"] {
            assert!(tables.iter().any(|t| t == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_memo_requires_existing_customer() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();

        conn.execute(
            "INSERT INTO managers (name, role, api_token, created_at)
             VALUES ('Sato', 'customer', 'tok', '2026-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();

        let orphan = conn.execute(
            "INSERT INTO customer_memos (customer_id, manager_id, content, created_at)
             VALUES (999, 1, 'orphan', '2026-01-01T00:00:00.000000Z')",
            [],
        );
        assert!(orphan.is_err());
    }

    #[test]
    fn test_role_is_constrained() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO managers (name, role, api_token, created_at)
             VALUES ('Eve', 'superuser', 'tok', '2026-01-01T00:00:00.000000Z')",
            [],
        );
        assert!(result.is_err());
    }
}
