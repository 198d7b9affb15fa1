//! Customer memo operations
//!
//! Every memo lookup is scoped by `(memo id, customer id)` so a caller acting
//! on one customer can never read through to another customer's memo.

use super::accounts::{customer_exists, Manager};
use crate::db::{now_timestamp, parse_timestamp, Database};
use crate::error::{CoreError, Result};
use crate::validation::MemoInput;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A free-text note a manager attached to a customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub id: i64,
    /// Owning customer id
    pub customer: i64,
    /// Authoring manager id
    pub manager: i64,
    pub content: String,
    #[serde(serialize_with = "crate::db::serialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// One page of a customer's memos, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoPage {
    pub data: Vec<Memo>,
    /// Total memos the customer has, regardless of paging
    pub total: i64,
}

/// Optional paging for list requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Paging {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

const MEMO_COLUMNS: &str = "id, customer_id, manager_id, content, created_at";

fn row_to_memo(row: &rusqlite::Row<'_>) -> rusqlite::Result<Memo> {
    let created_at: String = row.get(4)?;
    Ok(Memo {
        id: row.get(0)?,
        customer: row.get(1)?,
        manager: row.get(2)?,
        content: row.get(3)?,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

fn find_memo(conn: &Connection, customer_id: i64, memo_id: i64) -> Result<Option<Memo>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM customer_memos WHERE id = ? AND customer_id = ?",
                MEMO_COLUMNS
            ),
            [memo_id, customer_id],
            row_to_memo,
        )
        .optional()?)
}

fn memo_not_found(memo_id: i64) -> CoreError {
    CoreError::NotFound("Memo", memo_id.to_string())
}

/// Memo service backing the HTTP endpoints
pub struct MemoHandler {
    db: Arc<Database>,
}

impl MemoHandler {
    pub fn new(db: Arc<Database>) -> Self {
        MemoHandler { db }
    }

    /// List a customer's memos, newest first.
    ///
    /// Unknown customers simply have no memos.
    pub async fn list(&self, customer_id: i64, paging: Paging) -> Result<MemoPage> {
        // SQLite treats a negative LIMIT as "no limit"
        let limit = paging.limit.filter(|l| *l >= 0).unwrap_or(-1);
        let offset = paging.offset.filter(|o| *o >= 0).unwrap_or(0);

        self.db
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM customer_memos
                     WHERE customer_id = ?
                     ORDER BY created_at DESC, id DESC
                     LIMIT ? OFFSET ?",
                    MEMO_COLUMNS
                ))?;

                let data = stmt
                    .query_map([customer_id, limit, offset], row_to_memo)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;

                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM customer_memos WHERE customer_id = ?",
                    [customer_id],
                    |row| row.get(0),
                )?;

                Ok(MemoPage { data, total })
            })
            .await
    }

    /// Attach a new memo to an existing customer, authored by `manager`
    pub async fn create(&self, customer_id: i64, manager: &Manager, input: MemoInput) -> Result<Memo> {
        let manager_id = manager.id;

        let memo = self
            .db
            .with_tx(move |tx| {
                if !customer_exists(tx, customer_id)? {
                    return Err(CoreError::NotFound("Customer", customer_id.to_string()));
                }

                tx.execute(
                    "INSERT INTO customer_memos (customer_id, manager_id, content, created_at)
                     VALUES (?, ?, ?, ?)",
                    params![customer_id, manager_id, input.content, now_timestamp()],
                )?;

                let id = tx.last_insert_rowid();
                find_memo(tx, customer_id, id)?.ok_or_else(|| memo_not_found(id))
            })
            .await?;

        tracing::info!(
            memo_id = memo.id,
            customer_id,
            manager_id,
            "Created customer memo"
        );
        Ok(memo)
    }

    /// Replace a memo's content. Customer, manager and creation time are kept.
    pub async fn update(&self, customer_id: i64, memo_id: i64, input: MemoInput) -> Result<Memo> {
        let memo = self
            .db
            .with_tx(move |tx| {
                let changed = tx.execute(
                    "UPDATE customer_memos SET content = ? WHERE id = ? AND customer_id = ?",
                    params![input.content, memo_id, customer_id],
                )?;
                if changed == 0 {
                    return Err(memo_not_found(memo_id));
                }

                find_memo(tx, customer_id, memo_id)?.ok_or_else(|| memo_not_found(memo_id))
            })
            .await?;

        tracing::info!(memo_id, customer_id, "Updated customer memo");
        Ok(memo)
    }

    /// Permanently remove a memo
    pub async fn delete(&self, customer_id: i64, memo_id: i64) -> Result<()> {
        self.db
            .with_tx(move |tx| {
                let removed = tx.execute(
                    "DELETE FROM customer_memos WHERE id = ? AND customer_id = ?",
                    [memo_id, customer_id],
                )?;
                if removed == 0 {
                    return Err(memo_not_found(memo_id));
                }
                Ok(())
            })
            .await?;

        tracing::info!(memo_id, customer_id, "Deleted customer memo");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::accounts::{AccountHandler, Role};

    struct Fixture {
        db: Arc<Database>,
        memos: MemoHandler,
        manager: Manager,
        customer: i64,
        other_customer: i64,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let accounts = AccountHandler::new(db.clone());
        let manager = accounts
            .create_manager("Sato", Role::Customer)
            .await
            .unwrap()
            .manager;
        let customer = accounts.create_customer("Acme").await.unwrap().id;
        let other_customer = accounts.create_customer("Globex").await.unwrap().id;

        Fixture {
            memos: MemoHandler::new(db.clone()),
            db,
            manager,
            customer,
            other_customer,
        }
    }

    fn input(content: &str) -> MemoInput {
        MemoInput {
            content: content.to_string(),
        }
    }

    #[test]
    fn test_memo_serializes_stored_timestamp_form() {
        let memo = Memo {
            id: 1,
            customer: 2,
            manager: 3,
            content: "on the hour".to_string(),
            created_at: parse_timestamp(0, "2026-10-16T09:00:00.000000Z").unwrap(),
        };
        let value = serde_json::to_value(&memo).unwrap();
        assert_eq!(value["created_at"], "2026-10-16T09:00:00.000000Z");
    }

    async fn row_count(db: &Arc<Database>) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM customer_memos", [], |row| row.get(0))?)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_empty_customer() {
        let f = fixture().await;
        let page = f.memos.list(f.customer, Paging::default()).await.unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total, 0);

        // Unknown customers list as empty rather than failing
        let page = f.memos.list(9999, Paging::default()).await.unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_create_persists_memo() {
        let f = fixture().await;
        let before = Utc::now();
        let memo = f
            .memos
            .create(f.customer, &f.manager, input("Initial note"))
            .await
            .unwrap();

        assert_eq!(memo.content, "Initial note");
        assert_eq!(memo.customer, f.customer);
        assert_eq!(memo.manager, f.manager.id);
        assert!(memo.created_at >= before - chrono::Duration::milliseconds(1));
        assert_eq!(row_count(&f.db).await, 1);
    }

    #[tokio::test]
    async fn test_create_twice_makes_two_records() {
        let f = fixture().await;
        let a = f.memos.create(f.customer, &f.manager, input("same")).await.unwrap();
        let b = f.memos.create(f.customer, &f.manager, input("same")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(row_count(&f.db).await, 2);
    }

    #[tokio::test]
    async fn test_create_for_missing_customer_is_not_found() {
        let f = fixture().await;
        let err = f
            .memos
            .create(9999, &f.manager, input("orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound("Customer", _)));
        assert_eq!(row_count(&f.db).await, 0);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let f = fixture().await;
        let first = f.memos.create(f.customer, &f.manager, input("first")).await.unwrap();
        let second = f.memos.create(f.customer, &f.manager, input("second")).await.unwrap();
        let third = f.memos.create(f.customer, &f.manager, input("third")).await.unwrap();
        f.memos
            .create(f.other_customer, &f.manager, input("elsewhere"))
            .await
            .unwrap();

        let page = f.memos.list(f.customer, Paging::default()).await.unwrap();
        let ids: Vec<i64> = page.data.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_list_paging_keeps_total() {
        let f = fixture().await;
        for i in 0..5 {
            f.memos
                .create(f.customer, &f.manager, input(&format!("memo {}", i)))
                .await
                .unwrap();
        }

        let page = f
            .memos
            .list(
                f.customer,
                Paging {
                    limit: Some(2),
                    offset: Some(1),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        let contents: Vec<&str> = page.data.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["memo 3", "memo 2"]);
    }

    #[tokio::test]
    async fn test_update_changes_only_content() {
        let f = fixture().await;
        let original = f
            .memos
            .create(f.customer, &f.manager, input("Initial note"))
            .await
            .unwrap();

        let updated = f
            .memos
            .update(f.customer, original.id, input("Revised"))
            .await
            .unwrap();

        assert_eq!(updated.content, "Revised");
        assert_eq!(updated.id, original.id);
        assert_eq!(updated.customer, original.customer);
        assert_eq!(updated.manager, original.manager);
        assert_eq!(updated.created_at, original.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_memo_is_not_found() {
        let f = fixture().await;
        let err = f.memos.update(f.customer, 77, input("x")).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound("Memo", _)));
    }

    #[tokio::test]
    async fn test_cross_customer_isolation() {
        let f = fixture().await;
        let memo = f
            .memos
            .create(f.other_customer, &f.manager, input("Globex only"))
            .await
            .unwrap();

        let err = f
            .memos
            .update(f.customer, memo.id, input("hijacked"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound("Memo", _)));

        let err = f.memos.delete(f.customer, memo.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound("Memo", _)));

        let page = f
            .memos
            .list(f.other_customer, Paging::default())
            .await
            .unwrap();
        assert_eq!(page.data, vec![memo]);
    }

    #[tokio::test]
    async fn test_delete_then_delete_again() {
        let f = fixture().await;
        let memo = f.memos.create(f.customer, &f.manager, input("bye")).await.unwrap();

        f.memos.delete(f.customer, memo.id).await.unwrap();
        let page = f.memos.list(f.customer, Paging::default()).await.unwrap();
        assert!(page.data.iter().all(|m| m.id != memo.id));
        assert_eq!(page.total, 0);

        let err = f.memos.delete(f.customer, memo.id).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound("Memo", _)));
    }
}
