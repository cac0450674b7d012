//! # Account Repository
//!
//! Stores each account as one JSON document plus the columns it is queried
//! by.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save(account, new settlements)                                        │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │   ├── UPDATE accounts ... WHERE id = ? AND version = ?  (0 rows: stale)│
//! │   ├── re-claim account_tables (none once terminal)                     │
//! │   ├── INSERT INTO settlements ...  (each new settlement)               │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any failure rolls everything back: no half-recorded payment.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::settlement;
use mesa_core::{Account, Settlement};

/// Repository for account documents.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    /// Inserts a freshly opened account and claims its tables.
    ///
    /// Fails with `UniqueViolation` when a table already belongs to another
    /// active account of the tenant.
    pub async fn insert(&self, account: &Account) -> DbResult<()> {
        debug!(id = %account.id, tenant_id = %account.tenant_id, "Inserting account");

        let document = serde_json::to_string(account)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, tenant_id, status, shift_id, waiter_id,
                total_cents, version, document, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10
            )
            "#,
        )
        .bind(&account.id)
        .bind(&account.tenant_id)
        .bind(account.status.as_str())
        .bind(&account.shift_id)
        .bind(&account.waiter.id)
        .bind(account.total.cents())
        .bind(account.version)
        .bind(document)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await?;

        claim_tables(&mut *tx, account).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Gets an account by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Account>> {
        let document: Option<String> =
            sqlx::query_scalar("SELECT document FROM accounts WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        document
            .map(|doc| serde_json::from_str(&doc).map_err(DbError::from))
            .transpose()
    }

    /// Non-terminal accounts of a tenant, oldest first.
    pub async fn list_active(&self, tenant_id: &str) -> DbResult<Vec<Account>> {
        let documents: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT document
            FROM accounts
            WHERE tenant_id = ?1
              AND status IN ('open', 'closed_pending', 'split_pending')
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).map_err(DbError::from))
            .collect()
    }

    /// The active account currently holding a table, if any.
    pub async fn table_occupant(&self, tenant_id: &str, table_id: &str) -> DbResult<Option<String>> {
        let account_id: Option<String> = sqlx::query_scalar(
            "SELECT account_id FROM account_tables WHERE tenant_id = ?1 AND table_id = ?2",
        )
        .bind(tenant_id)
        .bind(table_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account_id)
    }

    /// Writes the account back if nobody else wrote it since it was read,
    /// appending `new_settlements` to the ledger in the same transaction.
    ///
    /// On success `account.version` is the stored version; on failure it is
    /// left as it was.
    pub async fn save(&self, account: &mut Account, new_settlements: &[Settlement]) -> DbResult<()> {
        let expected = account.version;
        account.version = expected + 1;

        let result = self.write(account, expected, new_settlements).await;
        if result.is_err() {
            account.version = expected;
        }
        result
    }

    async fn write(
        &self,
        account: &Account,
        expected: i64,
        new_settlements: &[Settlement],
    ) -> DbResult<()> {
        debug!(
            id = %account.id,
            status = %account.status,
            version = account.version,
            settlements = new_settlements.len(),
            "Saving account"
        );

        let document = serde_json::to_string(account)?;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                status = ?3,
                shift_id = ?4,
                total_cents = ?5,
                version = ?6,
                document = ?7,
                updated_at = ?8
            WHERE id = ?1 AND version = ?2
            "#,
        )
        .bind(&account.id)
        .bind(expected)
        .bind(account.status.as_str())
        .bind(&account.shift_id)
        .bind(account.total.cents())
        .bind(account.version)
        .bind(document)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::StaleWrite {
                entity: "Account".to_string(),
                id: account.id.clone(),
                expected,
            });
        }

        claim_tables(&mut *tx, account).await?;
        for settlement in new_settlements {
            settlement::insert_in(&mut *tx, settlement).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Replaces the account's table claims. Terminal accounts hold none.
async fn claim_tables(conn: &mut SqliteConnection, account: &Account) -> DbResult<()> {
    sqlx::query("DELETE FROM account_tables WHERE account_id = ?1")
        .bind(&account.id)
        .execute(&mut *conn)
        .await?;

    if account.status.is_terminal() {
        return Ok(());
    }

    for table in &account.tables {
        let holder: Option<String> = sqlx::query_scalar(
            "SELECT account_id FROM account_tables WHERE tenant_id = ?1 AND table_id = ?2",
        )
        .bind(&account.tenant_id)
        .bind(&table.id)
        .fetch_optional(&mut *conn)
        .await?;

        if holder.is_some() {
            return Err(DbError::duplicate("table", &table.label));
        }

        sqlx::query("INSERT INTO account_tables (tenant_id, table_id, account_id) VALUES (?1, ?2, ?3)")
            .bind(&account.tenant_id)
            .bind(&table.id)
            .bind(&account.id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
