//! # Settlement Repository
//!
//! The append-only payment ledger. Rows are inserted in the same
//! transaction that saves the account they belong to, and never updated
//! or deleted afterwards.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use mesa_core::Settlement;

/// Repository for the settlement ledger.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: SqlitePool,
}

impl SettlementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettlementRepository { pool }
    }

    /// Settlements of one account, oldest first.
    pub async fn list_for_account(&self, account_id: &str) -> DbResult<Vec<Settlement>> {
        let documents: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT document
            FROM settlements
            WHERE account_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        decode_all(documents)
    }

    /// Settlements recorded under a shift.
    pub async fn list_for_shift(&self, tenant_id: &str, shift_id: &str) -> DbResult<Vec<Settlement>> {
        debug!(tenant_id = %tenant_id, shift_id = %shift_id, "Loading shift settlements");

        let documents: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT document
            FROM settlements
            WHERE tenant_id = ?1 AND shift_id = ?2
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id)
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        decode_all(documents)
    }

    /// Settlements of a tenant in `[from, to)`.
    pub async fn list_between(
        &self,
        tenant_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Settlement>> {
        let documents: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT document
            FROM settlements
            WHERE tenant_id = ?1 AND created_at >= ?2 AND created_at < ?3
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        decode_all(documents)
    }
}

/// Appends one settlement inside the caller's transaction.
pub(crate) async fn insert_in(conn: &mut SqliteConnection, settlement: &Settlement) -> DbResult<()> {
    debug!(
        id = %settlement.id,
        account_id = %settlement.account_id,
        target = %settlement.target,
        total = %settlement.total_with_tip,
        "Recording settlement"
    );

    let document = serde_json::to_string(settlement)?;

    sqlx::query(
        r#"
        INSERT INTO settlements (
            id, account_id, tenant_id, shift_id, target, method,
            base_cents, discount_cents, amount_due_cents, tip_cents,
            total_cents, received_cents, change_cents,
            actor_id, document, created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6,
            ?7, ?8, ?9, ?10,
            ?11, ?12, ?13,
            ?14, ?15, ?16
        )
        "#,
    )
    .bind(&settlement.id)
    .bind(&settlement.account_id)
    .bind(&settlement.tenant_id)
    .bind(&settlement.shift_id)
    .bind(settlement.target.to_string())
    .bind(settlement.method.as_str())
    .bind(settlement.base_amount.cents())
    .bind(settlement.discount_applied.cents())
    .bind(settlement.amount_due.cents())
    .bind(settlement.tip.cents())
    .bind(settlement.total_with_tip.cents())
    .bind(settlement.received.cents())
    .bind(settlement.change.cents())
    .bind(&settlement.actor.id)
    .bind(document)
    .bind(settlement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn decode_all(documents: Vec<String>) -> DbResult<Vec<Settlement>> {
    documents
        .iter()
        .map(|doc| serde_json::from_str(doc).map_err(Into::into))
        .collect()
}
