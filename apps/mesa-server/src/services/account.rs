//! # Account Service
//!
//! Runs every account operation against storage.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. require_floor(role)        kitchen staff stop here                  │
//! │  2. locks.acquire(id)          one writer per account                   │
//! │  3. accounts().get(id)         freshest document, tenant-checked        │
//! │  4. core operation on it       rejection: nothing is written            │
//! │  5. accounts().save(..)        version check + new settlements, one tx  │
//! │  6. unlock                                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads (account, summary, bill, kitchen queue, stats) skip steps 1-2 and
//! 4-6.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use mesa_core::bill::PreliminaryBill;
use mesa_core::kitchen::{kitchen_queue, Comanda, KitchenTicket};
use mesa_core::payment::PaymentRequest;
use mesa_core::stats::{compute_stats, ShiftStats, ShiftWindow};
use mesa_core::subledger::SubcuentaSummary;
use mesa_core::validation::validate_order_size;
use mesa_core::{
    Account, CoreError, CoreResult, Discount, ItemChanges, NewAccount, OrderLine, Partition,
    Settlement, SplitShare, StaffRef, TableRef, TipInput, ValidationError,
};
use mesa_db::Database;

use super::{Catalog, ServiceResult};
use crate::scope::AccessScope;
use crate::state::AccountLocks;

// =============================================================================
// Inputs and Outputs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccountInput {
    pub tables: Vec<TableRef>,
    pub guest_count: u32,
    pub shift_id: Option<String>,
    /// Waiter in charge; defaults to the actor opening the account.
    pub waiter: Option<StaffRef>,
}

/// One requested line of an order round, before catalog resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineInput {
    pub product_id: String,
    pub quantity: i64,
    pub note: Option<String>,
    pub subcuenta: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub settlement: Settlement,
    pub account: Account,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
pub struct AccountService {
    db: Database,
    catalog: Arc<dyn Catalog>,
    locks: AccountLocks,
    max_split_shares: u32,
}

impl AccountService {
    pub fn new(db: Database, catalog: Arc<dyn Catalog>, max_split_shares: u32) -> Self {
        AccountService {
            db,
            catalog,
            locks: AccountLocks::new(),
            max_split_shares,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub async fn open_account(
        &self,
        scope: &AccessScope,
        input: OpenAccountInput,
    ) -> ServiceResult<Account> {
        scope.require_floor("open account")?;

        let account = Account::open(NewAccount {
            tenant_id: scope.tenant_id.clone(),
            tables: input.tables,
            waiter: input.waiter.unwrap_or_else(|| scope.staff()),
            guest_count: input.guest_count,
            shift_id: input.shift_id,
        })?;
        self.ensure_tables_free(&account, &account.tables).await?;

        self.db.accounts().insert(&account).await?;
        info!(
            account_id = %account.id,
            tenant_id = %account.tenant_id,
            tables = ?account.tables.iter().map(|t| t.label.as_str()).collect::<Vec<_>>(),
            "Account opened"
        );
        Ok(account)
    }

    pub async fn get_account(&self, scope: &AccessScope, id: &str) -> ServiceResult<Account> {
        self.load(scope, id).await
    }

    pub async fn list_active(&self, scope: &AccessScope) -> ServiceResult<Vec<Account>> {
        Ok(self.db.accounts().list_active(&scope.tenant_id).await?)
    }

    pub async fn request_bill(&self, scope: &AccessScope, id: &str) -> ServiceResult<Account> {
        scope.require_floor("request bill")?;
        let (_, account) = self.write(scope, id, "request bill", |a| a.request_bill()).await?;
        info!(account_id = %id, total = %account.total, "Bill requested");
        Ok(account)
    }

    pub async fn reopen(&self, scope: &AccessScope, id: &str) -> ServiceResult<Account> {
        scope.require_floor("reopen")?;
        let (_, account) = self.write(scope, id, "reopen", |a| a.reopen()).await?;
        info!(account_id = %id, "Account reopened");
        Ok(account)
    }

    pub async fn cancel(&self, scope: &AccessScope, id: &str, reason: &str) -> ServiceResult<Account> {
        scope.require_floor("cancel account")?;
        let (_, account) = self.write(scope, id, "cancel account", |a| a.cancel(reason)).await?;
        info!(
            account_id = %id,
            reason = account.cancellation_reason.as_deref().unwrap_or_default(),
            "Account cancelled"
        );
        Ok(account)
    }

    pub async fn merge_tables(
        &self,
        scope: &AccessScope,
        id: &str,
        tables: Vec<TableRef>,
    ) -> ServiceResult<Account> {
        scope.require_floor("merge tables")?;
        let _guard = self.locks.acquire(id).await;
        let mut account = self.load(scope, id).await?;
        self.ensure_tables_free(&account, &tables).await?;

        let before = Snapshot::of(&account);
        let result = account.merge_tables(tables);
        let (_, account) = self.commit(id, "merge tables", before, account, result).await?;
        info!(account_id = %id, tables = account.tables.len(), "Tables merged");
        Ok(account)
    }

    // =========================================================================
    // Orders and Items
    // =========================================================================

    /// Resolves every product, then appends the round. Returns the account
    /// and the new order number.
    pub async fn add_order(
        &self,
        scope: &AccessScope,
        id: &str,
        lines: Vec<OrderLineInput>,
    ) -> ServiceResult<(u32, Account)> {
        scope.require_floor("add order")?;
        validate_order_size(lines.len())?;

        let mut resolved = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self
                .catalog
                .find(&scope.tenant_id, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Product", &line.product_id))?;
            resolved.push(OrderLine {
                product,
                quantity: line.quantity,
                note: line.note,
                subcuenta: line.subcuenta,
            });
        }

        let staff = scope.staff();
        let (number, account) = self
            .write(scope, id, "add order", |a| a.add_order(resolved, &staff))
            .await?;
        info!(account_id = %id, order = number, subtotal = %account.subtotal, "Order added");
        Ok((number, account))
    }

    pub async fn edit_item(
        &self,
        scope: &AccessScope,
        id: &str,
        item_id: &str,
        changes: ItemChanges,
    ) -> ServiceResult<Account> {
        scope.require_floor("edit item")?;
        let (_, account) = self
            .write(scope, id, "edit item", |a| a.edit_item(item_id, changes))
            .await?;
        Ok(account)
    }

    pub async fn cancel_item(
        &self,
        scope: &AccessScope,
        id: &str,
        item_id: &str,
        reason: &str,
    ) -> ServiceResult<Account> {
        scope.require_floor("cancel item")?;
        let (_, account) = self
            .write(scope, id, "cancel item", |a| a.cancel_item(item_id, reason))
            .await?;
        info!(account_id = %id, item_id = %item_id, "Item cancelled");
        Ok(account)
    }

    // =========================================================================
    // Kitchen
    // =========================================================================

    /// Sends every pending item. An empty comanda writes nothing.
    pub async fn send_to_kitchen(&self, scope: &AccessScope, id: &str) -> ServiceResult<Comanda> {
        let (comanda, _) = self
            .write(scope, id, "send to kitchen", |a| a.send_to_kitchen())
            .await?;
        if !comanda.is_empty() {
            info!(account_id = %id, items = comanda.items.len(), "Comanda sent");
        }
        Ok(comanda)
    }

    pub async fn mark_ready(&self, scope: &AccessScope, id: &str, item_id: &str) -> ServiceResult<Account> {
        let (_, account) = self
            .write(scope, id, "mark ready", |a| a.mark_ready(item_id))
            .await?;
        debug!(account_id = %id, item_id = %item_id, "Item ready");
        Ok(account)
    }

    pub async fn kitchen_queue(&self, scope: &AccessScope) -> ServiceResult<Vec<KitchenTicket>> {
        let accounts = self.db.accounts().list_active(&scope.tenant_id).await?;
        Ok(kitchen_queue(&accounts))
    }

    // =========================================================================
    // Sub-ledgers and Split
    // =========================================================================

    pub async fn add_subcuenta(&self, scope: &AccessScope, id: &str, name: &str) -> ServiceResult<Account> {
        scope.require_floor("add subcuenta")?;
        let (_, account) = self
            .write(scope, id, "add subcuenta", |a| a.add_subcuenta(name))
            .await?;
        Ok(account)
    }

    pub async fn remove_subcuenta(&self, scope: &AccessScope, id: &str, name: &str) -> ServiceResult<Account> {
        scope.require_floor("remove subcuenta")?;
        let (_, account) = self
            .write(scope, id, "remove subcuenta", |a| a.remove_subcuenta(name))
            .await?;
        Ok(account)
    }

    pub async fn subcuenta_summary(&self, scope: &AccessScope, id: &str) -> ServiceResult<SubcuentaSummary> {
        Ok(self.load(scope, id).await?.subcuenta_summary())
    }

    pub async fn configure_split(
        &self,
        scope: &AccessScope,
        id: &str,
        shares: u32,
    ) -> ServiceResult<Vec<SplitShare>> {
        scope.require_floor("configure split")?;
        if shares > self.max_split_shares {
            return Err(ValidationError::OutOfRange {
                field: "shares".to_string(),
                min: 2,
                max: i64::from(self.max_split_shares),
            }
            .into());
        }
        let (split, account) = self
            .write(scope, id, "configure split", |a| a.configure_split(shares))
            .await?;
        info!(account_id = %id, shares, total = %account.total, "Account split");
        Ok(split)
    }

    pub async fn clear_split(&self, scope: &AccessScope, id: &str) -> ServiceResult<Account> {
        scope.require_floor("clear split")?;
        let (_, account) = self.write(scope, id, "clear split", |a| a.clear_split()).await?;
        info!(account_id = %id, "Split cleared");
        Ok(account)
    }

    // =========================================================================
    // Adjustments and Bill
    // =========================================================================

    pub async fn apply_discount(
        &self,
        scope: &AccessScope,
        id: &str,
        discount: Option<Discount>,
    ) -> ServiceResult<Account> {
        scope.require_floor("apply discount")?;
        let (_, account) = self
            .write(scope, id, "apply discount", |a| a.apply_discount(discount))
            .await?;
        info!(account_id = %id, discount = %account.discount_amount, "Discount applied");
        Ok(account)
    }

    pub async fn apply_tip(&self, scope: &AccessScope, id: &str, tip: TipInput) -> ServiceResult<Account> {
        scope.require_floor("apply tip")?;
        let (_, account) = self.write(scope, id, "apply tip", |a| a.apply_tip(tip)).await?;
        Ok(account)
    }

    pub async fn preliminary_bill(
        &self,
        scope: &AccessScope,
        id: &str,
        partition: Option<Partition>,
    ) -> ServiceResult<PreliminaryBill> {
        let account = self.load(scope, id).await?;
        Ok(account.preliminary_bill(partition)?)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    pub async fn pay_account(
        &self,
        scope: &AccessScope,
        id: &str,
        request: PaymentRequest,
    ) -> ServiceResult<PaymentReceipt> {
        scope.require_floor("pay account")?;
        let staff = scope.staff();
        let (settlement, account) = self
            .write(scope, id, "pay account", |a| a.pay_account(request, &staff))
            .await?;
        Ok(receipt(settlement, account))
    }

    pub async fn pay_partition(
        &self,
        scope: &AccessScope,
        id: &str,
        partition: Partition,
        request: PaymentRequest,
    ) -> ServiceResult<PaymentReceipt> {
        scope.require_floor("pay subcuenta")?;
        let staff = scope.staff();
        let (settlement, account) = self
            .write(scope, id, "pay subcuenta", |a| a.pay_partition(partition, request, &staff))
            .await?;
        Ok(receipt(settlement, account))
    }

    pub async fn pay_split(
        &self,
        scope: &AccessScope,
        id: &str,
        share: u32,
        request: PaymentRequest,
    ) -> ServiceResult<PaymentReceipt> {
        scope.require_floor("pay split share")?;
        let staff = scope.staff();
        let (settlement, account) = self
            .write(scope, id, "pay split share", |a| a.pay_split(share, request, &staff))
            .await?;
        Ok(receipt(settlement, account))
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    pub async fn shift_stats(
        &self,
        scope: &AccessScope,
        shift_id: &str,
        query: StatsQuery,
    ) -> ServiceResult<ShiftStats> {
        let settlements = self
            .db
            .settlements()
            .list_for_shift(&scope.tenant_id, shift_id)
            .await?;
        let window = ShiftWindow {
            shift_id: Some(shift_id.to_string()),
            from: query.from,
            to: query.to,
        };
        Ok(compute_stats(&settlements, &window))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Loads an account of the caller's tenant. Accounts of other tenants
    /// are reported as not found.
    async fn load(&self, scope: &AccessScope, id: &str) -> ServiceResult<Account> {
        match self.db.accounts().get(id).await? {
            Some(account) if account.tenant_id == scope.tenant_id => Ok(account),
            _ => Err(CoreError::not_found("Account", id).into()),
        }
    }

    /// Locks, loads, applies `operation` and saves.
    async fn write<T>(
        &self,
        scope: &AccessScope,
        id: &str,
        operation: &str,
        apply: impl FnOnce(&mut Account) -> CoreResult<T>,
    ) -> ServiceResult<(T, Account)> {
        let _guard = self.locks.acquire(id).await;
        let mut account = self.load(scope, id).await?;
        let before = Snapshot::of(&account);
        let result = apply(&mut account);
        self.commit(id, operation, before, account, result).await
    }

    /// Persists the outcome of a core operation. The caller holds the lock.
    ///
    /// Nothing is written when the operation failed or left the account
    /// untouched (`updated_at` unchanged).
    async fn commit<T>(
        &self,
        id: &str,
        operation: &str,
        before: Snapshot,
        mut account: Account,
        result: CoreResult<T>,
    ) -> ServiceResult<(T, Account)> {
        let value = match result {
            Ok(value) => value,
            Err(e) => {
                warn!(account_id = %id, operation, error = %e, "Rejected");
                return Err(e.into());
            }
        };

        if account.updated_at == before.updated_at {
            return Ok((value, account));
        }

        let new_settlements = account.settlements[before.settlements..].to_vec();
        self.db.accounts().save(&mut account, &new_settlements).await?;
        debug!(account_id = %id, operation, version = account.version, "Account saved");
        Ok((value, account))
    }

    async fn ensure_tables_free(&self, account: &Account, tables: &[TableRef]) -> ServiceResult<()> {
        for table in tables {
            let occupant = self
                .db
                .accounts()
                .table_occupant(&account.tenant_id, &table.id)
                .await?;
            if matches!(occupant, Some(holder) if holder != account.id) {
                return Err(ValidationError::Duplicate {
                    field: "table".to_string(),
                    value: table.label.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// What a write is compared against to decide what to persist.
struct Snapshot {
    updated_at: DateTime<Utc>,
    settlements: usize,
}

impl Snapshot {
    fn of(account: &Account) -> Self {
        Snapshot {
            updated_at: account.updated_at,
            settlements: account.settlements.len(),
        }
    }
}

fn receipt(settlement: Settlement, account: Account) -> PaymentReceipt {
    info!(
        account_id = %account.id,
        target = %settlement.target,
        method = settlement.method.as_str(),
        total = %settlement.total_with_tip,
        status = %account.status,
        "Payment recorded"
    );
    PaymentReceipt { settlement, account }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{DbCatalog, ServiceError};
    use mesa_core::payment::InstrumentAmount;
    use mesa_core::{
        AccountStatus, Actor, CatalogProduct, ErrorKind, ItemStatus, Money, PaymentMethod, Role,
    };
    use mesa_db::DbConfig;

    const TENANT: &str = "t1";

    async fn service() -> (AccountService, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, name, cents) in [
            ("TAC-001", "Tacos al pastor", 7500),
            ("BEB-001", "Agua de horchata", 4000),
            ("PLA-001", "Mole poblano", 16500),
        ] {
            db.catalog()
                .upsert(
                    TENANT,
                    &CatalogProduct {
                        id: id.to_string(),
                        name: name.to_string(),
                        category: None,
                        price: Money::from_cents(cents),
                    },
                )
                .await
                .unwrap();
        }
        let catalog = Arc::new(DbCatalog::new(db.catalog()));
        (AccountService::new(db.clone(), catalog, 20), db)
    }

    fn scope(role: Role) -> AccessScope {
        AccessScope::new(
            TENANT,
            Actor {
                id: "s1".to_string(),
                name: "Luis".to_string(),
                role,
            },
        )
    }

    fn waiter() -> AccessScope {
        scope(Role::Waiter)
    }

    fn table(id: &str) -> TableRef {
        TableRef {
            id: id.to_string(),
            label: id.to_string(),
        }
    }

    fn open_input(table_id: &str) -> OpenAccountInput {
        OpenAccountInput {
            tables: vec![table(table_id)],
            guest_count: 2,
            shift_id: Some("shift-1".to_string()),
            waiter: None,
        }
    }

    fn line(product_id: &str, quantity: i64, subcuenta: Option<&str>) -> OrderLineInput {
        OrderLineInput {
            product_id: product_id.to_string(),
            quantity,
            note: None,
            subcuenta: subcuenta.map(str::to_string),
        }
    }

    fn kind(err: ServiceError) -> Option<ErrorKind> {
        err.kind()
    }

    #[tokio::test]
    async fn test_open_snapshots_waiter_and_claims_table() {
        let (svc, _db) = service().await;
        let account = svc.open_account(&waiter(), open_input("12")).await.unwrap();
        assert_eq!(account.waiter.name, "Luis");
        assert_eq!(account.status, AccountStatus::Open);

        let err = svc.open_account(&waiter(), open_input("12")).await.unwrap_err();
        assert_eq!(kind(err), Some(ErrorKind::Validation));
        assert_eq!(svc.list_active(&waiter()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_order_resolves_catalog_prices() {
        let (svc, _db) = service().await;
        let account = svc.open_account(&waiter(), open_input("3")).await.unwrap();

        let (number, account) = svc
            .add_order(
                &waiter(),
                &account.id,
                vec![line("TAC-001", 2, None), line("BEB-001", 1, None)],
            )
            .await
            .unwrap();
        assert_eq!(number, 1);
        assert_eq!(account.subtotal.cents(), 19000);
        assert_eq!(account.version, 1);

        // Unknown product: nothing written
        let err = svc
            .add_order(&waiter(), &account.id, vec![line("NOPE", 1, None)])
            .await
            .unwrap_err();
        assert_eq!(kind(err), Some(ErrorKind::NotFound));
        let stored = svc.get_account(&waiter(), &account.id).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.items.len(), 2);
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_see_account() {
        let (svc, _db) = service().await;
        let account = svc.open_account(&waiter(), open_input("4")).await.unwrap();

        let outsider = AccessScope::new("t2", waiter().actor);
        let err = svc.get_account(&outsider, &account.id).await.unwrap_err();
        assert_eq!(kind(err), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_kitchen_flow_and_role_limits() {
        let (svc, _db) = service().await;
        let kitchen = scope(Role::Kitchen);
        let account = svc.open_account(&waiter(), open_input("9")).await.unwrap();

        // Nothing pending: empty comanda, no write
        let comanda = svc.send_to_kitchen(&waiter(), &account.id).await.unwrap();
        assert!(comanda.is_empty());
        assert_eq!(svc.get_account(&waiter(), &account.id).await.unwrap().version, 0);

        let (_, account) = svc
            .add_order(&waiter(), &account.id, vec![line("PLA-001", 1, None)])
            .await
            .unwrap();
        let comanda = svc.send_to_kitchen(&waiter(), &account.id).await.unwrap();
        assert_eq!(comanda.items.len(), 1);

        let queue = svc.kitchen_queue(&kitchen).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].counts.preparing, 1);

        let item_id = account.items[0].id.clone();
        let account = svc.mark_ready(&kitchen, &account.id, &item_id).await.unwrap();
        assert_eq!(account.items[0].status, ItemStatus::Ready);

        let err = svc
            .pay_account(
                &kitchen,
                &account.id,
                PaymentRequest::single(PaymentMethod::Cash, None),
            )
            .await
            .unwrap_err();
        assert_eq!(kind(err), Some(ErrorKind::Forbidden));
    }

    #[tokio::test]
    async fn test_pay_account_frees_table_and_feeds_stats() {
        let (svc, db) = service().await;
        let account = svc.open_account(&waiter(), open_input("7")).await.unwrap();
        svc.add_order(&waiter(), &account.id, vec![line("TAC-001", 2, None)])
            .await
            .unwrap();
        svc.request_bill(&waiter(), &account.id).await.unwrap();

        let receipt = svc
            .pay_account(
                &waiter(),
                &account.id,
                PaymentRequest::single(PaymentMethod::Cash, Some(Money::from_cents(20000))),
            )
            .await
            .unwrap();
        assert_eq!(receipt.account.status, AccountStatus::Paid);
        assert_eq!(receipt.settlement.change.cents(), 5000);

        assert_eq!(db.accounts().table_occupant(TENANT, "7").await.unwrap(), None);
        assert_eq!(db.settlements().list_for_account(&account.id).await.unwrap().len(), 1);

        let stats = svc
            .shift_stats(&waiter(), "shift-1", StatsQuery::default())
            .await
            .unwrap();
        assert_eq!(stats.settlement_count, 1);
        assert_eq!(stats.sales_total.cents(), 15000);
        assert_eq!(stats.change_given.cents(), 5000);

        // Terminal: every further mutation is rejected
        let err = svc
            .add_order(&waiter(), &account.id, vec![line("BEB-001", 1, None)])
            .await
            .unwrap_err();
        assert_eq!(kind(err), Some(ErrorKind::InvalidState));
    }

    #[tokio::test]
    async fn test_mismatched_payment_writes_nothing() {
        let (svc, db) = service().await;
        let account = svc.open_account(&waiter(), open_input("2")).await.unwrap();
        let (_, account) = svc
            .add_order(&waiter(), &account.id, vec![line("PLA-001", 1, None)])
            .await
            .unwrap();

        let request = PaymentRequest::mixed(vec![
            InstrumentAmount {
                method: PaymentMethod::Cash,
                amount: Money::from_cents(10000),
                received: None,
            },
            InstrumentAmount {
                method: PaymentMethod::Card,
                amount: Money::from_cents(5000),
                received: None,
            },
        ]);
        let err = svc.pay_account(&waiter(), &account.id, request).await.unwrap_err();
        assert_eq!(kind(err), Some(ErrorKind::PaymentMismatch));

        let stored = svc.get_account(&waiter(), &account.id).await.unwrap();
        assert_eq!(stored.version, account.version);
        assert_eq!(stored.status, AccountStatus::Open);
        assert!(db.settlements().list_for_account(&account.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_double_payment_of_subcuenta() {
        let (svc, db) = service().await;
        let account = svc.open_account(&waiter(), open_input("5")).await.unwrap();
        svc.add_subcuenta(&waiter(), &account.id, "Ana").await.unwrap();
        svc.add_order(&waiter(), &account.id, vec![line("TAC-001", 1, Some("Ana"))])
            .await
            .unwrap();

        let scope = waiter();
        let request = PaymentRequest::single(PaymentMethod::Card, None);
        let (first, second) = tokio::join!(
            svc.pay_partition(&scope, &account.id, Partition::Named("Ana".to_string()), request.clone()),
            svc.pay_partition(&scope, &account.id, Partition::Named("Ana".to_string()), request),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let rejected = outcomes.into_iter().find_map(Result::err).unwrap();
        assert_eq!(kind(rejected), Some(ErrorKind::InvalidState));

        let ledger = db.settlements().list_for_account(&account.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].amount_due.cents(), 7500);
    }

    #[tokio::test]
    async fn test_split_respects_venue_cap_and_settles() {
        let (svc, _db) = service().await;
        let account = svc.open_account(&waiter(), open_input("8")).await.unwrap();
        svc.add_order(
            &waiter(),
            &account.id,
            vec![line("TAC-001", 1, None), line("TAC-001", 1, None)],
        )
        .await
        .unwrap();

        let capped = AccountService {
            max_split_shares: 4,
            ..svc.clone()
        };
        let err = capped.configure_split(&waiter(), &account.id, 5).await.unwrap_err();
        assert_eq!(kind(err), Some(ErrorKind::Validation));

        let shares = svc.configure_split(&waiter(), &account.id, 2).await.unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].total.cents(), 7500);

        for number in 1..=2 {
            svc.pay_split(
                &waiter(),
                &account.id,
                number,
                PaymentRequest::single(PaymentMethod::Transfer, None),
            )
            .await
            .unwrap();
        }
        let account = svc.get_account(&waiter(), &account.id).await.unwrap();
        assert_eq!(account.status, AccountStatus::Paid);
    }

    #[tokio::test]
    async fn test_merge_rejects_occupied_table() {
        let (svc, _db) = service().await;
        let first = svc.open_account(&waiter(), open_input("10")).await.unwrap();
        svc.open_account(&waiter(), open_input("11")).await.unwrap();

        let err = svc
            .merge_tables(&waiter(), &first.id, vec![table("11")])
            .await
            .unwrap_err();
        assert_eq!(kind(err), Some(ErrorKind::Validation));

        let merged = svc
            .merge_tables(&waiter(), &first.id, vec![table("14")])
            .await
            .unwrap();
        assert_eq!(merged.tables.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelling_last_unpaid_item_closes_account() {
        let (svc, db) = service().await;
        let account = svc.open_account(&waiter(), open_input("15")).await.unwrap();
        svc.add_subcuenta(&waiter(), &account.id, "Ana").await.unwrap();
        let (_, account) = svc
            .add_order(
                &waiter(),
                &account.id,
                vec![line("TAC-001", 1, Some("Ana")), line("BEB-001", 1, None)],
            )
            .await
            .unwrap();
        svc.pay_partition(
            &waiter(),
            &account.id,
            Partition::Named("Ana".to_string()),
            PaymentRequest::single(PaymentMethod::Cash, None),
        )
        .await
        .unwrap();

        let drink = account.items[1].id.clone();
        let account = svc
            .cancel_item(&waiter(), &account.id, &drink, "guest left")
            .await
            .unwrap();
        assert_eq!(account.status, AccountStatus::Paid);
        assert_eq!(db.accounts().table_occupant(TENANT, "15").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_oversized_tip_is_rejected() {
        let (svc, _db) = service().await;
        let account = svc.open_account(&waiter(), open_input("16")).await.unwrap();
        svc.add_order(&waiter(), &account.id, vec![line("TAC-001", 1, None)])
            .await
            .unwrap();

        let err = svc
            .apply_tip(
                &waiter(),
                &account.id,
                TipInput::Fixed {
                    amount: Money::from_cents(i64::MAX),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(kind(err), Some(ErrorKind::Validation));

        let stored = svc.get_account(&waiter(), &account.id).await.unwrap();
        assert_eq!(stored.total.cents(), 7500);
    }

    #[tokio::test]
    async fn test_failed_lookups_leave_no_locks() {
        let (svc, _db) = service().await;
        let account = svc.open_account(&waiter(), open_input("17")).await.unwrap();

        for id in ["missing-1", "missing-2"] {
            let err = svc.request_bill(&waiter(), id).await.unwrap_err();
            assert_eq!(kind(err), Some(ErrorKind::NotFound));
        }
        let outsider = AccessScope::new("t2", waiter().actor);
        let err = svc.request_bill(&outsider, &account.id).await.unwrap_err();
        assert_eq!(kind(err), Some(ErrorKind::NotFound));
        assert!(svc.locks.is_empty());

        svc.request_bill(&waiter(), &account.id).await.unwrap();
        assert!(svc.locks.is_empty());
    }
}
