//! # Account Aggregate
//!
//! One open tab bound to one or more tables for the duration of a visit.
//!
//! ## Ownership Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Account (one document)                          │
//! │                                                                         │
//! │  orders:  [#1 08:02 Luis] [#2 08:40 Luis] [#3 09:15 Marta]              │
//! │                 ▲               ▲               ▲                       │
//! │                 │ order_number  │               │                       │
//! │  items:   ┌─────┴────┬──────────┴─┬─────────────┴┬────────────┐        │
//! │  (arena)  │ id=a1f.. │ id=7c2..   │ id=e90..     │ id=41b..   │        │
//! │           │ Tacos x3 │ Agua x2    │ Flan x1      │ Café x2    │        │
//! │           │ Ana      │ -          │ Ana          │ Luis       │        │
//! │           └──────────┴────────────┴──────────────┴────────────┘        │
//! │                                                                         │
//! │  subcuentas: [Ana] [Luis]      unassigned_paid: false                  │
//! │  split:      None              settlements: [...] (append-only)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Items are addressed by a stable [`ItemId`], never by position, so
//! cancelling or appending items never shifts a reference held by a client.
//! Orders are grouping tags carrying the round number and who created it.
//!
//! ## Mutation Contract
//! Every `&mut self` operation validates everything first and only then
//! writes, so a returned error always leaves the account untouched. After
//! any change to items, discount or tip the totals are recomputed from
//! scratch with [`Account::recalculate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::subledger::Partition;
use crate::types::{
    AccountStatus, CatalogProduct, Discount, Item, ItemId, ItemStatus, Order, Settlement,
    SplitShare, StaffRef, Subcuenta, TableRef, Tip, TipInput,
};
use crate::validation::{
    validate_amount, validate_bps, validate_guest_count, validate_note, validate_order_size,
    validate_price, validate_quantity, validate_reason,
};

// =============================================================================
// Account
// =============================================================================

/// The account (tab) aggregate.
///
/// ## Invariants
/// - `subtotal == Σ unit_price × quantity` over non-cancelled items
/// - `total == subtotal - discount_amount + tip.amount`
/// - Once `paid` or `cancelled`, no operation mutates the account
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Account {
    pub id: String,
    pub tenant_id: String,
    /// One table, or several after a merge.
    pub tables: Vec<TableRef>,
    pub waiter: StaffRef,
    pub guest_count: u32,
    pub shift_id: Option<String>,
    pub status: AccountStatus,

    pub subtotal: Money,
    /// Discount as entered; percentage discounts are re-resolved on every
    /// recalculation.
    pub discount: Option<Discount>,
    pub discount_amount: Money,
    pub tip: Tip,
    pub total: Money,

    pub orders: Vec<Order>,
    pub items: Vec<Item>,
    pub subcuentas: Vec<Subcuenta>,
    /// Paid flag of the virtual unassigned partition.
    pub unassigned_paid: bool,
    pub split: Option<Vec<SplitShare>>,
    pub is_split: bool,
    pub settlements: Vec<Settlement>,

    pub cancellation_reason: Option<String>,
    /// Optimistic concurrency counter, bumped by the repository on write.
    pub version: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub bill_requested_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Input for opening an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub tenant_id: String,
    pub tables: Vec<TableRef>,
    pub waiter: StaffRef,
    pub guest_count: u32,
    pub shift_id: Option<String>,
}

/// One line of an order round, with the product already resolved from the
/// catalog.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product: CatalogProduct,
    pub quantity: i64,
    pub note: Option<String>,
    /// Target sub-ledger; `None` or blank means unassigned.
    pub subcuenta: Option<String>,
}

/// Partial update of a pending item.
///
/// `None` leaves a field untouched. For `note` and `subcuenta`, an empty
/// string clears the value (the item becomes unassigned).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemChanges {
    pub quantity: Option<i64>,
    pub note: Option<String>,
    pub subcuenta: Option<String>,
}

impl Account {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Opens a new account in status `open`.
    ///
    /// Table occupancy across accounts is checked by the caller, which owns
    /// the view of every active account.
    pub fn open(new: NewAccount) -> CoreResult<Account> {
        validate_tables(&new.tables)?;
        validate_guest_count(new.guest_count)?;

        let now = Utc::now();
        Ok(Account {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: new.tenant_id,
            tables: new.tables,
            waiter: new.waiter,
            guest_count: new.guest_count,
            shift_id: new.shift_id,
            status: AccountStatus::Open,
            subtotal: Money::zero(),
            discount: None,
            discount_amount: Money::zero(),
            tip: Tip::default(),
            total: Money::zero(),
            orders: Vec::new(),
            items: Vec::new(),
            subcuentas: Vec::new(),
            unassigned_paid: false,
            split: None,
            is_split: false,
            settlements: Vec::new(),
            cancellation_reason: None,
            version: 0,
            created_at: now,
            updated_at: now,
            bill_requested_at: None,
            paid_at: None,
            cancelled_at: None,
        })
    }

    /// `open → closed_pending`. No monetary change.
    pub fn request_bill(&mut self) -> CoreResult<()> {
        self.ensure_status(&[AccountStatus::Open], "request bill")?;

        let now = Utc::now();
        self.status = AccountStatus::ClosedPending;
        self.bill_requested_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// `closed_pending → open`, while nothing has been paid yet.
    pub fn reopen(&mut self) -> CoreResult<()> {
        self.ensure_status(&[AccountStatus::ClosedPending], "reopen")?;
        if self.has_settlements() {
            return Err(self.invalid_state("reopen after a payment"));
        }

        self.status = AccountStatus::Open;
        self.bill_requested_at = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Voids the account. Recorded settlements are kept for audit.
    pub fn cancel(&mut self, reason: &str) -> CoreResult<()> {
        self.ensure_active("cancel")?;
        let reason = validate_reason(reason)?;

        let now = Utc::now();
        self.status = AccountStatus::Cancelled;
        self.cancellation_reason = Some(reason);
        self.cancelled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Attaches further tables to an open account.
    pub fn merge_tables(&mut self, tables: Vec<TableRef>) -> CoreResult<()> {
        self.ensure_open("merge tables")?;
        validate_tables(&tables)?;

        if let Some(table) = tables
            .iter()
            .find(|t| self.tables.iter().any(|own| own.id == t.id))
        {
            return Err(ValidationError::Duplicate {
                field: "table".to_string(),
                value: table.label.clone(),
            }
            .into());
        }

        self.tables.extend(tables);
        self.updated_at = Utc::now();
        Ok(())
    }

    // =========================================================================
    // Guards
    // =========================================================================

    /// Rejects the operation unless the account is in one of `allowed`.
    pub fn ensure_status(&self, allowed: &[AccountStatus], operation: &str) -> CoreResult<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(self.invalid_state(operation))
        }
    }

    pub fn ensure_open(&self, operation: &str) -> CoreResult<()> {
        self.ensure_status(&[AccountStatus::Open], operation)
    }

    /// Any non-terminal status.
    pub fn ensure_active(&self, operation: &str) -> CoreResult<()> {
        self.ensure_status(&AccountStatus::ACTIVE, operation)
    }

    pub(crate) fn invalid_state(&self, operation: &str) -> CoreError {
        CoreError::InvalidState {
            account_id: self.id.clone(),
            status: self.status,
            operation: operation.to_string(),
        }
    }

    pub fn has_settlements(&self) -> bool {
        !self.settlements.is_empty()
    }

    // =========================================================================
    // Orders and Items
    // =========================================================================

    /// Appends a new order round. All lines are validated before any is
    /// added; returns the new order number.
    pub fn add_order(&mut self, lines: Vec<OrderLine>, created_by: &StaffRef) -> CoreResult<u32> {
        self.ensure_open("add order")?;
        validate_order_size(lines.len())?;

        let now = Utc::now();
        let number = self.orders.len() as u32 + 1;

        let mut items = Vec::with_capacity(lines.len());
        for line in lines {
            validate_quantity(line.quantity)?;
            validate_price(line.product.price)?;
            let note = validate_note(line.note.as_deref())?;

            let subcuenta = normalize_subcuenta(line.subcuenta);
            self.ensure_partition_writable(&Partition::from_label(subcuenta.as_deref()))?;

            items.push(Item {
                id: uuid::Uuid::new_v4().to_string(),
                order_number: number,
                product_id: line.product.id,
                name: line.product.name,
                category: line.product.category,
                unit_price: line.product.price,
                quantity: line.quantity,
                note,
                subcuenta,
                status: ItemStatus::Pending,
                cancel_reason: None,
                created_at: now,
                sent_at: None,
                ready_at: None,
                cancelled_at: None,
            });
        }

        self.orders.push(Order {
            number,
            created_by: created_by.clone(),
            created_at: now,
        });
        self.items.extend(items);
        self.recalculate();
        self.updated_at = now;
        Ok(number)
    }

    /// Edits quantity, note or sub-ledger assignment of a pending item.
    ///
    /// Moving an item into or out of a paid partition is rejected: it would
    /// change the contents of a settled bill without changing what was paid.
    pub fn edit_item(&mut self, item_id: &str, changes: ItemChanges) -> CoreResult<()> {
        self.ensure_open("edit item")?;

        let item = self.item(item_id)?;
        if item.status != ItemStatus::Pending {
            return Err(CoreError::InvalidItemStatus {
                item_id: item.id.clone(),
                status: item.status,
                operation: "edit".to_string(),
            });
        }

        if let Some(quantity) = changes.quantity {
            validate_quantity(quantity)?;
        }
        let note = match changes.note.as_deref() {
            Some(note) => Some(validate_note(Some(note))?),
            None => None,
        };

        let current = Partition::of(item);
        let target = changes
            .subcuenta
            .map(|name| Partition::from_label(normalize_subcuenta(Some(name)).as_deref()));

        // Any edit to an item inside a paid partition alters a settled bill.
        self.ensure_partition_writable(&current)?;
        if let Some(target) = &target {
            self.ensure_partition_writable(target)?;
        }

        let item = self.item_mut(item_id)?;
        if let Some(quantity) = changes.quantity {
            item.quantity = quantity;
        }
        if let Some(note) = note {
            item.note = note;
        }
        if let Some(target) = target {
            item.subcuenta = target.name().map(str::to_string);
        }

        self.recalculate();
        self.updated_at = Utc::now();
        self.promote_if_settled();
        Ok(())
    }

    /// Cancels a pending item. It stays in history but never counts again.
    ///
    /// Cancelling the last unpaid item of a partially paid account leaves
    /// nothing to pay, so the account becomes `paid`.
    pub fn cancel_item(&mut self, item_id: &str, reason: &str) -> CoreResult<()> {
        self.ensure_open("cancel item")?;
        let reason = validate_reason(reason)?;

        let item = self.item(item_id)?;
        if !item.status.can_transition_to(ItemStatus::Cancelled) {
            return Err(CoreError::InvalidItemStatus {
                item_id: item.id.clone(),
                status: item.status,
                operation: "cancel".to_string(),
            });
        }
        self.ensure_partition_writable(&Partition::of(item))?;

        let now = Utc::now();
        let item = self.item_mut(item_id)?;
        item.status = ItemStatus::Cancelled;
        item.cancel_reason = Some(reason);
        item.cancelled_at = Some(now);

        self.recalculate();
        self.updated_at = now;
        self.promote_if_settled();
        Ok(())
    }

    /// Resolves a positional `(order number, position within order)`
    /// reference to the item's stable id.
    pub fn locate_item(&self, order_number: u32, position: usize) -> CoreResult<&ItemId> {
        self.items
            .iter()
            .filter(|i| i.order_number == order_number)
            .nth(position)
            .map(|i| &i.id)
            .ok_or_else(|| {
                CoreError::not_found("Item", format!("order {} position {}", order_number, position))
            })
    }

    pub fn item(&self, item_id: &str) -> CoreResult<&Item> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::not_found("Item", item_id))
    }

    pub fn item_mut(&mut self, item_id: &str) -> CoreResult<&mut Item> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| CoreError::not_found("Item", item_id))
    }

    /// Items that count towards totals.
    pub fn active_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| i.status.is_active())
    }

    // =========================================================================
    // Totals, Discount and Tip
    // =========================================================================

    /// Recomputes subtotal, discount, tip and total from scratch.
    ///
    /// Fixed discounts are capped at the subtotal (it may shrink after the
    /// discount was applied). A percentage tip applies to the subtotal
    /// after discount.
    pub fn recalculate(&mut self) {
        self.subtotal = self.active_items().map(Item::line_total).sum();

        self.discount_amount = match &self.discount {
            Some(discount) => discount.resolve(self.subtotal).non_negative().min(self.subtotal),
            None => Money::zero(),
        };

        let after_discount = self.subtotal - self.discount_amount;
        self.tip = self.tip.as_input().resolve(after_discount);

        self.total = after_discount + self.tip.amount;
    }

    /// Sets or clears the account discount.
    pub fn apply_discount(&mut self, discount: Option<Discount>) -> CoreResult<()> {
        self.ensure_adjustable("apply discount")?;

        match discount {
            Some(Discount::Fixed { amount }) => {
                validate_amount("discount", amount)?;
                if amount > self.subtotal {
                    return Err(ValidationError::OutOfRange {
                        field: "discount".to_string(),
                        min: 0,
                        max: self.subtotal.cents(),
                    }
                    .into());
                }
            }
            Some(Discount::Percentage { bps }) => validate_bps("discount", bps)?,
            None => {}
        }

        self.discount = discount;
        self.recalculate();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Sets or clears the account tip.
    pub fn apply_tip(&mut self, tip: TipInput) -> CoreResult<()> {
        self.ensure_adjustable("apply tip")?;
        validate_tip(&tip)?;

        self.tip = tip.resolve(self.subtotal - self.discount_amount);
        self.recalculate();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Discount and tip change amounts already owed, so they are frozen
    /// once anything has been paid.
    fn ensure_adjustable(&self, operation: &str) -> CoreResult<()> {
        self.ensure_status(
            &[AccountStatus::Open, AccountStatus::ClosedPending],
            operation,
        )?;
        if self.has_settlements() {
            return Err(self.invalid_state(&format!("{} after a payment", operation)));
        }
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_tables(tables: &[TableRef]) -> CoreResult<()> {
    if tables.is_empty() {
        return Err(ValidationError::Required {
            field: "tables".to_string(),
        }
        .into());
    }

    let mut seen = HashSet::new();
    for table in tables {
        if table.id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "table id".to_string(),
            }
            .into());
        }
        if !seen.insert(table.id.as_str()) {
            return Err(ValidationError::Duplicate {
                field: "table".to_string(),
                value: table.label.clone(),
            }
            .into());
        }
    }
    Ok(())
}

pub(crate) fn validate_tip(tip: &TipInput) -> CoreResult<()> {
    match tip {
        TipInput::Fixed { amount } => Ok(validate_amount("tip", *amount)?),
        TipInput::Percentage { bps } => Ok(validate_bps("tip", *bps)?),
        TipInput::None => Ok(()),
    }
}

fn normalize_subcuenta(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
