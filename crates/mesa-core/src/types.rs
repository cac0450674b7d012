//! # Domain Types
//!
//! Core domain types used throughout Mesa POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Account (account.rs) ─┬── Order[]        round tags (number, time)     │
//! │                        ├── Item[]         arena keyed by ItemId         │
//! │                        ├── Subcuenta[]    named partitions              │
//! │                        ├── SplitShare[]   equal monetary shares         │
//! │                        └── Settlement[]   append-only payment records   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  AccountStatus  │   │   ItemStatus    │   │ PaymentMethod   │       │
//! │  │  open           │   │  pending        │   │  cash           │       │
//! │  │  closed_pending │   │  preparing      │   │  card           │       │
//! │  │  split_pending  │   │  ready          │   │  transfer       │       │
//! │  │  paid/cancelled │   │  cancelled      │   │  mixed          │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

/// Stable identifier of an item inside its account.
pub type ItemId = String;

// =============================================================================
// Account Status
// =============================================================================

/// Lifecycle state of an account.
///
/// ```text
///            request_bill            ┌──────────┐
///   open ───────────────────────────►│ closed_  │──┐
///    │ ▲        reopen               │ pending  │  │
///    │ └─────────────────────────────┴──────────┘  │ fully settled
///    │ configure_split  ┌──────────┐               ▼
///    ├─────────────────►│ split_   │─────────► ┌──────┐
///    │                  │ pending  │           │ paid │
///    │ fully settled    └──────────┘           └──────┘
///    └───────────────────────────────────────────►
///   any non-terminal ──cancel(reason)──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Tab is open; items can be added.
    Open,
    /// Bill requested; waiting for payment.
    ClosedPending,
    /// Equal split configured; waiting for share payments.
    SplitPending,
    /// Fully settled.
    Paid,
    /// Voided with a reason.
    Cancelled,
}

impl AccountStatus {
    /// Terminal states accept no further mutation.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, AccountStatus::Paid | AccountStatus::Cancelled)
    }

    /// Returns the storage representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Open => "open",
            AccountStatus::ClosedPending => "closed_pending",
            AccountStatus::SplitPending => "split_pending",
            AccountStatus::Paid => "paid",
            AccountStatus::Cancelled => "cancelled",
        }
    }

    /// Non-terminal states, used when querying active accounts.
    pub const ACTIVE: [AccountStatus; 3] = [
        AccountStatus::Open,
        AccountStatus::ClosedPending,
        AccountStatus::SplitPending,
    ];
}

impl Default for AccountStatus {
    fn default() -> Self {
        AccountStatus::Open
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Item Status
// =============================================================================

/// Kitchen status of a single item.
///
/// Items only move forward: `pending → preparing → ready` or
/// `pending → cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Preparing,
    Ready,
    Cancelled,
}

impl ItemStatus {
    /// Returns true when `next` is a legal forward transition from `self`.
    pub const fn can_transition_to(&self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Pending, ItemStatus::Preparing)
                | (ItemStatus::Preparing, ItemStatus::Ready)
                | (ItemStatus::Pending, ItemStatus::Cancelled)
        )
    }

    /// Cancelled items never count towards any total.
    pub const fn is_active(&self) -> bool {
        !matches!(self, ItemStatus::Cancelled)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Preparing => "preparing",
            ItemStatus::Ready => "ready",
            ItemStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::Pending
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; change may be returned.
    Cash,
    /// Card on an external terminal.
    Card,
    /// Bank transfer.
    Transfer,
    /// Up to one each of cash, transfer and card.
    Mixed,
}

impl PaymentMethod {
    /// Order in which a tip is carved out of mixed instruments.
    ///
    /// Cash first, then transfer, then card. `Mixed` is never an instrument.
    pub const fn tip_priority(&self) -> u8 {
        match self {
            PaymentMethod::Cash => 0,
            PaymentMethod::Transfer => 1,
            PaymentMethod::Card => 2,
            PaymentMethod::Mixed => u8::MAX,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Mixed => "mixed",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Actors and References
// =============================================================================

/// Role of the verified actor supplied by the identity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Cashier,
    Waiter,
    Kitchen,
}

impl Role {
    pub fn parse(value: &str) -> Option<Role> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "cashier" => Some(Role::Cashier),
            "waiter" => Some(Role::Waiter),
            "kitchen" => Some(Role::Kitchen),
            _ => None,
        }
    }
}

/// A staff member as recorded on accounts, orders and settlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffRef {
    pub id: String,
    pub name: String,
}

/// The verified actor performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn staff(&self) -> StaffRef {
        StaffRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// A table reference supplied by the floor-plan collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableRef {
    pub id: String,
    /// Human label printed on comandas and bills ("12", "Terrace 3").
    pub label: String,
}

/// Product data resolved from the catalog at order-add time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub price: Money,
}

// =============================================================================
// Order and Item
// =============================================================================

/// One round of items added together.
///
/// Orders are grouping tags; items reference them by `order_number`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    /// Sequential, starting at 1.
    pub number: u32,
    pub created_by: StaffRef,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One product line within an account.
///
/// Uses the snapshot pattern: name and unit price are frozen when the item
/// is added, so catalog changes never alter a billed account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Item {
    pub id: ItemId,
    pub order_number: u32,
    pub product_id: String,
    /// Product name at time of ordering (frozen).
    pub name: String,
    pub category: Option<String>,
    /// Unit price at time of ordering (frozen).
    pub unit_price: Money,
    pub quantity: i64,
    pub note: Option<String>,
    /// Sub-ledger this item is billed to; `None` means unassigned.
    pub subcuenta: Option<String>,
    pub status: ItemStatus,
    pub cancel_reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub sent_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub ready_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Item {
    /// unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sub-ledgers and Splits
// =============================================================================

/// A named partition of an account billed separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Subcuenta {
    pub name: String,
    pub is_paid: bool,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

/// One of N equal shares of the account total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitShare {
    /// 1-based share number.
    pub number: u32,
    pub subtotal: Money,
    pub total: Money,
    pub is_paid: bool,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Discount and Tip
// =============================================================================

/// Account-level discount as entered by the cashier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// A fixed amount off the subtotal.
    Fixed { amount: Money },
    /// Basis points of the subtotal (1000 = 10%).
    Percentage { bps: u32 },
}

impl Discount {
    /// Resolves the discount against the current subtotal.
    pub fn resolve(&self, subtotal: Money) -> Money {
        match self {
            Discount::Fixed { amount } => *amount,
            Discount::Percentage { bps } => subtotal.percentage(*bps),
        }
    }
}

/// How the tip amount was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TipKind {
    None,
    Fixed,
    Percentage,
}

impl Default for TipKind {
    fn default() -> Self {
        TipKind::None
    }
}

/// Tip as stored on the account: `{amount, percentage, type}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tip {
    pub kind: TipKind,
    pub percentage_bps: u32,
    pub amount: Money,
}

/// Tip as entered by the waiter or cashier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TipInput {
    None,
    Fixed { amount: Money },
    /// Basis points of the amount due after discount (1500 = 15%).
    Percentage { bps: u32 },
}

impl TipInput {
    /// Resolves the tip against the amount it is a percentage of.
    pub fn resolve(&self, base: Money) -> Tip {
        match self {
            TipInput::None => Tip::default(),
            TipInput::Fixed { amount } => Tip {
                kind: TipKind::Fixed,
                percentage_bps: 0,
                amount: *amount,
            },
            TipInput::Percentage { bps } => Tip {
                kind: TipKind::Percentage,
                percentage_bps: *bps,
                amount: base.non_negative().percentage(*bps),
            },
        }
    }
}

impl Tip {
    /// The input that reproduces this tip on recalculation.
    pub fn as_input(&self) -> TipInput {
        match self.kind {
            TipKind::None => TipInput::None,
            TipKind::Fixed => TipInput::Fixed {
                amount: self.amount,
            },
            TipKind::Percentage => TipInput::Percentage {
                bps: self.percentage_bps,
            },
        }
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// What a settlement paid for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SettlementTarget {
    /// The whole, undivided account.
    Account,
    /// A named sub-ledger.
    Subcuenta(String),
    /// The bucket of items with no sub-ledger.
    Unassigned,
    /// One equal-split share.
    Share(u32),
}

impl fmt::Display for SettlementTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementTarget::Account => f.write_str("account"),
            SettlementTarget::Subcuenta(name) => write!(f, "subcuenta:{}", name),
            SettlementTarget::Unassigned => f.write_str("unassigned"),
            SettlementTarget::Share(n) => write!(f, "share:{}", n),
        }
    }
}

/// How one instrument's money was credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InstrumentAllocation {
    pub method: PaymentMethod,
    /// Amount declared for this instrument.
    pub amount: Money,
    /// Amount physically handed over (cash may exceed `amount`).
    pub received: Money,
    /// Portion credited to the sale.
    pub sale_portion: Money,
    /// Portion credited to the tip.
    pub tip_portion: Money,
}

/// Append-only record of one successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Settlement {
    pub id: String,
    pub account_id: String,
    pub tenant_id: String,
    pub shift_id: Option<String>,
    pub target: SettlementTarget,
    pub method: PaymentMethod,
    /// Partition subtotal, share amount, or account subtotal.
    pub base_amount: Money,
    pub discount_applied: Money,
    /// `base_amount - discount_applied`.
    pub amount_due: Money,
    pub tip: Money,
    /// `amount_due + tip`.
    pub total_with_tip: Money,
    pub received: Money,
    pub change: Money,
    pub allocations: Vec<InstrumentAllocation>,
    pub actor: StaffRef,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
