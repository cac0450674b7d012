//! # mesa-core: Pure Business Logic for Mesa POS
//!
//! The account lifecycle and payment-reconciliation engine for table-service
//! venues. Zero I/O: every operation mutates an owned [`Account`] value and
//! either succeeds completely or returns an error leaving it untouched.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mesa POS Architecture                            │
//! │                                                                         │
//! │  Waiter tablet / cashier / kitchen display (HTTP JSON)                  │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  mesa-server: AccountService (one writer lock per account)      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mesa-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │  account ── subledger ── split ── kitchen ── payment ── bill    │   │
//! │  │  money ── types ── validation ── stats                          │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │  mesa-db: account documents, settlement ledger, catalog         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`account`] - Account aggregate, lifecycle guards, item & order model
//! - [`subledger`] - Per-diner partitions (subcuentas) and discount shares
//! - [`split`] - Equal monetary shares
//! - [`kitchen`] - Item status workflow, comandas and the kitchen queue
//! - [`payment`] - Payment allocator and tip cascade
//! - [`bill`] - Preliminary bill snapshots
//! - [`stats`] - Shift statistics over settlements
//! - [`money`] - Integer-cent money type
//!
//! ## Example Usage
//!
//! ```rust
//! use mesa_core::money::Money;
//! use mesa_core::payment::cascade_tip;
//! use mesa_core::PaymentMethod;
//!
//! // Tip $40.50 carved from cash first, then transfer, then card.
//! let allocations = cascade_tip(
//!     &[
//!         (PaymentMethod::Card, Money::from_cents(5050)),
//!         (PaymentMethod::Cash, Money::from_cents(20000)),
//!         (PaymentMethod::Transfer, Money::from_cents(6000)),
//!     ],
//!     Money::from_cents(4050),
//! );
//! assert_eq!(allocations[0].sale_portion.cents(), 15950); // cash
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod account;
pub mod bill;
pub mod error;
pub mod kitchen;
pub mod money;
pub mod payment;
pub mod split;
pub mod stats;
pub mod subledger;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use account::{Account, ItemChanges, NewAccount, OrderLine};
pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use subledger::Partition;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines in a single order round.
pub const MAX_ORDER_LINES: usize = 100;

/// Maximum quantity of a single line.
///
/// Prevents accidental over-ordering (typing 100 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of equal shares.
pub const MAX_SPLIT_SHARES: u32 = 20;

/// Maximum diners on one account.
pub const MAX_GUEST_COUNT: u32 = 99;

/// Largest single amount accepted from a client or the catalog, in cents
/// ($10,000,000.00).
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000;
