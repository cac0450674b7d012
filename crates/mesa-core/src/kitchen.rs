//! # Kitchen Workflow
//!
//! Per-item status machine driven by the floor and the kitchen display.
//!
//! ```text
//!   pending ──send_to_kitchen──► preparing ──mark_ready──► ready
//!      │
//!      └──────cancel_item──────► cancelled
//! ```
//!
//! `send_to_kitchen` hands the kitchen a [`Comanda`] holding exactly the
//! items it moved. Kitchen displays poll [`kitchen_queue`]; nothing is
//! pushed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::account::Account;
use crate::error::{CoreError, CoreResult};
use crate::types::{Item, ItemStatus, StaffRef, TableRef};

/// One line on a comanda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ComandaItem {
    pub item_id: String,
    pub order_number: u32,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub note: Option<String>,
    pub subcuenta: Option<String>,
}

/// Kitchen-facing snapshot of the items that just entered preparation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Comanda {
    pub account_id: String,
    pub tables: Vec<TableRef>,
    pub waiter: StaffRef,
    pub items: Vec<ComandaItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Comanda {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Item counts per account on the kitchen display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct KitchenCounts {
    pub total: usize,
    pub preparing: usize,
    pub ready: usize,
}

/// One account as shown on the kitchen display.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct KitchenTicket {
    pub account_id: String,
    pub tables: Vec<TableRef>,
    pub waiter: StaffRef,
    pub items: Vec<Item>,
    pub counts: KitchenCounts,
    /// When the oldest item on the ticket was sent.
    #[ts(as = "Option<String>")]
    pub since: Option<DateTime<Utc>>,
}

impl Account {
    /// Moves every pending item to `preparing`.
    ///
    /// Items already preparing or ready are untouched. With nothing pending
    /// the comanda is empty and the account is not modified.
    pub fn send_to_kitchen(&mut self) -> CoreResult<Comanda> {
        self.ensure_active("send to kitchen")?;

        let now = Utc::now();
        let mut sent = Vec::new();
        for item in self
            .items
            .iter_mut()
            .filter(|i| i.status == ItemStatus::Pending)
        {
            item.status = ItemStatus::Preparing;
            item.sent_at = Some(now);
            sent.push(ComandaItem {
                item_id: item.id.clone(),
                order_number: item.order_number,
                name: item.name.clone(),
                category: item.category.clone(),
                quantity: item.quantity,
                note: item.note.clone(),
                subcuenta: item.subcuenta.clone(),
            });
        }

        if !sent.is_empty() {
            self.updated_at = now;
        }

        Ok(Comanda {
            account_id: self.id.clone(),
            tables: self.tables.clone(),
            waiter: self.waiter.clone(),
            items: sent,
            created_at: now,
        })
    }

    /// `preparing → ready` for one item.
    pub fn mark_ready(&mut self, item_id: &str) -> CoreResult<()> {
        self.ensure_active("mark item ready")?;

        let now = Utc::now();
        let item = self.item_mut(item_id)?;
        if !item.status.can_transition_to(ItemStatus::Ready) {
            return Err(CoreError::InvalidItemStatus {
                item_id: item.id.clone(),
                status: item.status,
                operation: "mark ready".to_string(),
            });
        }

        item.status = ItemStatus::Ready;
        item.ready_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Ticket for the kitchen display, or `None` when the kitchen has
    /// nothing of this account.
    pub fn kitchen_ticket(&self) -> Option<KitchenTicket> {
        if self.status.is_terminal() {
            return None;
        }

        let items: Vec<Item> = self
            .items
            .iter()
            .filter(|i| matches!(i.status, ItemStatus::Preparing | ItemStatus::Ready))
            .cloned()
            .collect();
        if items.is_empty() {
            return None;
        }

        let counts = KitchenCounts {
            total: items.len(),
            preparing: items
                .iter()
                .filter(|i| i.status == ItemStatus::Preparing)
                .count(),
            ready: items.iter().filter(|i| i.status == ItemStatus::Ready).count(),
        };
        let since = items.iter().filter_map(|i| i.sent_at).min();

        Some(KitchenTicket {
            account_id: self.id.clone(),
            tables: self.tables.clone(),
            waiter: self.waiter.clone(),
            items,
            counts,
            since,
        })
    }
}

/// Aggregated kitchen queue over a tenant's accounts, oldest first.
pub fn kitchen_queue(accounts: &[Account]) -> Vec<KitchenTicket> {
    let mut tickets: Vec<KitchenTicket> =
        accounts.iter().filter_map(Account::kitchen_ticket).collect();
    tickets.sort_by_key(|t| t.since);
    tickets
}

// =============================================================================
// Unit Tests
// =============================================================================
