//! # Preliminary Bill
//!
//! Itemized, read-only snapshot handed to the diners before they pay.
//! Identical lines (same product, unit price and note) are grouped.
//! Rendering and printing happen elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::account::Account;
use crate::error::CoreResult;
use crate::money::Money;
use crate::subledger::Partition;
use crate::types::{AccountStatus, SplitShare, StaffRef, TableRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub note: Option<String>,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PreliminaryBill {
    pub account_id: String,
    pub tables: Vec<TableRef>,
    pub waiter: StaffRef,
    pub status: AccountStatus,
    /// The partition this bill covers; `None` for the whole account.
    pub partition: Option<Partition>,
    pub lines: Vec<BillLine>,
    pub subtotal: Money,
    pub discount: Money,
    pub tip: Money,
    pub total: Money,
    pub shares: Option<Vec<SplitShare>>,
    #[ts(as = "String")]
    pub generated_at: DateTime<Utc>,
}

impl Account {
    /// Builds the preliminary bill for the whole account or one partition.
    ///
    /// A partition bill carries the partition's current discount share and
    /// no tip; the tip is chosen when the partition is paid.
    pub fn preliminary_bill(&self, filter: Option<Partition>) -> CoreResult<PreliminaryBill> {
        if let Some(Partition::Named(name)) = &filter {
            self.subcuenta(name)?;
        }

        let mut lines: Vec<BillLine> = Vec::new();
        let items: Vec<_> = match &filter {
            Some(partition) => self.partition_items(partition).collect(),
            None => self.active_items().collect(),
        };
        for item in items {
            match lines.iter_mut().find(|l| {
                l.product_id == item.product_id
                    && l.unit_price == item.unit_price
                    && l.note == item.note
            }) {
                Some(line) => {
                    line.quantity += item.quantity;
                    line.amount += item.line_total();
                }
                None => lines.push(BillLine {
                    product_id: item.product_id.clone(),
                    name: item.name.clone(),
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    note: item.note.clone(),
                    amount: item.line_total(),
                }),
            }
        }

        let (subtotal, discount, tip) = match &filter {
            Some(partition) => (
                self.partition_subtotal(partition),
                self.partition_discount(partition),
                Money::zero(),
            ),
            None => (self.subtotal, self.discount_amount, self.tip.amount),
        };

        Ok(PreliminaryBill {
            account_id: self.id.clone(),
            tables: self.tables.clone(),
            waiter: self.waiter.clone(),
            status: self.status,
            partition: filter,
            lines,
            subtotal,
            discount,
            tip,
            total: subtotal - discount + tip,
            shares: self.split.clone(),
            generated_at: Utc::now(),
        })
    }
}
