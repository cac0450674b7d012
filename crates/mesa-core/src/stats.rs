//! # Shift Statistics
//!
//! A pure function over settlements: no hidden context, no storage access.
//! The caller loads the settlements (usually by shift id) and passes the
//! window explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentMethod, Settlement};

/// The shift being reported on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftWindow {
    /// Only settlements recorded under this shift, when set.
    pub shift_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound; `None` for a shift still running.
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

impl ShiftWindow {
    pub fn contains(&self, settlement: &Settlement) -> bool {
        if let Some(shift_id) = &self.shift_id {
            if settlement.shift_id.as_ref() != Some(shift_id) {
                return false;
            }
        }
        self.from.map_or(true, |from| settlement.created_at >= from)
            && self.to.map_or(true, |to| settlement.created_at < to)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodTotals {
    pub method: PaymentMethod,
    /// Settlements this method took part in.
    pub count: usize,
    pub sales: Money,
    pub tips: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftStats {
    pub settlement_count: usize,
    /// Σ amount due (sale after discount, before tip).
    pub sales_total: Money,
    pub tips_total: Money,
    pub discounts_total: Money,
    pub change_given: Money,
    /// Per instrument; mixed settlements contribute to each of theirs.
    pub by_method: Vec<MethodTotals>,
    pub average_ticket: Money,
}

/// Aggregates the settlements inside `window`.
pub fn compute_stats(settlements: &[Settlement], window: &ShiftWindow) -> ShiftStats {
    let mut by_method: Vec<MethodTotals> =
        [PaymentMethod::Cash, PaymentMethod::Card, PaymentMethod::Transfer]
            .into_iter()
            .map(|method| MethodTotals {
                method,
                count: 0,
                sales: Money::zero(),
                tips: Money::zero(),
            })
            .collect();

    let mut stats = ShiftStats {
        settlement_count: 0,
        sales_total: Money::zero(),
        tips_total: Money::zero(),
        discounts_total: Money::zero(),
        change_given: Money::zero(),
        by_method: Vec::new(),
        average_ticket: Money::zero(),
    };

    for settlement in settlements.iter().filter(|s| window.contains(s)) {
        stats.settlement_count += 1;
        stats.sales_total += settlement.amount_due;
        stats.tips_total += settlement.tip;
        stats.discounts_total += settlement.discount_applied;
        stats.change_given += settlement.change;

        for allocation in &settlement.allocations {
            if let Some(totals) = by_method.iter_mut().find(|t| t.method == allocation.method) {
                totals.count += 1;
                totals.sales += allocation.sale_portion;
                totals.tips += allocation.tip_portion;
            }
        }
    }

    if stats.settlement_count > 0 {
        stats.average_ticket =
            Money::from_cents(stats.sales_total.cents() / stats.settlement_count as i64);
    }
    stats.by_method = by_method.into_iter().filter(|t| t.count > 0).collect();
    stats
}
