//! # Sub-Ledger Manager
//!
//! Named partitions ("subcuentas") of an account, billed per diner.
//!
//! ## Partitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Account subtotal $300.00                                               │
//! │  ├── Ana        $120.00   ──► pays $108.00 (discount share $12.00)      │
//! │  ├── Luis       $ 90.00   ──► pays $ 81.00 (discount share $ 9.00)      │
//! │  └── unassigned $ 90.00   ──► pays $ 81.00 (remainder     $ 9.00)       │
//! │                                                                         │
//! │  Σ partitions == account subtotal   (cancelled items on neither side)   │
//! │  Σ discount shares == account discount                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Partition subtotals are derived, never stored. The discount share of a
//! partition is computed at payment time against the current account
//! subtotal; the last unsettled partition takes whatever is left so the
//! shares always add up to the account discount exactly.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::account::Account;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Item, Subcuenta};
use crate::validation::validate_subcuenta_name;

// =============================================================================
// Partition
// =============================================================================

/// A billable partition of an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Partition {
    /// A named sub-ledger.
    Named(String),
    /// Active items without a sub-ledger.
    Unassigned,
}

impl Partition {
    /// The partition an item currently belongs to.
    pub fn of(item: &Item) -> Partition {
        Partition::from_label(item.subcuenta.as_deref())
    }

    pub fn from_label(name: Option<&str>) -> Partition {
        match name {
            Some(name) => Partition::Named(name.to_string()),
            None => Partition::Unassigned,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Partition::Named(name) => Some(name),
            Partition::Unassigned => None,
        }
    }

    /// Label used in error messages and logs.
    pub fn label(&self) -> &str {
        self.name().unwrap_or("unassigned")
    }

    fn contains(&self, item: &Item) -> bool {
        item.subcuenta.as_deref() == self.name()
    }
}

// =============================================================================
// Summary
// =============================================================================

/// One partition as shown to the waiter.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartitionSummary {
    /// `None` for the unassigned bucket.
    pub name: Option<String>,
    pub subtotal: Money,
    pub items: Vec<Item>,
    pub is_paid: bool,
}

/// Result of [`Account::subcuenta_summary`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubcuentaSummary {
    pub subcuentas: Vec<PartitionSummary>,
    pub unassigned: PartitionSummary,
}

impl Account {
    // =========================================================================
    // Sub-ledger CRUD
    // =========================================================================

    /// Adds an empty sub-ledger. Names are unique and case-sensitive.
    pub fn add_subcuenta(&mut self, name: &str) -> CoreResult<()> {
        self.ensure_open("add subcuenta")?;
        let name = validate_subcuenta_name(name)?;

        if self.subcuentas.iter().any(|s| s.name == name) {
            return Err(ValidationError::Duplicate {
                field: "subcuenta".to_string(),
                value: name,
            }
            .into());
        }

        self.subcuentas.push(Subcuenta {
            name,
            is_paid: false,
            paid_at: None,
        });
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Removes an unpaid sub-ledger. Its items become unassigned.
    pub fn remove_subcuenta(&mut self, name: &str) -> CoreResult<()> {
        self.ensure_open("remove subcuenta")?;

        let subcuenta = self.subcuenta(name)?;
        if subcuenta.is_paid {
            return Err(CoreError::PartitionSettled {
                partition: subcuenta.name.clone(),
            });
        }

        let moves_active_items = self
            .active_items()
            .any(|i| i.subcuenta.as_deref() == Some(name));
        if moves_active_items && self.unassigned_paid {
            return Err(CoreError::PartitionSettled {
                partition: Partition::Unassigned.label().to_string(),
            });
        }

        self.subcuentas.retain(|s| s.name != name);
        for item in self.items.iter_mut() {
            if item.subcuenta.as_deref() == Some(name) {
                item.subcuenta = None;
            }
        }
        self.updated_at = chrono::Utc::now();
        self.promote_if_settled();
        Ok(())
    }

    pub fn subcuenta(&self, name: &str) -> CoreResult<&Subcuenta> {
        self.subcuentas
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CoreError::not_found("Subcuenta", name))
    }

    // =========================================================================
    // Partition Queries
    // =========================================================================

    /// Every partition: sub-ledgers in creation order, then unassigned.
    pub fn partitions(&self) -> Vec<Partition> {
        self.subcuentas
            .iter()
            .map(|s| Partition::Named(s.name.clone()))
            .chain(std::iter::once(Partition::Unassigned))
            .collect()
    }

    pub fn partition_items(&self, partition: &Partition) -> impl Iterator<Item = &Item> + '_ {
        let partition = partition.clone();
        self.active_items().filter(move |i| partition.contains(i))
    }

    pub fn partition_subtotal(&self, partition: &Partition) -> Money {
        self.partition_items(partition).map(Item::line_total).sum()
    }

    pub fn partition_is_paid(&self, partition: &Partition) -> bool {
        match partition {
            Partition::Named(name) => self
                .subcuentas
                .iter()
                .any(|s| &s.name == name && s.is_paid),
            Partition::Unassigned => self.unassigned_paid,
        }
    }

    /// Fails if the partition does not exist or is already paid.
    pub(crate) fn ensure_partition_writable(&self, partition: &Partition) -> CoreResult<()> {
        if let Partition::Named(name) = partition {
            self.subcuenta(name)?;
        }
        if self.partition_is_paid(partition) {
            return Err(CoreError::PartitionSettled {
                partition: partition.label().to_string(),
            });
        }
        Ok(())
    }

    /// A partition is settled once paid, or when it holds nothing to pay.
    pub(crate) fn partition_is_settled(&self, partition: &Partition) -> bool {
        self.partition_is_paid(partition) || !self.partition_subtotal(partition).is_positive()
    }

    /// Share of the account discount owed by `partition` right now.
    ///
    /// `round(discount × partition_subtotal / account_subtotal)`, except for
    /// the last unsettled partition, which receives the remainder of the
    /// discount not yet applied by earlier settlements.
    pub fn partition_discount(&self, partition: &Partition) -> Money {
        let subtotal = self.partition_subtotal(partition);
        if !subtotal.is_positive() || !self.discount_amount.is_positive() {
            return Money::zero();
        }

        let others_pending = self
            .partitions()
            .iter()
            .any(|p| p != partition && !self.partition_is_settled(p));

        let share = if others_pending {
            self.discount_amount.proportion(subtotal, self.subtotal)
        } else {
            let applied: Money = self.settlements.iter().map(|s| s.discount_applied).sum();
            (self.discount_amount - applied).non_negative()
        };
        share.min(subtotal)
    }

    // =========================================================================
    // Summary
    // =========================================================================

    /// Per-partition subtotals and items. Cancelled items are excluded.
    pub fn subcuenta_summary(&self) -> SubcuentaSummary {
        let summarize = |partition: &Partition| PartitionSummary {
            name: partition.name().map(str::to_string),
            subtotal: self.partition_subtotal(partition),
            items: self.partition_items(partition).cloned().collect(),
            is_paid: self.partition_is_paid(partition),
        };

        SubcuentaSummary {
            subcuentas: self
                .subcuentas
                .iter()
                .map(|s| summarize(&Partition::Named(s.name.clone())))
                .collect(),
            unassigned: summarize(&Partition::Unassigned),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::tests::{line, open_account, staff};
    use crate::account::ItemChanges;
    use crate::payment::PaymentRequest;
    use crate::types::{Discount, PaymentMethod};

    #[test]
    fn test_add_and_remove_subcuenta() {
        let mut account = open_account();
        account.add_subcuenta(" Ana ").unwrap();
        account.add_subcuenta("ana").unwrap();
        assert_eq!(account.subcuentas[0].name, "Ana");

        let err = account.add_subcuenta("Ana").unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::Duplicate { .. })));
        assert!(account.add_subcuenta("").is_err());

        account
            .add_order(vec![line("p1", 1000, 1, Some("Ana"))], &staff())
            .unwrap();
        account.remove_subcuenta("Ana").unwrap();

        assert_eq!(account.subcuentas.len(), 1);
        assert_eq!(account.items[0].subcuenta, None);
        assert_eq!(account.subtotal.cents(), 1000);
        assert!(matches!(
            account.remove_subcuenta("Ana"),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_cancelled_only_item_keeps_empty_subcuenta() {
        let mut account = open_account();
        account.add_subcuenta("Ana").unwrap();
        account
            .add_order(vec![line("p1", 4500, 1, Some("Ana"))], &staff())
            .unwrap();
        let id = account.items[0].id.clone();
        account.cancel_item(&id, "wrong dish").unwrap();

        let summary = account.subcuenta_summary();
        assert_eq!(summary.subcuentas.len(), 1);
        assert_eq!(summary.subcuentas[0].name.as_deref(), Some("Ana"));
        assert_eq!(summary.subcuentas[0].subtotal, Money::zero());
        assert!(summary.subcuentas[0].items.is_empty());
        assert!(!summary.subcuentas[0].is_paid);
    }

    #[test]
    fn test_partition_completeness() {
        let mut account = open_account();
        account.add_subcuenta("Ana").unwrap();
        account.add_subcuenta("Luis").unwrap();
        account
            .add_order(
                vec![
                    line("p1", 1200, 2, Some("Ana")),
                    line("p2", 850, 1, Some("Luis")),
                    line("p3", 333, 3, None),
                    line("p4", 999, 1, Some("Luis")),
                ],
                &staff(),
            )
            .unwrap();
        let cancelled = account.items[3].id.clone();
        account.cancel_item(&cancelled, "out of stock").unwrap();

        let summary = account.subcuenta_summary();
        let total: Money = summary
            .subcuentas
            .iter()
            .map(|s| s.subtotal)
            .chain(std::iter::once(summary.unassigned.subtotal))
            .sum();
        assert_eq!(total, account.subtotal);
        assert_eq!(summary.unassigned.subtotal.cents(), 999);
    }

    #[test]
    fn test_discount_shares_sum_to_discount() {
        let mut account = open_account();
        account.add_subcuenta("A").unwrap();
        account.add_subcuenta("B").unwrap();
        account
            .add_order(
                vec![
                    line("p1", 1000, 1, Some("A")),
                    line("p2", 1000, 1, Some("B")),
                    line("p3", 1000, 1, None),
                ],
                &staff(),
            )
            .unwrap();
        account
            .apply_discount(Some(Discount::Fixed {
                amount: Money::from_cents(1000),
            }))
            .unwrap();

        // 1000 / 3 does not divide evenly.
        assert_eq!(account.partition_discount(&Partition::Named("A".into())).cents(), 333);

        let mut applied = Money::zero();
        for partition in account.partitions() {
            let due = account.partition_subtotal(&partition) - account.partition_discount(&partition);
            let settlement = account
                .pay_partition(
                    partition,
                    PaymentRequest::single(PaymentMethod::Card, Some(due)),
                    &staff(),
                )
                .unwrap();
            applied += settlement.discount_applied;
        }
        assert_eq!(applied.cents(), 1000);
    }

    #[test]
    fn test_reassignment_into_paid_subcuenta_rejected() {
        let mut account = open_account();
        account.add_subcuenta("Ana").unwrap();
        account
            .add_order(
                vec![line("p1", 1000, 1, Some("Ana")), line("p2", 500, 1, None)],
                &staff(),
            )
            .unwrap();
        account
            .pay_partition(
                Partition::Named("Ana".into()),
                PaymentRequest::single(PaymentMethod::Cash, None),
                &staff(),
            )
            .unwrap();

        let loose = account.items[1].id.clone();
        let err = account
            .edit_item(
                &loose,
                ItemChanges {
                    subcuenta: Some("Ana".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::PartitionSettled { .. }));

        let err = account
            .add_order(vec![line("p3", 100, 1, Some("Ana"))], &staff())
            .unwrap_err();
        assert!(matches!(err, CoreError::PartitionSettled { .. }));

        let err = account.remove_subcuenta("Ana").unwrap_err();
        assert!(matches!(err, CoreError::PartitionSettled { .. }));
    }
}
