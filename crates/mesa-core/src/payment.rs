//! # Payment Allocator
//!
//! Settles the whole account, one partition, or one split share.
//!
//! ## Settlement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  base amount (subtotal │ partition subtotal │ share total)              │
//! │       │                                                                 │
//! │       ▼  − discount share (zero for split shares)                       │
//! │  amount due                                                             │
//! │       │                                                                 │
//! │       ▼  + tip                                                          │
//! │  total with tip ──► reconcile(instruments) ──► Settlement (append-only) │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                        mark partition paid, maybe promote to `paid`     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tip Cascade
//! For mixed payments the tip is carved out of the declared instrument
//! amounts in a fixed priority order: cash, then transfer, then card.
//!
//! ```text
//! amount due $270.00, tip $40.50, declared cash $200 + transfer $60 + card $50.50
//!
//!   cash      $200.00 → tip $40.50, sale $159.50
//!   transfer  $ 60.00 → tip $ 0.00, sale $ 60.00
//!   card      $ 50.50 → tip $ 0.00, sale $ 50.50
//!                        ─────────       ───────
//!                        $40.50          $270.00
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::account::{validate_tip, Account};
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, PAYMENT_TOLERANCE};
use crate::subledger::Partition;
use crate::types::{
    AccountStatus, InstrumentAllocation, PaymentMethod, Settlement, SettlementTarget, StaffRef,
    TipInput,
};
use crate::validation::validate_amount;

/// Maximum instruments in one mixed payment.
pub const MAX_INSTRUMENTS: usize = 3;

// =============================================================================
// Request Types
// =============================================================================

/// One instrument of a mixed payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InstrumentAmount {
    pub method: PaymentMethod,
    /// Amount credited to this instrument.
    pub amount: Money,
    /// Cash handed over; may exceed `amount`, the excess is change.
    pub received: Option<Money>,
}

/// A payment as entered by the cashier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentRequest {
    pub method: PaymentMethod,
    /// Money handed over for single-instrument payments. Missing means
    /// exactly the amount owed.
    pub received: Option<Money>,
    /// Breakdown, required for `mixed` and rejected otherwise.
    #[serde(default)]
    pub instruments: Vec<InstrumentAmount>,
    /// Tip for this payment. Whole-account payments replace the account
    /// tip with it; partition payments use it as their own tip; share
    /// payments add it on top of the share.
    pub tip: Option<TipInput>,
}

impl PaymentRequest {
    pub fn single(method: PaymentMethod, received: Option<Money>) -> Self {
        PaymentRequest {
            method,
            received,
            instruments: Vec::new(),
            tip: None,
        }
    }

    pub fn mixed(instruments: Vec<InstrumentAmount>) -> Self {
        PaymentRequest {
            method: PaymentMethod::Mixed,
            received: None,
            instruments,
            tip: None,
        }
    }

    pub fn with_tip(mut self, tip: TipInput) -> Self {
        self.tip = Some(tip);
        self
    }
}

/// Outcome of reconciling declared money against what is owed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub allocations: Vec<InstrumentAllocation>,
    pub received: Money,
    pub change: Money,
}

// =============================================================================
// Pure Allocation
// =============================================================================

/// Carves `tip` out of the instrument amounts, cash first, then transfer,
/// then card. Allocations are returned in that priority order.
///
/// Each instrument gives `min(amount, remaining tip)` to the tip and the
/// rest to the sale.
pub fn cascade_tip(instruments: &[(PaymentMethod, Money)], tip: Money) -> Vec<InstrumentAllocation> {
    let mut ordered = instruments.to_vec();
    ordered.sort_by_key(|(method, _)| method.tip_priority());

    let mut remaining = tip.non_negative();
    ordered
        .into_iter()
        .map(|(method, amount)| {
            let tip_portion = amount.min(remaining).non_negative();
            remaining -= tip_portion;
            InstrumentAllocation {
                method,
                amount,
                received: amount,
                sale_portion: amount - tip_portion,
                tip_portion,
            }
        })
        .collect()
}

/// Checks the declared payment against `amount_due + tip`.
///
/// - cash: received must cover the total, the excess is change
/// - card / transfer: received must equal the total
/// - mixed: Σ instrument amounts must equal the total; the tip is cascaded
///
/// Every equality allows one minor unit of rounding tolerance.
pub fn reconcile(
    request: &PaymentRequest,
    amount_due: Money,
    tip: Money,
) -> CoreResult<Reconciliation> {
    let total_with_tip = amount_due + tip;

    match request.method {
        PaymentMethod::Mixed => reconcile_mixed(&request.instruments, total_with_tip, tip),
        method => {
            if !request.instruments.is_empty() {
                return Err(ValidationError::NotAllowed {
                    field: "instruments".to_string(),
                    allowed: vec!["mixed".to_string()],
                }
                .into());
            }

            let received = request.received.unwrap_or(total_with_tip);
            validate_amount("received", received)?;

            let change = if method == PaymentMethod::Cash {
                if received + PAYMENT_TOLERANCE < total_with_tip {
                    return Err(CoreError::mismatch(total_with_tip, received));
                }
                (received - total_with_tip).non_negative()
            } else {
                if !received.within(total_with_tip, PAYMENT_TOLERANCE) {
                    return Err(CoreError::mismatch(total_with_tip, received));
                }
                Money::zero()
            };

            Ok(Reconciliation {
                allocations: vec![InstrumentAllocation {
                    method,
                    amount: total_with_tip,
                    received,
                    sale_portion: amount_due,
                    tip_portion: tip,
                }],
                received,
                change,
            })
        }
    }
}

fn reconcile_mixed(
    instruments: &[InstrumentAmount],
    total_with_tip: Money,
    tip: Money,
) -> CoreResult<Reconciliation> {
    if instruments.is_empty() {
        return Err(ValidationError::Required {
            field: "instruments".to_string(),
        }
        .into());
    }
    if instruments.len() > MAX_INSTRUMENTS {
        return Err(ValidationError::OutOfRange {
            field: "instruments".to_string(),
            min: 1,
            max: MAX_INSTRUMENTS as i64,
        }
        .into());
    }

    let mut seen = HashSet::new();
    for instrument in instruments {
        if instrument.method == PaymentMethod::Mixed {
            return Err(ValidationError::NotAllowed {
                field: "instrument method".to_string(),
                allowed: vec!["cash".into(), "transfer".into(), "card".into()],
            }
            .into());
        }
        if !seen.insert(instrument.method) {
            return Err(ValidationError::Duplicate {
                field: "instrument".to_string(),
                value: instrument.method.to_string(),
            }
            .into());
        }
        validate_amount(instrument.method.as_str(), instrument.amount)?;
        if let Some(received) = instrument.received {
            validate_amount("received", received)?;
            if instrument.method != PaymentMethod::Cash && received != instrument.amount {
                return Err(ValidationError::InvalidFormat {
                    field: instrument.method.to_string(),
                    reason: "only cash may receive more than its amount".to_string(),
                }
                .into());
            }
            if received < instrument.amount {
                return Err(CoreError::mismatch(instrument.amount, received));
            }
        }
    }

    let declared: Money = instruments.iter().map(|i| i.amount).sum();
    if !declared.within(total_with_tip, PAYMENT_TOLERANCE) {
        return Err(CoreError::mismatch(total_with_tip, declared));
    }

    let pairs: Vec<(PaymentMethod, Money)> =
        instruments.iter().map(|i| (i.method, i.amount)).collect();
    let mut allocations = cascade_tip(&pairs, tip);

    let mut change = Money::zero();
    for allocation in allocations.iter_mut() {
        let received = instruments
            .iter()
            .find(|i| i.method == allocation.method)
            .and_then(|i| i.received)
            .unwrap_or(allocation.amount);
        change += received - allocation.amount;
        allocation.received = received;
    }
    let received = allocations.iter().map(|a| a.received).sum();

    Ok(Reconciliation {
        allocations,
        received,
        change,
    })
}

// =============================================================================
// Settling an Account
// =============================================================================

/// Amounts owed by one settlement target.
struct Due {
    base: Money,
    discount: Money,
    tip: Money,
}

impl Account {
    /// Pays the whole, undivided account in one shot.
    ///
    /// Rejected once the account is split or any partition has been paid;
    /// the remaining partitions must then be settled individually.
    pub fn pay_account(
        &mut self,
        request: PaymentRequest,
        actor: &StaffRef,
    ) -> CoreResult<Settlement> {
        self.ensure_active("pay account")?;
        if self.is_split || self.has_settlements() {
            return Err(self.invalid_state("pay the whole account after partial payments"));
        }

        let mut draft = self.clone();
        if let Some(tip) = request.tip {
            validate_tip(&tip)?;
            draft.tip = tip.resolve(draft.subtotal - draft.discount_amount);
            draft.recalculate();
        }

        let due = Due {
            base: draft.subtotal,
            discount: draft.discount_amount,
            tip: draft.tip.amount,
        };
        let settlement = draft.record(SettlementTarget::Account, due, &request, actor)?;

        let now = settlement.created_at;
        for subcuenta in draft.subcuentas.iter_mut() {
            subcuenta.is_paid = true;
            subcuenta.paid_at = Some(now);
        }
        draft.unassigned_paid = true;
        draft.promote_if_settled();

        *self = draft;
        Ok(settlement)
    }

    /// Pays one sub-ledger or the unassigned bucket.
    ///
    /// The discount share is computed now, against the current subtotal.
    /// The request's tip, if any, is the tip for this partition alone.
    pub fn pay_partition(
        &mut self,
        partition: Partition,
        request: PaymentRequest,
        actor: &StaffRef,
    ) -> CoreResult<Settlement> {
        self.ensure_active("pay subcuenta")?;
        if self.is_split {
            return Err(self.invalid_state("pay a subcuenta of a split account"));
        }
        self.ensure_partition_writable(&partition)?;

        let base = self.partition_subtotal(&partition);
        if !base.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: format!("{} subtotal", partition.label()),
            }
            .into());
        }

        let discount = self.partition_discount(&partition);
        let tip_input = request.tip.unwrap_or(TipInput::None);
        validate_tip(&tip_input)?;
        let tip = tip_input.resolve(base - discount).amount;

        let target = match &partition {
            Partition::Named(name) => SettlementTarget::Subcuenta(name.clone()),
            Partition::Unassigned => SettlementTarget::Unassigned,
        };
        let settlement = self.record(target, Due { base, discount, tip }, &request, actor)?;

        let now = settlement.created_at;
        match &partition {
            Partition::Named(name) => {
                if let Some(subcuenta) = self.subcuentas.iter_mut().find(|s| &s.name == name) {
                    subcuenta.is_paid = true;
                    subcuenta.paid_at = Some(now);
                }
            }
            Partition::Unassigned => self.unassigned_paid = true,
        }
        self.promote_if_settled();
        Ok(settlement)
    }

    /// Pays one equal-split share. The share already includes its part of
    /// the discount and account tip; the request may add an extra tip.
    pub fn pay_split(
        &mut self,
        number: u32,
        request: PaymentRequest,
        actor: &StaffRef,
    ) -> CoreResult<Settlement> {
        self.ensure_active("pay split share")?;
        if !self.is_split {
            return Err(self.invalid_state("pay a share of an account that is not split"));
        }

        let share = self.share(number)?;
        if share.is_paid {
            return Err(CoreError::PartitionSettled {
                partition: format!("share {}", number),
            });
        }
        let base = share.total;

        let tip_input = request.tip.unwrap_or(TipInput::None);
        validate_tip(&tip_input)?;
        let tip = tip_input.resolve(base).amount;

        let settlement = self.record(
            SettlementTarget::Share(number),
            Due {
                base,
                discount: Money::zero(),
                tip,
            },
            &request,
            actor,
        )?;

        let now = settlement.created_at;
        if let Some(share) = self
            .split
            .as_mut()
            .and_then(|shares| shares.iter_mut().find(|s| s.number == number))
        {
            share.is_paid = true;
            share.paid_at = Some(now);
        }
        self.promote_if_settled();
        Ok(settlement)
    }

    /// True when nothing is left to pay.
    ///
    /// - the undivided account was paid in one shot, or
    /// - every split share is paid, or
    /// - every partition with a positive subtotal is paid
    pub fn is_fully_settled(&self) -> bool {
        if self
            .settlements
            .iter()
            .any(|s| s.target == SettlementTarget::Account)
        {
            return true;
        }
        if self.is_split {
            return !self.shares().is_empty() && self.shares().iter().all(|s| s.is_paid);
        }
        self.has_settlements()
            && self
                .partitions()
                .iter()
                .all(|p| self.partition_is_settled(p))
    }

    /// Marks the account paid once nothing is left to pay. Also runs after
    /// edits that can empty the last unpaid partition.
    pub(crate) fn promote_if_settled(&mut self) {
        if self.is_fully_settled() {
            let now = Utc::now();
            self.status = AccountStatus::Paid;
            self.paid_at = Some(now);
            self.updated_at = now;
        }
    }

    /// Reconciles the request and appends the settlement. Writes nothing
    /// on error.
    fn record(
        &mut self,
        target: SettlementTarget,
        due: Due,
        request: &PaymentRequest,
        actor: &StaffRef,
    ) -> CoreResult<Settlement> {
        let amount_due = due.base - due.discount;
        let reconciliation = reconcile(request, amount_due, due.tip)?;

        let settlement = Settlement {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: self.id.clone(),
            tenant_id: self.tenant_id.clone(),
            shift_id: self.shift_id.clone(),
            target,
            method: request.method,
            base_amount: due.base,
            discount_applied: due.discount,
            amount_due,
            tip: due.tip,
            total_with_tip: amount_due + due.tip,
            received: reconciliation.received,
            change: reconciliation.change,
            allocations: reconciliation.allocations,
            actor: actor.clone(),
            created_at: Utc::now(),
        };

        self.settlements.push(settlement.clone());
        self.updated_at = settlement.created_at;
        Ok(settlement)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::tests::{line, open_account, staff};
    use crate::types::Discount;

    fn cents(value: i64) -> Money {
        Money::from_cents(value)
    }

    fn instrument(method: PaymentMethod, amount: i64) -> InstrumentAmount {
        InstrumentAmount {
            method,
            amount: cents(amount),
            received: None,
        }
    }

    fn account_of_300() -> Account {
        let mut account = open_account();
        account.add_order(vec![line("p1", 30000, 1, None)], &staff()).unwrap();
        account
            .apply_discount(Some(Discount::Fixed { amount: cents(3000) }))
            .unwrap();
        account.apply_tip(TipInput::Percentage { bps: 1500 }).unwrap();
        account
    }

    #[test]
    fn test_mixed_payment_tip_cascade() {
        let mut account = account_of_300();
        assert_eq!(account.total, cents(31050));

        let request = PaymentRequest::mixed(vec![
            instrument(PaymentMethod::Card, 5050),
            instrument(PaymentMethod::Cash, 20000),
            instrument(PaymentMethod::Transfer, 6000),
        ]);
        let settlement = account.pay_account(request, &staff()).unwrap();

        let by_method = |m: PaymentMethod| {
            settlement
                .allocations
                .iter()
                .find(|a| a.method == m)
                .cloned()
                .unwrap()
        };
        assert_eq!(by_method(PaymentMethod::Cash).sale_portion, cents(15950));
        assert_eq!(by_method(PaymentMethod::Cash).tip_portion, cents(4050));
        assert_eq!(by_method(PaymentMethod::Transfer).sale_portion, cents(6000));
        assert_eq!(by_method(PaymentMethod::Card).sale_portion, cents(5050));

        let sales: Money = settlement.allocations.iter().map(|a| a.sale_portion).sum();
        let tips: Money = settlement.allocations.iter().map(|a| a.tip_portion).sum();
        assert_eq!(sales, cents(27000));
        assert_eq!(sales, settlement.amount_due);
        assert_eq!(tips, cents(4050));

        assert_eq!(account.status, AccountStatus::Paid);
        assert_eq!(account.settlements.len(), 1);
    }

    #[test]
    fn test_tip_cascade_spills_into_next_instrument() {
        let allocations = cascade_tip(
            &[
                (PaymentMethod::Card, cents(8000)),
                (PaymentMethod::Transfer, cents(1000)),
                (PaymentMethod::Cash, cents(500)),
            ],
            cents(2000),
        );
        let tips: Vec<i64> = allocations.iter().map(|a| a.tip_portion.cents()).collect();
        let methods: Vec<PaymentMethod> = allocations.iter().map(|a| a.method).collect();
        assert_eq!(
            methods,
            vec![PaymentMethod::Cash, PaymentMethod::Transfer, PaymentMethod::Card]
        );
        assert_eq!(tips, vec![500, 1000, 500]);
        assert_eq!(
            allocations.iter().map(|a| a.sale_portion).sum::<Money>(),
            cents(7500)
        );
    }

    #[test]
    fn test_mixed_payment_mismatch_reports_difference() {
        let mut account = account_of_300();
        let request = PaymentRequest::mixed(vec![
            instrument(PaymentMethod::Cash, 20000),
            instrument(PaymentMethod::Card, 10000),
        ]);
        let err = account.pay_account(request, &staff()).unwrap_err();

        match err {
            CoreError::PaymentMismatch {
                expected,
                declared,
                difference,
            } => {
                assert_eq!(expected, cents(31050));
                assert_eq!(declared, cents(30000));
                assert_eq!(difference, cents(-1050));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(account.status, AccountStatus::Open);
        assert!(account.settlements.is_empty());
    }

    #[test]
    fn test_mixed_payment_tolerates_one_cent() {
        let request = PaymentRequest::mixed(vec![
            instrument(PaymentMethod::Cash, 5000),
            instrument(PaymentMethod::Card, 4999),
        ]);
        assert!(reconcile(&request, cents(10000), Money::zero()).is_ok());

        let request = PaymentRequest::mixed(vec![
            instrument(PaymentMethod::Cash, 5000),
            instrument(PaymentMethod::Card, 4998),
        ]);
        assert!(reconcile(&request, cents(10000), Money::zero()).is_err());
    }

    #[test]
    fn test_mixed_payment_rejects_duplicates_and_negatives() {
        let request = PaymentRequest::mixed(vec![
            instrument(PaymentMethod::Cash, 5000),
            instrument(PaymentMethod::Cash, 5000),
        ]);
        assert!(matches!(
            reconcile(&request, cents(10000), Money::zero()),
            Err(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));

        let request = PaymentRequest::mixed(vec![
            instrument(PaymentMethod::Cash, 10500),
            instrument(PaymentMethod::Card, -500),
        ]);
        assert!(matches!(
            reconcile(&request, cents(10000), Money::zero()),
            Err(CoreError::Validation(_))
        ));

        assert!(reconcile(&PaymentRequest::mixed(vec![]), cents(100), Money::zero()).is_err());
    }

    #[test]
    fn test_cash_returns_change_and_card_must_be_exact() {
        let request = PaymentRequest::single(PaymentMethod::Cash, Some(cents(50000)));
        let result = reconcile(&request, cents(27000), cents(4050)).unwrap();
        assert_eq!(result.change, cents(18950));
        assert_eq!(result.received, cents(50000));

        let request = PaymentRequest::single(PaymentMethod::Cash, Some(cents(30000)));
        assert!(matches!(
            reconcile(&request, cents(27000), cents(4050)),
            Err(CoreError::PaymentMismatch { .. })
        ));

        let request = PaymentRequest::single(PaymentMethod::Card, Some(cents(31100)));
        assert!(reconcile(&request, cents(27000), cents(4050)).is_err());

        let request = PaymentRequest::single(PaymentMethod::Transfer, None);
        let result = reconcile(&request, cents(27000), cents(4050)).unwrap();
        assert_eq!(result.change, Money::zero());
        assert_eq!(result.allocations[0].tip_portion, cents(4050));
    }

    #[test]
    fn test_mixed_cash_received_gives_change() {
        let request = PaymentRequest::mixed(vec![
            InstrumentAmount {
                method: PaymentMethod::Cash,
                amount: cents(4000),
                received: Some(cents(5000)),
            },
            instrument(PaymentMethod::Card, 6000),
        ]);
        let result = reconcile(&request, cents(10000), Money::zero()).unwrap();
        assert_eq!(result.change, cents(1000));
        assert_eq!(result.received, cents(11000));
    }

    #[test]
    fn test_subcuenta_payments_settle_account() {
        let mut account = open_account();
        account.add_subcuenta("Ana").unwrap();
        account.add_subcuenta("Luis").unwrap();
        account
            .add_order(
                vec![line("p1", 12000, 1, Some("Ana")), line("p2", 8000, 1, Some("Luis"))],
                &staff(),
            )
            .unwrap();
        account.request_bill().unwrap();

        let settlement = account
            .pay_partition(
                Partition::Named("Ana".into()),
                PaymentRequest::single(PaymentMethod::Card, None)
                    .with_tip(TipInput::Percentage { bps: 1000 }),
                &staff(),
            )
            .unwrap();
        assert_eq!(settlement.amount_due, cents(12000));
        assert_eq!(settlement.tip, cents(1200));
        assert_eq!(settlement.total_with_tip, cents(13200));
        assert_eq!(account.status, AccountStatus::ClosedPending);

        // Paying twice is rejected.
        let err = account
            .pay_partition(
                Partition::Named("Ana".into()),
                PaymentRequest::single(PaymentMethod::Card, None),
                &staff(),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::PartitionSettled { .. }));

        // Whole-account payment is no longer possible.
        assert!(matches!(
            account.pay_account(PaymentRequest::single(PaymentMethod::Cash, None), &staff()),
            Err(CoreError::InvalidState { .. })
        ));

        // Empty unassigned bucket cannot be paid.
        assert!(account
            .pay_partition(
                Partition::Unassigned,
                PaymentRequest::single(PaymentMethod::Cash, None),
                &staff(),
            )
            .is_err());

        account
            .pay_partition(
                Partition::Named("Luis".into()),
                PaymentRequest::single(PaymentMethod::Cash, Some(cents(10000))),
                &staff(),
            )
            .unwrap();
        assert_eq!(account.status, AccountStatus::Paid);
        assert_eq!(account.settlements.len(), 2);
    }

    #[test]
    fn test_discount_and_tip_frozen_after_payment() {
        let mut account = open_account();
        account.add_subcuenta("Ana").unwrap();
        account
            .add_order(
                vec![line("p1", 1000, 1, Some("Ana")), line("p2", 1000, 1, None)],
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

        assert!(matches!(
            account.apply_discount(None),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            account.apply_tip(TipInput::None),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            account.configure_split(2),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_split_share_rejects_double_payment_and_unknown_share() {
        let mut account = open_account();
        account.add_order(vec![line("p1", 15000, 1, None)], &staff()).unwrap();
        account.configure_split(2).unwrap();

        let settlement = account
            .pay_split(
                1,
                PaymentRequest::single(PaymentMethod::Cash, None)
                    .with_tip(TipInput::Fixed { amount: cents(500) }),
                &staff(),
            )
            .unwrap();
        assert_eq!(settlement.amount_due, cents(7500));
        assert_eq!(settlement.total_with_tip, cents(8000));
        assert_eq!(settlement.discount_applied, Money::zero());

        assert!(matches!(
            account.pay_split(1, PaymentRequest::single(PaymentMethod::Cash, None), &staff()),
            Err(CoreError::PartitionSettled { .. })
        ));
        assert!(matches!(
            account.pay_split(9, PaymentRequest::single(PaymentMethod::Cash, None), &staff()),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            account.pay_partition(
                Partition::Unassigned,
                PaymentRequest::single(PaymentMethod::Cash, None),
                &staff()
            ),
            Err(CoreError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_pay_account_with_tip_override() {
        let mut account = open_account();
        account.add_order(vec![line("p1", 10000, 1, None)], &staff()).unwrap();
        let settlement = account
            .pay_account(
                PaymentRequest::single(PaymentMethod::Card, None)
                    .with_tip(TipInput::Fixed { amount: cents(1500) }),
                &staff(),
            )
            .unwrap();
        assert_eq!(settlement.tip, cents(1500));
        assert_eq!(account.total, cents(11500));
        assert_eq!(account.status, AccountStatus::Paid);
        assert!(account.unassigned_paid);
    }

    #[test]
    fn test_cancelling_last_unpaid_item_settles_account() {
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
        assert_eq!(account.status, AccountStatus::Open);

        let unassigned = account.items[1].id.clone();
        account.cancel_item(&unassigned, "guest left").unwrap();

        assert!(account.is_fully_settled());
        assert_eq!(account.status, AccountStatus::Paid);
        assert!(account.paid_at.is_some());
        assert_eq!(account.settlements.len(), 1);
    }

    #[test]
    fn test_moving_last_unpaid_item_settles_account() {
        let mut account = open_account();
        account.add_subcuenta("Ana").unwrap();
        account.add_subcuenta("Luis").unwrap();
        account
            .add_order(
                vec![line("p1", 1000, 1, Some("Ana")), line("p2", 500, 1, Some("Luis"))],
                &staff(),
            )
            .unwrap();
        account
            .pay_partition(
                Partition::Named("Ana".into()),
                PaymentRequest::single(PaymentMethod::Card, None),
                &staff(),
            )
            .unwrap();

        // Luis's item is still pending, so the account stays open.
        account.remove_subcuenta("Luis").unwrap();
        assert_eq!(account.status, AccountStatus::Open);

        let item = account.items[1].id.clone();
        account.cancel_item(&item, "wrong dish").unwrap();
        assert_eq!(account.status, AccountStatus::Paid);
    }
}
