//! # Equal-Split Manager
//!
//! Divides the account total into N equal monetary shares, independent of
//! which diner ordered what.
//!
//! Shares are a snapshot taken when the split is configured. Later changes
//! to the account do not touch them, and the split can only be cleared
//! (and configured again) while no share has been paid.
//!
//! ```text
//! total $100.00, N = 3
//!   share 1: $33.34   share 2: $33.33   share 3: $33.33   (Σ = $100.00)
//! ```

use crate::account::Account;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{AccountStatus, SplitShare};
use crate::validation::validate_split_shares;

impl Account {
    /// Splits the account into `shares` equal parts and moves it to
    /// `split_pending`.
    pub fn configure_split(&mut self, shares: u32) -> CoreResult<Vec<SplitShare>> {
        self.ensure_open("configure split")?;
        validate_split_shares(shares)?;

        if self.has_settlements() {
            return Err(self.invalid_state("split after a payment"));
        }
        if !self.total.is_positive() {
            return Err(ValidationError::MustBePositive {
                field: "account total".to_string(),
            }
            .into());
        }

        let subtotals = (self.subtotal - self.discount_amount).allocate(shares);
        let totals = self.total.allocate(shares);
        let split: Vec<SplitShare> = subtotals
            .into_iter()
            .zip(totals)
            .enumerate()
            .map(|(i, (subtotal, total))| SplitShare {
                number: i as u32 + 1,
                subtotal,
                total,
                is_paid: false,
                paid_at: None,
            })
            .collect();

        self.split = Some(split.clone());
        self.is_split = true;
        self.status = AccountStatus::SplitPending;
        self.updated_at = chrono::Utc::now();
        Ok(split)
    }

    /// Removes an unpaid split and returns the account to `open`.
    pub fn clear_split(&mut self) -> CoreResult<()> {
        self.ensure_status(&[AccountStatus::SplitPending], "clear split")?;
        if self.shares().iter().any(|s| s.is_paid) {
            return Err(self.invalid_state("clear split after a share was paid"));
        }

        self.split = None;
        self.is_split = false;
        self.status = AccountStatus::Open;
        self.updated_at = chrono::Utc::now();
        Ok(())
    }

    /// Configured shares, empty when the account is not split.
    pub fn shares(&self) -> &[SplitShare] {
        self.split.as_deref().unwrap_or(&[])
    }

    pub fn share(&self, number: u32) -> CoreResult<&SplitShare> {
        self.shares()
            .iter()
            .find(|s| s.number == number)
            .ok_or_else(|| CoreError::not_found("Split share", number.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::tests::{line, open_account, staff};
    use crate::money::Money;
    use crate::payment::PaymentRequest;
    use crate::types::PaymentMethod;

    #[test]
    fn test_two_way_split_of_150() {
        let mut account = open_account();
        account.add_order(vec![line("p1", 15000, 1, None)], &staff()).unwrap();

        let shares = account.configure_split(2).unwrap();
        assert_eq!(shares.len(), 2);
        assert!(shares.iter().all(|s| s.total.cents() == 7500));
        assert_eq!(account.status, AccountStatus::SplitPending);
        assert!(account.is_split);

        account
            .pay_split(1, PaymentRequest::single(PaymentMethod::Cash, None), &staff())
            .unwrap();
        assert_eq!(account.status, AccountStatus::SplitPending);

        account
            .pay_split(2, PaymentRequest::single(PaymentMethod::Card, None), &staff())
            .unwrap();
        assert_eq!(account.status, AccountStatus::Paid);
        assert!(account.paid_at.is_some());
    }

    #[test]
    fn test_uneven_split_sums_exactly() {
        let mut account = open_account();
        account.add_order(vec![line("p1", 10000, 1, None)], &staff()).unwrap();

        let shares = account.configure_split(3).unwrap();
        let totals: Vec<i64> = shares.iter().map(|s| s.total.cents()).collect();
        assert_eq!(totals, vec![3334, 3333, 3333]);
        assert_eq!(shares.iter().map(|s| s.total).sum::<Money>(), account.total);
    }

    #[test]
    fn test_split_bounds_and_guards() {
        let mut account = open_account();
        assert!(matches!(
            account.configure_split(2),
            Err(CoreError::Validation(_))
        ));

        account.add_order(vec![line("p1", 1000, 1, None)], &staff()).unwrap();
        assert!(account.configure_split(1).is_err());
        assert!(account.configure_split(21).is_err());
        assert_eq!(account.status, AccountStatus::Open);

        account.configure_split(2).unwrap();
        // Already split.
        assert!(matches!(
            account.configure_split(4),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(account.add_order(vec![line("p2", 1, 1, None)], &staff()).is_err());
    }

    #[test]
    fn test_clear_split_only_before_payment() {
        let mut account = open_account();
        account.add_order(vec![line("p1", 1000, 1, None)], &staff()).unwrap();
        account.configure_split(2).unwrap();

        account.clear_split().unwrap();
        assert_eq!(account.status, AccountStatus::Open);
        assert!(account.shares().is_empty());

        account.configure_split(2).unwrap();
        account
            .pay_split(1, PaymentRequest::single(PaymentMethod::Cash, None), &staff())
            .unwrap();
        assert!(matches!(
            account.clear_split(),
            Err(CoreError::InvalidState { .. })
        ));
        assert!(matches!(
            account.share(3),
            Err(CoreError::NotFound { .. })
        ));
    }
}
