//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  A tab split three ways:                                                │
//! │    $100.00 / 3 = $33.33 (×3 = $99.99)  → one cent disappears            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents + explicit remainders                      │
//! │    10000 cents.allocate(3) = [3334, 3333, 3333]  → sums to 10000        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The payment reconciliation tolerance ("±0.01") is therefore exactly one
//! minor unit, see [`PAYMENT_TOLERANCE`].
//!
//! ## Usage
//! ```rust
//! use mesa_core::money::Money;
//!
//! let price = Money::from_cents(1099); // $10.99
//! let line = price * 2i64;             // $21.98
//! assert_eq!(line.cents(), 2198);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Accepted difference between declared and expected payment amounts.
pub const PAYMENT_TOLERANCE: Money = Money::from_cents(1);

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Catalog price ──► Item.unit_price ──► Account.subtotal                 │
/// │                                             │                           │
/// │                   Discount / Tip ───────────┼──► Account.total          │
/// │                                             │                           │
/// │           Partition subtotal / SplitShare ──┴──► Settlement             │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let line_total = Money::from_cents(299).multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps` basis points of this amount, rounded half-up.
    ///
    /// ## Example
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// // 15% tip on $270.00
    /// let tip = Money::from_cents(27000).percentage(1500);
    /// assert_eq!(tip.cents(), 4050);
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let value = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money(value as i64)
    }

    /// Returns `self * part / whole`, rounded half-up.
    ///
    /// Used for the proportional discount share of a partition:
    /// `discount.proportion(partition_subtotal, account_subtotal)`.
    /// Returns zero when `whole` is not positive.
    pub fn proportion(&self, part: Money, whole: Money) -> Money {
        if !whole.is_positive() {
            return Money::zero();
        }
        let numerator = self.0 as i128 * part.0 as i128;
        let whole = whole.0 as i128;
        let value = (numerator + whole / 2) / whole;
        Money(value as i64)
    }

    /// Splits this amount into `parts` shares that sum exactly to `self`.
    ///
    /// The leftover minor units go one each to the first shares, so the
    /// result is non-increasing and the largest and smallest differ by at
    /// most one cent.
    ///
    /// ```rust
    /// use mesa_core::money::Money;
    ///
    /// let shares = Money::from_cents(10000).allocate(3);
    /// assert_eq!(shares, vec![
    ///     Money::from_cents(3334),
    ///     Money::from_cents(3333),
    ///     Money::from_cents(3333),
    /// ]);
    /// ```
    pub fn allocate(&self, parts: u32) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let parts_i = parts as i64;
        let base = self.0.div_euclid(parts_i);
        let remainder = self.0.rem_euclid(parts_i);
        (0..parts_i)
            .map(|i| Money(base + if i < remainder { 1 } else { 0 }))
            .collect()
    }

    /// Returns true when the two amounts differ by at most `tolerance`.
    #[inline]
    pub fn within(&self, other: Money, tolerance: Money) -> bool {
        (self.0 - other.0).abs() <= tolerance.0
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Clamps negative values to zero.
    #[inline]
    pub fn non_negative(self) -> Money {
        if self.0 < 0 {
            Money::zero()
        } else {
            self
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display is for logs and error messages. Front ends format with locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(31050)), "$310.50");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::zero()), "$0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3i64).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        assert_eq!(Money::from_cents(27000).percentage(1500).cents(), 4050);
        // 10% of $0.05 = 0.5 cent → 1 cent
        assert_eq!(Money::from_cents(5).percentage(1000).cents(), 1);
        assert_eq!(Money::from_cents(1000).percentage(0).cents(), 0);
    }

    #[test]
    fn test_proportion() {
        let discount = Money::from_cents(3000);
        // Partition worth $100 of a $300 account carries $10 of the discount
        let share = discount.proportion(Money::from_cents(10000), Money::from_cents(30000));
        assert_eq!(share.cents(), 1000);

        // $10 over 1/3 → 333.33 → 333
        let share = Money::from_cents(1000).proportion(Money::from_cents(1), Money::from_cents(3));
        assert_eq!(share.cents(), 333);

        assert!(discount.proportion(Money::from_cents(100), Money::zero()).is_zero());
    }

    #[test]
    fn test_allocate_sums_exactly() {
        let total = Money::from_cents(15000);
        assert_eq!(total.allocate(2), vec![Money::from_cents(7500); 2]);

        for parts in 1..=20u32 {
            let amount = Money::from_cents(31051);
            let shares = amount.allocate(parts);
            assert_eq!(shares.len(), parts as usize);
            assert_eq!(shares.iter().sum::<Money>(), amount);
            let max = shares.iter().max().unwrap().cents();
            let min = shares.iter().min().unwrap().cents();
            assert!(max - min <= 1);
        }

        assert!(total.allocate(0).is_empty());
    }

    #[test]
    fn test_within_tolerance() {
        let a = Money::from_cents(31050);
        assert!(a.within(Money::from_cents(31051), PAYMENT_TOLERANCE));
        assert!(a.within(Money::from_cents(31049), PAYMENT_TOLERANCE));
        assert!(!a.within(Money::from_cents(31052), PAYMENT_TOLERANCE));
    }

    #[test]
    fn test_min_and_non_negative() {
        let a = Money::from_cents(200);
        let b = Money::from_cents(300);
        assert_eq!(a.min(b), a);
        assert_eq!(Money::from_cents(-5).non_negative(), Money::zero());
        assert_eq!(b.non_negative(), b);
    }
}
