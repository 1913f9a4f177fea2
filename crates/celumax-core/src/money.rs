//! # Money Module
//!
//! Integer money for prices, deposits and invoice totals.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Invoice total with floats:   3 × 0.10 = 0.30000000000000004           │
//! │  Invoice total with cents:    3 × 10   = 30                             │
//! │                                                                         │
//! │  Every amount is stored and computed in minor units (cents).           │
//! │  Only ticket rendering turns cents into "$12.34".                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use celumax_core::money::Money;
//!
//! let unit_price = Money::from_cents(4_500);   // $45.00
//! let line_total = unit_price.multiply_quantity(3);
//! assert_eq!(line_total.cents(), 13_500);
//! assert_eq!(line_total.to_string(), "$135.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// A monetary value in the smallest currency unit.
///
/// Signed so that balances (price minus deposit) can go negative when a
/// client over-pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -$5.50.
    ///
    /// ```rust
    /// use celumax_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(12, 5).cents(), 1205);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion, always 0-99.
    #[inline]
    pub const fn minor(&self) -> i64 {
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
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `price × qty`, or `None` on overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sum of two amounts, or `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }
}

/// Renders as `$1234.56` / `-$5.50`.
///
/// Tickets use this format directly; there is no thousands separator.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parts() {
        let money = Money::from_cents(1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);

        let negative = Money::from_cents(-550);
        assert_eq!(negative.major(), -5);
        assert_eq!(negative.minor(), 50);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "$10.99");
        assert_eq!(Money::from_cents(500).to_string(), "$5.00");
        assert_eq!(Money::from_cents(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert!((b - a).is_negative());
    }

    #[test]
    fn test_checked_arithmetic() {
        let price = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(price.checked_multiply_quantity(2), None);
        assert_eq!(price.checked_add(price), None);
        assert_eq!(
            Money::from_cents(250).checked_multiply_quantity(4),
            Some(Money::from_cents(1000))
        );
    }

    #[test]
    fn test_sum_of_line_totals() {
        let lines = [(Money::from_cents(299), 3), (Money::from_cents(1500), 1)];
        let total: Money = lines
            .iter()
            .map(|(price, qty)| price.multiply_quantity(*qty))
            .sum();
        assert_eq!(total.cents(), 2397);
    }
}
