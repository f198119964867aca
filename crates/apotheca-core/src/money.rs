//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Mils (1/1000 of a currency unit)                 │
//! │    $5.995 = 5995 mils — exact, no drift                                 │
//! │    3 × 5995 = 17985 mils, rounded to the cent = 17990 = $17.99          │
//! │                                                                         │
//! │  Mils (not cents) because unit prices can carry a third decimal         │
//! │  place; receipt totals are rounded to the cent per line.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use apotheca_core::money::Money;
//!
//! let price = Money::from_mils(5_995); // $5.995
//! let line = price.multiply_quantity(3).round_to_cent();
//! assert_eq!(line, Money::from_cents(1_799)); // $17.99
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in mils (thousandths of the major currency unit).
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are legal intermediates (a per-unit
///   discount larger than the unit price, a reversal delta)
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Mil resolution**: stored quantities are exact for three decimal
///   places; everything persisted after rounding is a whole number of cents
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from mils (1/1000 currency unit).
    #[inline]
    pub const fn from_mils(mils: i64) -> Self {
        Money(mils)
    }

    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use apotheca_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.mils(), 10_990);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents * 10)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// For negative amounts only the major unit is negative:
    /// `from_major_minor(-5, 50)` = -$5.50, not -$4.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money((major * 100 - minor) * 10)
        } else {
            Money((major * 100 + minor) * 10)
        }
    }

    /// Returns the value in mils.
    #[inline]
    pub const fn mils(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 1000
    }

    /// Zero money value.
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

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use apotheca_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299); // $2.99
    /// assert_eq!(unit_price.multiply_quantity(3), Money::from_cents(897));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Rounds to the nearest cent, half away from zero.
    ///
    /// This is the receipt-rounding rule: each line total is rounded to two
    /// decimal places independently before summation, never summed-then-
    /// rounded. `$17.985` rounds up to `$17.99`.
    pub const fn round_to_cent(&self) -> Money {
        let m = self.0;
        let cents = if m >= 0 { (m + 5) / 10 } else { (m - 5) / 10 };
        Money(cents * 10)
    }

    /// True when the value is an exact number of cents.
    #[inline]
    pub const fn is_whole_cents(&self) -> bool {
        self.0 % 10 == 0
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money in a human-readable format.
///
/// For debugging and logs. The calling UI layer owns localization.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let mils = self.0.abs();
        if mils % 10 == 0 {
            write!(f, "{}${}.{:02}", sign, mils / 1000, (mils / 10) % 100)
        } else {
            write!(f, "{}${}.{:03}", sign, mils / 1000, mils % 1000)
        }
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
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
