//! Monetary value objects.
//!
//! Both types wrap an exact `Decimal`, so equality is numeric (`10.0 == 10`)
//! and no rounding creeps in across long replays.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bank_core::ValueObject;

/// Quantity moved by a single deposit or withdrawal.
///
/// No sign constraint at construction: whether a value is acceptable depends
/// on the command using it, and the account checks that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    pub const fn of(value: Decimal) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> Decimal {
        self.0
    }

    /// Strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Panics on overflow, like integer `+`; see [`Amount::checked_add`].
    pub fn add(self, other: Amount) -> Amount {
        Amount(self.0 + other.0)
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }
}

impl core::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount::add(self, rhs)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ValueObject for Amount {}

/// Running total of an account.
///
/// May go negative: withdrawals are not checked against the current balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Balance(Decimal);

impl Balance {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub const fn of(value: Decimal) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> Decimal {
        self.0
    }

    pub fn add(self, amount: Amount) -> Balance {
        Balance(self.0 + amount.value())
    }

    pub fn subtract(self, amount: Amount) -> Balance {
        Balance(self.0 - amount.value())
    }

    /// `None` when the result falls outside the `Decimal` range.
    pub fn checked_add(self, amount: Amount) -> Option<Balance> {
        self.0.checked_add(amount.value()).map(Balance)
    }

    pub fn checked_subtract(self, amount: Amount) -> Option<Balance> {
        self.0.checked_sub(amount.value()).map(Balance)
    }
}

impl Default for Balance {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<Decimal> for Balance {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl ValueObject for Balance {}
