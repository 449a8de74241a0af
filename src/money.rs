//! Cent-exact money amounts
//!
//! Balances, bets and payouts are stored as whole cents so that settlement
//! arithmetic never accumulates floating point drift. Amounts cross the
//! serde and display boundaries as decimal dollars (`12.50`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A non-negative amount of money, in cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: u64) -> Self {
        Money(cents)
    }

    /// Whole dollars
    pub const fn from_dollars(dollars: u64) -> Self {
        Money(dollars * 100)
    }

    /// Convert a decimal dollar value, rounding to the nearest cent.
    ///
    /// Returns `None` for negative, NaN or out-of-range input.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        let cents = (value * 100.0).round();
        if cents > u64::MAX as f64 {
            return None;
        }
        Some(Money(cents as u64))
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    pub fn as_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Multiply by an integer payout multiplier
    pub fn checked_mul(self, multiplier: u64) -> Option<Money> {
        self.0.checked_mul(multiplier).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad so width/alignment flags apply to the whole amount
        f.pad(&format!("{}.{:02}", self.0 / 100, self.0 % 100))
    }
}

/// Error returned when parsing a money string fails
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseMoneyError {
    #[error("amount is empty")]
    Empty,

    #[error("amount '{0}' is not a decimal number")]
    NotANumber(String),

    #[error("amount '{0}' has more than two decimal places")]
    TooPrecise(String),

    #[error("amount '{0}' is out of range")]
    OutOfRange(String),
}

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('$');
        if trimmed.is_empty() {
            return Err(ParseMoneyError::Empty);
        }

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };

        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
            return Err(ParseMoneyError::NotANumber(s.to_string()));
        }
        if fraction.len() > 2 {
            return Err(ParseMoneyError::TooPrecise(s.to_string()));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ParseMoneyError::OutOfRange(s.to_string()))?
        };
        let fraction_cents: u64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().unwrap_or(0) * 10,
            _ => fraction.parse::<u64>().unwrap_or(0),
        };

        whole
            .checked_mul(100)
            .and_then(|cents| cents.checked_add(fraction_cents))
            .map(Money)
            .ok_or_else(|| ParseMoneyError::OutOfRange(s.to_string()))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Money::from_decimal(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid money amount: {}", value)))
    }
}
