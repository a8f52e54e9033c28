//! Amount type for handling monetary values exactly.
//!
//! This module provides the `Amount` type which wraps `Decimal` and fixes the precision at two
//! fractional digits, so that a value read back from storage is exactly the value written.

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits every amount carries.
pub const SCALE: u32 = 2;

/// Represents a monetary amount with exactly two fractional digits.
///
/// Arithmetic is exact decimal arithmetic, so sums and differences never pick up binary
/// floating-point noise. A value with more than two significant fractional digits is rejected
/// rather than rounded, as is a value of [`Amount::LIMIT`] or more. Arithmetic is checked and
/// fails with a validation error instead of losing a digit.
///
/// # Examples
///
/// ```
/// # use tillbook::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("450.75").unwrap();
/// assert_eq!(amount.to_string(), "450.75");
///
/// let whole = Amount::from_str("500").unwrap();
/// assert_eq!(whole.to_string(), "500.00");
///
/// assert!(Amount::from_str("1.005").is_err());
/// assert!(Amount::from_str("1000000000000000").is_err());
///
/// let total = Amount::checked_sum([amount, whole]).unwrap();
/// assert_eq!(total.to_string(), "950.75");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    pub const ZERO: Amount = Amount {
        value: Decimal::ZERO,
    };

    /// Amounts read from input or storage must be smaller than this in magnitude.
    pub const LIMIT: i64 = 1_000_000_000_000_000;

    /// Creates an amount from a `Decimal`, failing if it has more than two significant
    /// fractional digits or is not below [`Amount::LIMIT`] in magnitude.
    pub fn new(value: Decimal) -> Result<Self> {
        if value.abs() >= Decimal::from(Self::LIMIT) {
            return Err(Error::validation(format!(
                "'{value}' is too large, amounts must be below {}",
                Self::LIMIT
            )));
        }
        if value.normalize().scale() > SCALE {
            return Err(Error::validation(format!(
                "'{value}' has more than {SCALE} decimal places"
            )));
        }
        let mut value = value;
        value.rescale(SCALE);
        if value.is_zero() {
            value.set_sign_positive(true);
        }
        Ok(Self { value })
    }

    /// Creates an amount from a whole number of minor units, e.g. `cents(45075)` is `450.75`.
    pub fn cents(cents: i64) -> Self {
        Self {
            value: Decimal::new(cents, SCALE),
        }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value().is_zero()
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.value().is_sign_positive()
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.value().is_sign_negative()
    }

    /// `self + rhs`, or a validation error if the result cannot be held to the cent.
    pub fn checked_add(self, rhs: Amount) -> Result<Amount> {
        Self::exact(self.value.checked_add(rhs.value), "sum")
    }

    /// `self - rhs`, or a validation error if the result cannot be held to the cent.
    pub fn checked_sub(self, rhs: Amount) -> Result<Amount> {
        Self::exact(self.value.checked_sub(rhs.value), "difference")
    }

    /// The exact total of `amounts`; zero when there are none.
    pub fn checked_sum<I>(amounts: I) -> Result<Amount>
    where
        I: IntoIterator<Item = Amount>,
    {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, |total, amount| total.checked_add(amount))
    }

    // Decimal gives up fractional digits before it reports an overflow.
    fn exact(value: Option<Decimal>, what: &str) -> Result<Amount> {
        match value {
            Some(value) if value.scale() == SCALE => Ok(Amount { value }),
            _ => Err(Error::validation(format!("The {what} is too large to keep to the cent"))),
        }
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        // Remove whitespace
        let trimmed = s.trim();

        // An empty form field means zero
        if trimmed.is_empty() {
            return Ok(Amount::ZERO);
        }

        let value = Decimal::from_str_exact(trimmed)
            .map_err(|e| Error::validation(format!("'{trimmed}' is not a valid amount: {e}")))?;
        Amount::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Every constructor and checked operation leaves the scale at two.
        write!(f, "{}", self.value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}
