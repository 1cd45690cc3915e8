//! # Amount Value Object
//!
//! Strictly positive decimal monetary value.
//!
//! Every price that moves through a negotiation (the buyer's offer, the
//! seller's counter, a financing pre-approval and the agreed transaction
//! price) is an [`Amount`]. Zero and negative values cannot be constructed,
//! and neither can values finer than a cent or at or above
//! [`Amount::UPPER_BOUND`], matching the `NUMERIC(20, 2)` store columns.
//!
//! # Examples
//!
//! ```
//! use offer_negotiation::domain::value_objects::amount::Amount;
//! use rust_decimal::Decimal;
//!
//! let amount = Amount::new(Decimal::new(250_000, 0)).unwrap();
//! assert_eq!(amount.to_string(), "250000");
//!
//! assert!(Amount::new(Decimal::ZERO).is_err());
//! ```

use crate::domain::errors::{DomainError, DomainResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A strictly positive monetary amount.
///
/// # Invariants
///
/// - Value is greater than zero
/// - At most [`Amount::MAX_SCALE`] decimal places
/// - Strictly below [`Amount::UPPER_BOUND`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Maximum number of decimal places.
    pub const MAX_SCALE: u32 = 2;

    /// Exclusive upper bound (10^18).
    pub const UPPER_BOUND: Decimal = Decimal::from_parts(0xA764_0000, 0x0DE0_B6B3, 0, false, 0);

    /// Creates a new amount.
    ///
    /// Trailing zeros do not count towards the scale, so `100.500` is
    /// accepted as `100.5`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidAmount` if the value is zero or negative,
    /// has more than [`MAX_SCALE`](Self::MAX_SCALE) decimal places, or is not
    /// below [`UPPER_BOUND`](Self::UPPER_BOUND).
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value <= Decimal::ZERO {
            return Err(DomainError::invalid_amount(format!(
                "amount must be positive, got {value}"
            )));
        }
        let value = value.normalize();
        if value.scale() > Self::MAX_SCALE {
            return Err(DomainError::invalid_amount(format!(
                "amount allows at most {} decimal places, got {value}",
                Self::MAX_SCALE
            )));
        }
        if value >= Self::UPPER_BOUND {
            return Err(DomainError::invalid_amount(format!(
                "amount must be below {}, got {value}",
                Self::UPPER_BOUND
            )));
        }
        Ok(Self(value))
    }

    /// Creates an amount from a whole number of currency units.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidAmount` if the value is zero or negative.
    pub fn from_units(units: i64) -> DomainResult<Self> {
        Self::new(Decimal::from(units))
    }

    /// Returns the underlying decimal value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl FromStr for Amount {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|e| DomainError::invalid_amount(format!("not a number: {e}")))?;
        Self::new(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod construction {
        use super::*;

        #[test]
        fn positive_is_accepted() {
            let amount = Amount::new(Decimal::new(10050, 2)).unwrap();
            assert_eq!(amount.value(), Decimal::new(10050, 2));
        }

        #[test]
        fn zero_is_rejected() {
            assert!(matches!(
                Amount::new(Decimal::ZERO),
                Err(DomainError::InvalidAmount(_))
            ));
        }

        #[test]
        fn negative_is_rejected() {
            assert!(Amount::from_units(-5).is_err());
        }

        #[test]
        fn sub_cent_is_rejected() {
            assert!(matches!(
                Amount::new(Decimal::new(1, 3)),
                Err(DomainError::InvalidAmount(_))
            ));
            assert!(Amount::new(Decimal::new(100_005, 3)).is_err());
        }

        #[test]
        fn trailing_zeros_do_not_count_as_scale() {
            let amount = Amount::new(Decimal::new(100_500, 3)).unwrap();
            assert_eq!(amount.value(), Decimal::new(1005, 1));
        }

        #[test]
        fn upper_bound_is_exclusive() {
            assert_eq!(
                Amount::UPPER_BOUND,
                Decimal::from(1_000_000_000_000_000_000_i64)
            );
            assert!(matches!(
                Amount::new(Amount::UPPER_BOUND),
                Err(DomainError::InvalidAmount(_))
            ));
            let largest = Amount::UPPER_BOUND - Decimal::new(1, 2);
            assert_eq!(Amount::new(largest).unwrap().value(), largest);
        }
    }

    mod parsing {
        use super::*;

        #[test]
        fn parses_decimal_string() {
            let amount: Amount = "120.50".parse().unwrap();
            assert_eq!(amount.value(), Decimal::new(12050, 2));
        }

        #[test]
        fn rejects_sub_cent_string() {
            assert!("0.001".parse::<Amount>().is_err());
        }

        #[test]
        fn rejects_non_numeric() {
            assert!("abc".parse::<Amount>().is_err());
        }
    }

    mod serde {
        use super::*;

        #[test]
        fn deserialize_rejects_non_positive() {
            let result: Result<Amount, _> = serde_json::from_str("\"0\"");
            assert!(result.is_err());
        }

        #[test]
        fn deserialize_accepts_string_and_number() {
            let from_str: Amount = serde_json::from_str("\"100\"").unwrap();
            let from_num: Amount = serde_json::from_str("100").unwrap();
            assert_eq!(from_str, from_num);
        }
    }

    #[test]
    fn display_is_normalized() {
        let amount = Amount::new(Decimal::new(12000, 2)).unwrap();
        assert_eq!(amount.to_string(), "120");
    }
}
