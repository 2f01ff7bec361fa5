//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for exact arithmetic (no floating-point errors).
//! Exchanges publish both values as decimal strings; parsing keeps the
//! value exact, and equality/ordering ignore trailing zeros, so
//! `"50000.00"` and `"50000"` address the same price level.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::NumericError;

/// Strictly positive price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Validate and wrap a decimal
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        if value <= Decimal::ZERO {
            return Err(NumericError::NonPositivePrice(value.to_string()));
        }
        Ok(Self(value))
    }

    /// Whole-number price; zero is rejected like any non-positive decimal
    pub fn from_u64(value: u64) -> Result<Self, NumericError> {
        Self::try_new(Decimal::from(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Price {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| NumericError::InvalidDecimal(s.to_string()))?;
        Self::try_new(value)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = NumericError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-negative quantity; zero means "level removed" on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Validate and wrap a decimal
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        if value < Decimal::ZERO {
            return Err(NumericError::NegativeQuantity(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl FromStr for Quantity {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| NumericError::InvalidDecimal(s.to_string()))?;
        Self::try_new(value)
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = NumericError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_price_parsing() {
        let price = Price::from_str("50000.00").unwrap();
        assert_eq!(price, Price::from_u64(50000).unwrap());
        assert_eq!(price.to_string(), "50000.00");
    }

    #[test]
    fn test_price_rejects_zero_and_negative() {
        assert!(matches!(
            Price::from_str("0"),
            Err(NumericError::NonPositivePrice(_))
        ));
        assert!(Price::from_str("-1.5").is_err());
        assert!(matches!(
            Price::from_u64(0),
            Err(NumericError::NonPositivePrice(_))
        ));
        assert!(matches!(
            Price::from_str("abc"),
            Err(NumericError::InvalidDecimal(_))
        ));
    }

    #[test]
    fn test_quantity_zero() {
        let qty = Quantity::from_str("0.00000000").unwrap();
        assert!(qty.is_zero());
        assert_eq!(qty, Quantity::ZERO);
        assert!(Quantity::from_str("-0.1").is_err());
    }

    #[test]
    fn test_serialization_as_string() {
        let price = Price::from_str("101.50").unwrap();
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"101.50\"");

        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, price);
        assert!(serde_json::from_str::<Price>("\"0\"").is_err());
    }

    proptest! {
        #[test]
        fn prop_price_order_matches_decimal(a in 1u64..1_000_000, b in 1u64..1_000_000) {
            let pa = Price::from_u64(a).unwrap();
            let pb = Price::from_u64(b).unwrap();
            prop_assert_eq!(pa.cmp(&pb), a.cmp(&b));
        }
    }
}
