//! Error types for value construction
//!
//! Error taxonomy using thiserror

use thiserror::Error;

/// Errors raised when building numeric or identifier values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    #[error("Invalid decimal: {0}")]
    InvalidDecimal(String),

    #[error("Price must be positive: {0}")]
    NonPositivePrice(String),

    #[error("Quantity must not be negative: {0}")]
    NegativeQuantity(String),
}

/// Errors raised when parsing an instrument identifier
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstrumentError {
    #[error("Instrument symbol is empty")]
    Empty,

    #[error("Instrument symbol contains invalid character {ch:?}: {symbol}")]
    InvalidCharacter { symbol: String, ch: char },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_error_display() {
        let err = NumericError::NonPositivePrice("-1".to_string());
        assert_eq!(err.to_string(), "Price must be positive: -1");
    }

    #[test]
    fn test_instrument_error_display() {
        let err = InstrumentError::InvalidCharacter {
            symbol: "BTC USDT".to_string(),
            ch: ' ',
        };
        assert!(err.to_string().contains("BTC USDT"));
    }
}
