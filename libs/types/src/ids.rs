//! Identifier types for instruments and engine generations
//!
//! An [`InstrumentId`] names the single instrument a synchronisation engine
//! governs. An [`Epoch`] tags every engine/connection pair so that late
//! responses belonging to a replaced pair can be recognised by value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::InstrumentError;

/// Exchange instrument symbol (e.g. "BTCUSDT")
///
/// Stored upper-cased. Only ASCII alphanumerics, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentId(String);

impl InstrumentId {
    /// Parse and normalise a symbol
    pub fn parse(symbol: impl AsRef<str>) -> Result<Self, InstrumentError> {
        let raw = symbol.as_ref().trim();
        if raw.is_empty() {
            return Err(InstrumentError::Empty);
        }
        if let Some(ch) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(InstrumentError::InvalidCharacter {
                symbol: raw.to_string(),
                ch,
            });
        }
        Ok(Self(raw.to_ascii_uppercase()))
    }

    /// Get the symbol string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-case form used in stream names
    pub fn stream_name(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstrumentId {
    type Err = InstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for InstrumentId {
    type Error = InstrumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<InstrumentId> for String {
    fn from(id: InstrumentId) -> Self {
        id.0
    }
}

/// Generation id of an engine/connection pair
///
/// Strictly increasing over the lifetime of a supervisor. Anything tagged
/// with an epoch other than the active one is superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(u64);

impl Epoch {
    /// Epoch before any engine has been started
    pub const ZERO: Epoch = Epoch(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// The following generation
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
