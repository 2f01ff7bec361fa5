//! Types library for local order book synchronisation
//!
//! Value types shared between the reconciliation engine, its adapters and
//! any consumer of the synchronised book. Everything here is plain data:
//! no I/O, no locking, no async.
//!
//! # Modules
//! - `ids`: Instrument identifiers and engine epochs
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `book`: Book sides and price levels
//! - `trade`: Public trade prints
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod numeric;
pub mod book;
pub mod trade;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::book::*;
    pub use crate::trade::*;
    pub use crate::errors::*;
}
