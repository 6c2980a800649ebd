//! Calculation engine
//!
//! Pure, synchronous computations over values already fetched into memory.
//! Callers own persistence and transactions.

mod catalog;
mod discount;
mod distribution;
mod pricing;

pub use catalog::*;
pub use discount::*;
pub use distribution::*;
pub use pricing::*;
