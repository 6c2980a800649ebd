//! Domain models for the Commodity Reception Platform

mod batch;
mod discount;
mod pricing;
mod quality;
mod reception;

pub use batch::*;
pub use discount::*;
pub use pricing::*;
pub use quality::*;
pub use reception::*;
