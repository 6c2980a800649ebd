//! HTTP handlers

mod batch;
mod health;
mod pricing;
mod quality;
mod reception;
mod thresholds;

pub use batch::*;
pub use health::*;
pub use pricing::*;
pub use quality::*;
pub use reception::*;
pub use thresholds::*;
