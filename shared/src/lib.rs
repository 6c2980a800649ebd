//! Shared types, models and calculation engine for the Commodity Reception Platform
//!
//! This crate contains everything that must behave identically on the backend
//! and in the browser (via WASM): the quality weight discount chain, weight-only
//! pricing and proportional batch output distribution. It performs no I/O.

pub mod engine;
pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use engine::*;
pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
