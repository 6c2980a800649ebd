//! Business logic services for the Commodity Reception Platform

pub mod audit;
pub mod batch;
pub mod pricing;
pub mod quality;
pub mod reception;
pub mod thresholds;

pub use audit::AuditService;
pub use batch::BatchService;
pub use pricing::PricingService;
pub use quality::QualityService;
pub use reception::ReceptionService;
pub use thresholds::ThresholdService;
