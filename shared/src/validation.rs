//! Validation utilities for the Commodity Reception Platform
//!
//! Every check here is pure. A failed check means no calculation runs and
//! nothing is persisted; callers receive the full list of reasons.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::engine::ThresholdCatalog;
use crate::models::QualityMeasurements;
use crate::types::{is_valid_percentage, SURFACED_DECIMALS};

// ============================================================================
// Validation Errors
// ============================================================================

/// Human-readable reasons a set of inputs was rejected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    reasons: Vec<String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    /// `Ok(())` when no reason was collected
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reasons.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

// ============================================================================
// Single-value Validations
// ============================================================================

/// Validate a percentage is between 0 and 100 inclusive
pub fn validate_percentage(value: Decimal) -> Result<(), &'static str> {
    if !is_valid_percentage(value) {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

/// Validate a received weight is strictly positive
pub fn validate_positive_weight(weight: Decimal) -> Result<(), &'static str> {
    if weight <= Decimal::ZERO {
        return Err("Weight must be greater than zero");
    }
    Ok(())
}

/// Validate a weight carries no more than two decimals, as stored
pub fn validate_weight_precision(weight: Decimal) -> Result<(), &'static str> {
    if weight.normalize().scale() > SURFACED_DECIMALS {
        return Err("Weight must have at most two decimals");
    }
    Ok(())
}

/// Validate a price per unit weight is strictly positive
pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price <= Decimal::ZERO {
        return Err("Price per unit weight must be greater than zero");
    }
    Ok(())
}

/// Validate a batch output weight (zero is allowed for a total loss)
pub fn validate_output_weight(weight: Decimal) -> Result<(), &'static str> {
    if weight < Decimal::ZERO {
        return Err("Output weight cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Quality Discount Input
// ============================================================================

/// Validate everything the weight discount engine needs before it runs.
///
/// The catalog must be non-empty and hold a threshold row (enabled or not)
/// for every metric present in `measurements`.
pub fn validate_discount_input(
    original_weight: Decimal,
    measurements: &QualityMeasurements,
    catalog: &ThresholdCatalog,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if validate_positive_weight(original_weight).is_err() {
        errors.push(format!(
            "Original weight must be greater than zero, got {}",
            original_weight
        ));
    }
    if let Err(reason) = validate_weight_precision(original_weight) {
        errors.push(format!("Original weight: {} (got {})", reason, original_weight));
    }

    validate_measurements_into(measurements, &mut errors);

    if catalog.is_empty() {
        errors.push(format!(
            "No discount thresholds configured for fruit type {}",
            catalog.fruit_type_id()
        ));
    } else {
        for (metric, _) in measurements.iter() {
            if !catalog.contains(metric) {
                errors.push(format!("No discount threshold configured for {}", metric));
            }
        }
        for threshold in catalog.thresholds() {
            if !is_valid_percentage(threshold.limit_percent) {
                errors.push(format!(
                    "{} threshold must be between 0 and 100, got {}",
                    threshold.metric, threshold.limit_percent
                ));
            }
        }
    }

    errors.into_result()
}

/// Validate measured percentages alone (used when recording an evaluation)
pub fn validate_measurements(measurements: &QualityMeasurements) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validate_measurements_into(measurements, &mut errors);
    errors.into_result()
}

fn validate_measurements_into(measurements: &QualityMeasurements, errors: &mut ValidationErrors) {
    for (metric, value) in measurements.iter() {
        if validate_percentage(value).is_err() {
            errors.push(format!(
                "{} percentage must be between 0 and 100, got {}",
                metric, value
            ));
        }
    }
}

// ============================================================================
// Administrative Override
// ============================================================================

/// Validate the shape of a manually supplied discount.
///
/// The `original - discount == final` check itself lives on
/// `DiscountCalculation::verify_consistency`.
pub fn validate_override(
    original_weight: Decimal,
    discount_weight: Decimal,
    final_weight: Decimal,
    reason: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if validate_positive_weight(original_weight).is_err() {
        errors.push("Original weight must be greater than zero");
    }
    if discount_weight < Decimal::ZERO {
        errors.push("Discount weight cannot be negative");
    }
    if final_weight < Decimal::ZERO {
        errors.push("Final weight cannot be negative");
    }
    if final_weight > original_weight {
        errors.push("Final weight cannot exceed original weight");
    }
    for (name, weight) in [
        ("Original", original_weight),
        ("Discount", discount_weight),
        ("Final", final_weight),
    ] {
        if let Err(reason) = validate_weight_precision(weight) {
            errors.push(format!("{} weight: {} (got {})", name, reason, weight));
        }
    }
    if reason.trim().is_empty() {
        errors.push("An override reason is required");
    }

    errors.into_result()
}

// ============================================================================
// Batch Validations
// ============================================================================

/// Validate the receptions chosen to form a batch
pub fn validate_batch_contributions(contributions: &[(Uuid, Decimal)]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if contributions.is_empty() {
        errors.push("A batch needs at least one reception");
    }

    let mut seen = std::collections::BTreeSet::new();
    for (reception_id, wet_weight) in contributions {
        if !seen.insert(*reception_id) {
            errors.push(format!("Reception {} is listed more than once", reception_id));
        }
        if *wet_weight < Decimal::ZERO {
            errors.push(format!(
                "Reception {} has a negative wet weight ({})",
                reception_id, wet_weight
            ));
        }
    }

    errors.into_result()
}
