//! Weight discount results and the computed/overridden command

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::QualityMetric;
use crate::types::within_tolerance;

/// One step of the discount chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscountBreakdownEntry {
    pub metric: QualityMetric,
    pub threshold_percent: Decimal,
    pub measured_percent: Decimal,
    pub excess_percent: Decimal,
    /// Rounded to two decimals
    pub discount_weight: Decimal,
    /// Unrounded running weight after this step
    pub remaining_weight: Decimal,
}

/// Output of the weight discount engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightDiscountResult {
    pub original_weight: Decimal,
    pub breakdown: Vec<DiscountBreakdownEntry>,
    pub total_discount: Decimal,
    pub final_weight: Decimal,
}

impl WeightDiscountResult {
    pub fn has_discount(&self) -> bool {
        !self.breakdown.is_empty()
    }

    /// Sum of the rounded per-step discounts. May differ from
    /// `total_discount` by a cent-level rounding artifact.
    pub fn breakdown_sum(&self) -> Decimal {
        self.breakdown.iter().map(|entry| entry.discount_weight).sum()
    }
}

/// Where a stored discount came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscountSource {
    Computed,
    Overridden,
}

impl DiscountSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountSource::Computed => "computed",
            DiscountSource::Overridden => "overridden",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "computed" => Some(DiscountSource::Computed),
            "overridden" => Some(DiscountSource::Overridden),
            _ => None,
        }
    }
}

/// A discount ready to be persisted: either produced by the engine or
/// supplied by an administrator. Both pass the same consistency check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DiscountCalculation {
    Computed(WeightDiscountResult),
    Overridden {
        original_weight: Decimal,
        discount_weight: Decimal,
        final_weight: Decimal,
        reason: String,
    },
}

impl DiscountCalculation {
    pub fn source(&self) -> DiscountSource {
        match self {
            DiscountCalculation::Computed(_) => DiscountSource::Computed,
            DiscountCalculation::Overridden { .. } => DiscountSource::Overridden,
        }
    }

    pub fn original_weight(&self) -> Decimal {
        match self {
            DiscountCalculation::Computed(result) => result.original_weight,
            DiscountCalculation::Overridden { original_weight, .. } => *original_weight,
        }
    }

    pub fn total_discount(&self) -> Decimal {
        match self {
            DiscountCalculation::Computed(result) => result.total_discount,
            DiscountCalculation::Overridden { discount_weight, .. } => *discount_weight,
        }
    }

    pub fn final_weight(&self) -> Decimal {
        match self {
            DiscountCalculation::Computed(result) => result.final_weight,
            DiscountCalculation::Overridden { final_weight, .. } => *final_weight,
        }
    }

    /// Overrides carry no breakdown
    pub fn breakdown(&self) -> &[DiscountBreakdownEntry] {
        match self {
            DiscountCalculation::Computed(result) => &result.breakdown,
            DiscountCalculation::Overridden { .. } => &[],
        }
    }

    pub fn override_reason(&self) -> Option<&str> {
        match self {
            DiscountCalculation::Computed(_) => None,
            DiscountCalculation::Overridden { reason, .. } => Some(reason),
        }
    }

    /// Reject unless `original - discount == final` within `epsilon`
    pub fn verify_consistency(&self, epsilon: Decimal) -> EngineResult<()> {
        let original = self.original_weight();
        let discount = self.total_discount();
        let final_weight = self.final_weight();

        if within_tolerance(original - discount, final_weight, epsilon) {
            Ok(())
        } else {
            Err(EngineError::Consistency {
                original,
                discount,
                final_weight,
                difference: (original - discount - final_weight).abs(),
            })
        }
    }
}
