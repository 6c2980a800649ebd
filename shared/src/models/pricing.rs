//! Pricing models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DiscountBreakdownEntry, QualityMetric};

/// Price per unit weight for a fruit type, effective from `price_date`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPrice {
    pub id: Uuid,
    pub fruit_type_id: Uuid,
    pub price_date: NaiveDate,
    pub price_per_unit: Decimal,
    pub active: bool,
}

/// A threshold that produced a discount, kept for audit and invoices
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedThreshold {
    pub metric: QualityMetric,
    pub limit_percent: Decimal,
    pub measured_percent: Decimal,
}

impl From<&DiscountBreakdownEntry> for AppliedThreshold {
    fn from(entry: &DiscountBreakdownEntry) -> Self {
        Self {
            metric: entry.metric,
            limit_percent: entry.threshold_percent,
            measured_percent: entry.measured_percent,
        }
    }
}

/// Free-form context stored alongside a pricing calculation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CalculationMetadata {
    pub fruit_type_id: Option<Uuid>,
    pub calculated_at: Option<DateTime<Utc>>,
    pub calculated_by: Option<Uuid>,
    /// Daily price row the calculation used
    #[serde(default)]
    pub price_id: Option<Uuid>,
    #[serde(default)]
    pub price_date: Option<NaiveDate>,
    pub applied_thresholds: Vec<AppliedThreshold>,
}

/// Monetary value of a reception's (already discounted) weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingCalculation {
    pub base_price_per_unit: Decimal,
    pub weight_used: Decimal,
    pub gross_value: Decimal,
    /// Always zero: quality acts on weight, never on price
    pub total_discount_amount: Decimal,
    pub final_total: Decimal,
    pub metadata: CalculationMetadata,
}

impl PricingCalculation {
    pub fn with_metadata(mut self, metadata: CalculationMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}
