//! Quality weight discount engine
//!
//! Discounts chain: each metric removes a share of what the previous metric
//! left, never of the original weight. Chaining runs at full precision;
//! only the values written into the result are rounded.

use rust_decimal::Decimal;

use crate::engine::ThresholdCatalog;
use crate::error::EngineResult;
use crate::models::{
    DiscountBreakdownEntry, DiscountCalculation, QualityMeasurements, QualityMetric,
    WeightDiscountResult,
};
use crate::types::{default_consistency_epsilon, round2};
use crate::validation::validate_discount_input;

/// Apply the discount chain to `original_weight`.
///
/// Metrics without an enabled threshold, and metrics measured at or below
/// their limit, produce no breakdown entry. An unmeasured metric counts as 0.
pub fn discount_weight(
    original_weight: Decimal,
    measurements: &QualityMeasurements,
    catalog: &ThresholdCatalog,
) -> WeightDiscountResult {
    let mut current_weight = original_weight;
    let mut breakdown = Vec::new();

    for metric in QualityMetric::ORDERED {
        let Some(threshold) = catalog.enabled(metric) else {
            continue;
        };
        let measured = measurements.get(metric).unwrap_or(Decimal::ZERO);
        if measured <= threshold.limit_percent {
            continue;
        }

        let excess_percent = measured - threshold.limit_percent;
        let discount = current_weight * excess_percent / Decimal::ONE_HUNDRED;
        current_weight -= discount;

        breakdown.push(DiscountBreakdownEntry {
            metric,
            threshold_percent: threshold.limit_percent,
            measured_percent: measured,
            excess_percent,
            discount_weight: round2(discount),
            remaining_weight: current_weight,
        });
    }

    WeightDiscountResult {
        original_weight,
        breakdown,
        total_discount: round2(original_weight - current_weight),
        final_weight: round2(current_weight),
    }
}

/// Validate, run the chain and check the result is self-consistent
pub fn calculate_discount(
    original_weight: Decimal,
    measurements: &QualityMeasurements,
    catalog: &ThresholdCatalog,
) -> EngineResult<DiscountCalculation> {
    validate_discount_input(original_weight, measurements, catalog)?;

    let calculation =
        DiscountCalculation::Computed(discount_weight(original_weight, measurements, catalog));
    calculation.verify_consistency(default_consistency_epsilon())?;

    Ok(calculation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::models::DiscountThreshold;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn catalog(limits: &[(QualityMetric, &str)]) -> ThresholdCatalog {
        let fruit = Uuid::new_v4();
        ThresholdCatalog::new(
            fruit,
            limits
                .iter()
                .map(|(metric, limit)| DiscountThreshold::new(fruit, *metric, dec(limit))),
        )
    }

    fn standard_catalog() -> ThresholdCatalog {
        catalog(&[
            (QualityMetric::Mold, "10"),
            (QualityMetric::Moisture, "15"),
            (QualityMetric::ForeignMatter, "5"),
        ])
    }

    #[test]
    fn test_worked_example() {
        let measurements = QualityMeasurements::new()
            .with(QualityMetric::Mold, dec("12"))
            .with(QualityMetric::Moisture, dec("18"))
            .with(QualityMetric::ForeignMatter, dec("8"));

        let result = discount_weight(dec("1000"), &measurements, &standard_catalog());

        let discounts: Vec<Decimal> = result.breakdown.iter().map(|e| e.discount_weight).collect();
        assert_eq!(discounts, vec![dec("20.00"), dec("29.40"), dec("28.52")]);
        assert_eq!(result.total_discount, dec("77.92"));
        assert_eq!(result.final_weight, dec("922.08"));
        assert_eq!(result.breakdown[2].remaining_weight, dec("922.082"));
    }

    #[test]
    fn test_excess_is_measured_minus_limit() {
        let measurements = QualityMeasurements::new().with(QualityMetric::Moisture, dec("18"));
        let result = discount_weight(dec("1000"), &measurements, &standard_catalog());

        let entry = &result.breakdown[0];
        assert_eq!(entry.metric, QualityMetric::Moisture);
        assert_eq!(entry.threshold_percent, dec("15"));
        assert_eq!(entry.measured_percent, dec("18"));
        assert_eq!(entry.excess_percent, dec("3"));
        assert_eq!(entry.discount_weight, dec("30.00"));
    }

    #[test]
    fn test_measured_equal_to_limit_is_skipped() {
        let measurements = QualityMeasurements::new().with(QualityMetric::Mold, dec("10"));
        let result = discount_weight(dec("500"), &measurements, &standard_catalog());
        assert!(!result.has_discount());
        assert_eq!(result.final_weight, dec("500"));
        assert_eq!(result.total_discount, Decimal::ZERO);
    }

    #[test]
    fn test_disabled_metric_is_skipped() {
        let fruit = Uuid::new_v4();
        let catalog = ThresholdCatalog::new(
            fruit,
            vec![
                DiscountThreshold::new(fruit, QualityMetric::Mold, dec("10")).disabled(),
                DiscountThreshold::new(fruit, QualityMetric::Moisture, dec("10")),
            ],
        );
        let measurements = QualityMeasurements::new()
            .with(QualityMetric::Mold, dec("50"))
            .with(QualityMetric::Moisture, dec("20"));

        let result = discount_weight(dec("1000"), &measurements, &catalog);
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.final_weight, dec("900.00"));
    }

    #[test]
    fn test_calculate_discount_rejects_invalid_input() {
        let measurements = QualityMeasurements::new().with(QualityMetric::Mold, dec("101"));
        let err = calculate_discount(dec("1000"), &measurements, &standard_catalog()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_calculate_discount_is_computed_variant() {
        let measurements = QualityMeasurements::new().with(QualityMetric::Mold, dec("20"));
        let calculation =
            calculate_discount(dec("1000"), &measurements, &standard_catalog()).unwrap();
        assert!(matches!(calculation, DiscountCalculation::Computed(_)));
        assert_eq!(calculation.final_weight(), dec("900.00"));
        assert_eq!(calculation.total_discount(), dec("100.00"));
    }
}
