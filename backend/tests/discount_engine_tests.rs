//! Weight discount engine tests for the Commodity Reception Platform
//!
//! Covers sequential chaining, the canonical metric order and the
//! consistency of every stored result.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    calculate_discount, discount_weight, within_tolerance, DiscountCalculation, DiscountThreshold,
    EngineError, QualityMeasurements, QualityMetric, ThresholdCatalog,
};
use std::str::FromStr;
use uuid::Uuid;

/// Helper to create Decimal from string
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

fn measurements(mold: &str, moisture: &str, foreign_matter: &str) -> QualityMeasurements {
    QualityMeasurements::new()
        .with(QualityMetric::Mold, dec(mold))
        .with(QualityMetric::Moisture, dec(moisture))
        .with(QualityMetric::ForeignMatter, dec(foreign_matter))
}

// ============================================================================
// Worked examples
// ============================================================================

mod worked_examples {
    use super::*;

    #[test]
    fn discounts_chain_on_the_remaining_weight() {
        let catalog = catalog(&[(QualityMetric::Mold, "10"), (QualityMetric::Moisture, "10")]);
        let m = QualityMeasurements::new()
            .with(QualityMetric::Mold, dec("20"))
            .with(QualityMetric::Moisture, dec("20"));

        let result = discount_weight(dec("1000"), &m, &catalog);

        // 10% of 1000, then 10% of 900
        assert_eq!(result.final_weight, dec("810"));
        assert_eq!(result.breakdown[0].discount_weight, dec("100"));
        assert_eq!(result.breakdown[1].discount_weight, dec("90"));
        assert_eq!(result.total_discount, dec("190"));
    }

    #[test]
    fn three_metric_example() {
        let result = discount_weight(dec("1000"), &measurements("12", "18", "8"), &standard_catalog());

        let steps: Vec<Decimal> = result.breakdown.iter().map(|e| e.discount_weight).collect();
        assert_eq!(steps, vec![dec("20.00"), dec("29.40"), dec("28.52")]);
        assert_eq!(result.total_discount, dec("77.92"));
        assert_eq!(result.final_weight, dec("922.08"));
    }

    #[test]
    fn zero_measurements_leave_weight_untouched() {
        let result = discount_weight(dec("750"), &measurements("0", "0", "0"), &standard_catalog());

        assert_eq!(result.final_weight, dec("750"));
        assert_eq!(result.total_discount, Decimal::ZERO);
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn maximal_measurements() {
        let result =
            discount_weight(dec("1000"), &measurements("100", "100", "100"), &standard_catalog());

        let steps: Vec<Decimal> = result.breakdown.iter().map(|e| e.discount_weight).collect();
        assert_eq!(steps, vec![dec("900.00"), dec("85.00"), dec("14.25")]);
        assert_eq!(result.final_weight, dec("0.75"));
    }

    #[test]
    fn total_comes_from_the_unrounded_chain() {
        let catalog = catalog(&[
            (QualityMetric::Mold, "0"),
            (QualityMetric::Moisture, "0"),
            (QualityMetric::ForeignMatter, "0"),
        ]);

        let calculation =
            calculate_discount(dec("1"), &measurements("0.4", "0.4", "0.4"), &catalog).unwrap();
        let DiscountCalculation::Computed(result) = calculation else {
            panic!("expected a computed discount");
        };

        let steps: Vec<Decimal> = result.breakdown.iter().map(|e| e.discount_weight).collect();
        assert_eq!(steps, vec![dec("0.00"), dec("0.00"), dec("0.00")]);
        assert_eq!(result.breakdown_sum(), dec("0.00"));
        // Not the sum of the rounded steps
        assert_eq!(result.total_discount, dec("0.01"));
        assert_eq!(result.final_weight, dec("0.99"));
    }

    #[test]
    fn order_does_not_depend_on_threshold_storage() {
        let fruit = Uuid::new_v4();
        let reversed = ThresholdCatalog::new(
            fruit,
            vec![
                DiscountThreshold::new(fruit, QualityMetric::ForeignMatter, dec("5")),
                DiscountThreshold::new(fruit, QualityMetric::Moisture, dec("15")),
                DiscountThreshold::new(fruit, QualityMetric::Mold, dec("10")),
            ],
        );

        let result = discount_weight(dec("1000"), &measurements("12", "18", "8"), &reversed);

        let order: Vec<QualityMetric> = result.breakdown.iter().map(|e| e.metric).collect();
        assert_eq!(order, QualityMetric::ORDERED.to_vec());
        assert_eq!(result.final_weight, dec("922.08"));
    }

    #[test]
    fn disabled_threshold_is_skipped() {
        let fruit = Uuid::new_v4();
        let catalog = ThresholdCatalog::new(
            fruit,
            vec![
                DiscountThreshold::new(fruit, QualityMetric::Mold, dec("10")).disabled(),
                DiscountThreshold::new(fruit, QualityMetric::Moisture, dec("15")),
            ],
        );
        let m = QualityMeasurements::new()
            .with(QualityMetric::Mold, dec("50"))
            .with(QualityMetric::Moisture, dec("20"));

        let result = discount_weight(dec("1000"), &m, &catalog);

        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].metric, QualityMetric::Moisture);
        assert_eq!(result.final_weight, dec("950"));
    }
}

// ============================================================================
// Validation and overrides
// ============================================================================

mod validation {
    use super::*;

    #[test]
    fn rejects_non_positive_weight() {
        let err = calculate_discount(Decimal::ZERO, &measurements("0", "0", "0"), &standard_catalog())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn rejects_weight_with_sub_cent_precision() {
        let err = calculate_discount(
            dec("100.005"),
            &QualityMeasurements::new(),
            &standard_catalog(),
        )
        .unwrap_err();

        let EngineError::Validation(errors) = err else {
            panic!("expected a validation error");
        };
        assert!(errors
            .reasons()
            .iter()
            .any(|r| r.contains("at most two decimals")));
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        let calculation = calculate_discount(
            dec("100.0500"),
            &QualityMeasurements::new(),
            &standard_catalog(),
        )
        .unwrap();
        assert_eq!(calculation.final_weight(), dec("100.05"));
        assert_eq!(calculation.total_discount(), Decimal::ZERO);
    }

    #[test]
    fn rejects_percentage_out_of_range() {
        let err = calculate_discount(dec("100"), &measurements("101", "0", "0"), &standard_catalog())
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn rejects_empty_catalog() {
        let empty = ThresholdCatalog::new(Uuid::new_v4(), Vec::new());
        let err = calculate_discount(dec("100"), &QualityMeasurements::new(), &empty).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn consistent_override_is_accepted() {
        let calculation = DiscountCalculation::Overridden {
            original_weight: dec("1000"),
            discount_weight: dec("50"),
            final_weight: dec("950"),
            reason: "Scale recalibrated".to_string(),
        };
        assert!(calculation.verify_consistency(dec("0.01")).is_ok());
    }

    #[test]
    fn inconsistent_override_is_rejected() {
        let calculation = DiscountCalculation::Overridden {
            original_weight: dec("1000"),
            discount_weight: dec("50"),
            final_weight: dec("940"),
            reason: "Typo".to_string(),
        };
        let err = calculation.verify_consistency(dec("0.01")).unwrap_err();
        assert!(matches!(err, EngineError::Consistency { .. }));
    }
}

// ============================================================================
// Properties
// ============================================================================

fn weight_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn percent_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Measurements at or under every threshold never discount anything
    #[test]
    fn property_no_excess_means_no_discount(
        weight in weight_strategy(),
        mold in 0i64..=1000,
        moisture in 0i64..=1500,
        foreign in 0i64..=500,
    ) {
        let m = QualityMeasurements::new()
            .with(QualityMetric::Mold, Decimal::new(mold, 2))
            .with(QualityMetric::Moisture, Decimal::new(moisture, 2))
            .with(QualityMetric::ForeignMatter, Decimal::new(foreign, 2));

        let result = discount_weight(weight, &m, &standard_catalog());

        prop_assert_eq!(result.final_weight, weight);
        prop_assert!(result.breakdown.is_empty());
    }

    /// Final weight stays in [0, original] and matches original - total
    #[test]
    fn property_result_is_consistent(
        weight in weight_strategy(),
        mold in percent_strategy(),
        moisture in percent_strategy(),
        foreign in percent_strategy(),
    ) {
        let m = QualityMeasurements::new()
            .with(QualityMetric::Mold, mold)
            .with(QualityMetric::Moisture, moisture)
            .with(QualityMetric::ForeignMatter, foreign);

        let calculation = calculate_discount(weight, &m, &standard_catalog());
        prop_assert!(calculation.is_ok(), "unexpected error: {:?}", calculation);
        let calculation = calculation.unwrap();

        prop_assert!(calculation.final_weight() >= Decimal::ZERO);
        prop_assert!(calculation.final_weight() <= weight);
        prop_assert!(within_tolerance(
            weight - calculation.total_discount(),
            calculation.final_weight(),
            dec("0.01"),
        ));
    }

    /// Each step removes a share of what the previous step left
    #[test]
    fn property_steps_chain(
        weight in weight_strategy(),
        mold in 1001i64..=10_000,
        moisture in 1501i64..=10_000,
    ) {
        let m = QualityMeasurements::new()
            .with(QualityMetric::Mold, Decimal::new(mold, 2))
            .with(QualityMetric::Moisture, Decimal::new(moisture, 2));

        let result = discount_weight(weight, &m, &standard_catalog());
        prop_assert_eq!(result.breakdown.len(), 2);

        let first = &result.breakdown[0];
        let second = &result.breakdown[1];
        let expected_first = weight * first.excess_percent / Decimal::ONE_HUNDRED;
        prop_assert_eq!(first.remaining_weight, weight - expected_first);

        let expected_second = first.remaining_weight * second.excess_percent / Decimal::ONE_HUNDRED;
        prop_assert_eq!(second.remaining_weight, first.remaining_weight - expected_second);
    }
}
