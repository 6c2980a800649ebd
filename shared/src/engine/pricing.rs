//! Weight-only pricing

use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{CalculationMetadata, PricingCalculation};
use crate::types::round2;
use crate::validation::{validate_price, validate_weight_precision, ValidationErrors};

/// Price an already-discounted weight.
///
/// Quality only ever reduces the weight passed in here, so no further
/// discount is applied: `final_total == gross_value`.
pub fn price(base_price_per_unit: Decimal, weight: Decimal) -> PricingCalculation {
    let gross_value = round2(base_price_per_unit * weight);
    PricingCalculation {
        base_price_per_unit,
        weight_used: weight,
        gross_value,
        total_discount_amount: Decimal::ZERO,
        final_total: gross_value,
        metadata: CalculationMetadata::default(),
    }
}

/// `price` behind input validation
pub fn price_checked(base_price_per_unit: Decimal, weight: Decimal) -> EngineResult<PricingCalculation> {
    let mut errors = ValidationErrors::new();
    if let Err(reason) = validate_price(base_price_per_unit) {
        errors.push(reason);
    }
    if weight < Decimal::ZERO {
        errors.push("Weight to price cannot be negative");
    }
    if let Err(reason) = validate_weight_precision(weight) {
        errors.push(reason);
    }
    errors.into_result()?;

    Ok(price(base_price_per_unit, weight))
}

/// Money the quality discount withheld, for display only.
///
/// Kept apart from `price` so pricing never re-derives the weight discount.
pub fn quality_discount_value(
    original_weight: Decimal,
    final_weight: Decimal,
    base_price_per_unit: Decimal,
) -> Decimal {
    round2((original_weight - final_weight) * base_price_per_unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_price_is_weight_only() {
        let calc = price(dec("2.35"), dec("922.08"));
        assert_eq!(calc.gross_value, dec("2166.89"));
        assert_eq!(calc.final_total, calc.gross_value);
        assert_eq!(calc.total_discount_amount, Decimal::ZERO);
        assert_eq!(calc.weight_used, dec("922.08"));
    }

    #[test]
    fn test_price_checked_rejects_zero_price() {
        assert!(price_checked(Decimal::ZERO, dec("10")).is_err());
        assert!(price_checked(dec("1.5"), dec("-1")).is_err());
        assert!(price_checked(dec("1.5"), Decimal::ZERO).is_ok());
        assert!(price_checked(dec("1.5"), dec("10.001")).is_err());
    }

    #[test]
    fn test_quality_discount_value() {
        assert_eq!(
            quality_discount_value(dec("1000"), dec("922.08"), dec("2.35")),
            dec("183.11")
        );
    }
}
