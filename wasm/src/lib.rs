//! WebAssembly module for the Commodity Reception Platform
//!
//! Lets the reception desk preview calculations before saving them:
//! - Quality weight discount chain
//! - Weight-only pricing and the display-only discount value
//! - Batch percentages and output distribution
//!
//! Decimals cross the boundary as strings so no precision is lost to `f64`.
//! The results match what the server stores because both call `shared`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

use shared::{
    allocate_batch, calculate_discount, distribute_output, price_checked, quality_discount_value,
    BatchMember, DiscountThreshold, EngineError, QualityMeasurements, ThresholdCatalog,
};

fn to_js_error(message: String) -> JsValue {
    web_sys::console::warn_1(&JsValue::from_str(&message));
    js_sys::Error::new(&message).into()
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

fn engine_message(err: EngineError) -> String {
    err.to_string()
}

// ============================================================================
// Weight Discount
// ============================================================================

fn preview_discount(
    original_weight: &str,
    measurements_json: &str,
    thresholds_json: &str,
) -> Result<String, String> {
    let original_weight = parse_decimal("original weight", original_weight)?;
    let measurements: QualityMeasurements = serde_json::from_str(measurements_json)
        .map_err(|e| format!("Invalid measurements JSON: {}", e))?;
    let thresholds: Vec<DiscountThreshold> = serde_json::from_str(thresholds_json)
        .map_err(|e| format!("Invalid thresholds JSON: {}", e))?;

    // Thresholds arrive already scoped to one fruit type
    let fruit_type_id = thresholds
        .first()
        .map(|t| t.fruit_type_id)
        .unwrap_or_else(Uuid::nil);
    let catalog = ThresholdCatalog::new(fruit_type_id, thresholds);

    let calculation =
        calculate_discount(original_weight, &measurements, &catalog).map_err(engine_message)?;
    serde_json::to_string(&calculation).map_err(|e| e.to_string())
}

/// Preview the weight discount of a reception.
///
/// `measurements_json` maps metric names to percentages, e.g.
/// `{"mold": "12", "moisture": "18"}`; `thresholds_json` is the list
/// returned by `GET /fruit-types/:id/thresholds`.
#[wasm_bindgen]
pub fn calculate_weight_discount(
    original_weight: &str,
    measurements_json: &str,
    thresholds_json: &str,
) -> Result<String, JsValue> {
    preview_discount(original_weight, measurements_json, thresholds_json).map_err(to_js_error)
}

// ============================================================================
// Pricing
// ============================================================================

fn preview_price(base_price_per_unit: &str, weight: &str) -> Result<String, String> {
    let base = parse_decimal("price", base_price_per_unit)?;
    let weight = parse_decimal("weight", weight)?;
    let calculation = price_checked(base, weight).map_err(engine_message)?;
    serde_json::to_string(&calculation).map_err(|e| e.to_string())
}

/// Price a (discounted) weight; returns the calculation as JSON
#[wasm_bindgen]
pub fn calculate_price(base_price_per_unit: &str, weight: &str) -> Result<String, JsValue> {
    preview_price(base_price_per_unit, weight).map_err(to_js_error)
}

fn preview_quality_discount_value(
    original_weight: &str,
    final_weight: &str,
    base_price_per_unit: &str,
) -> Result<String, String> {
    let value = quality_discount_value(
        parse_decimal("original weight", original_weight)?,
        parse_decimal("final weight", final_weight)?,
        parse_decimal("price", base_price_per_unit)?,
    );
    Ok(value.to_string())
}

/// Money withheld by the weight discount, for display
#[wasm_bindgen]
pub fn calculate_quality_discount_value(
    original_weight: &str,
    final_weight: &str,
    base_price_per_unit: &str,
) -> Result<String, JsValue> {
    preview_quality_discount_value(original_weight, final_weight, base_price_per_unit)
        .map_err(to_js_error)
}

// ============================================================================
// Batches
// ============================================================================

#[derive(Deserialize)]
struct Contribution {
    reception_id: Uuid,
    wet_weight: Decimal,
}

fn preview_allocation(contributions_json: &str) -> Result<String, String> {
    let allocation =
        allocate_batch(&parse_contributions(contributions_json)?).map_err(engine_message)?;
    serde_json::to_string(&allocation).map_err(|e| e.to_string())
}

/// Percentages each reception would hold in a new batch
#[wasm_bindgen]
pub fn allocate_batch_preview(contributions_json: &str) -> Result<String, JsValue> {
    preview_allocation(contributions_json).map_err(to_js_error)
}

fn parse_contributions(contributions_json: &str) -> Result<Vec<(Uuid, Decimal)>, String> {
    let contributions: Vec<Contribution> = serde_json::from_str(contributions_json)
        .map_err(|e| format!("Invalid contributions JSON: {}", e))?;
    Ok(contributions
        .into_iter()
        .map(|c| (c.reception_id, c.wet_weight))
        .collect())
}

#[derive(Serialize)]
struct OutputPreview {
    reception_id: Uuid,
    proportional_output_weight: Decimal,
}

fn preview_distribution(
    contributions_json: &str,
    total_output_weight: &str,
) -> Result<String, String> {
    let total_output_weight = parse_decimal("output weight", total_output_weight)?;
    shared::validate_output_weight(total_output_weight).map_err(str::to_string)?;
    shared::validate_weight_precision(total_output_weight).map_err(str::to_string)?;

    let allocation =
        allocate_batch(&parse_contributions(contributions_json)?).map_err(engine_message)?;
    // Not persisted, so the member and batch ids are placeholders
    let members: Vec<BatchMember> = allocation
        .members
        .iter()
        .map(|m| BatchMember {
            id: Uuid::nil(),
            batch_id: Uuid::nil(),
            reception_id: m.reception_id,
            wet_weight: m.wet_weight,
            percentage_of_total: m.percentage_of_total,
            proportional_output_weight: None,
        })
        .collect();

    let outputs: Vec<OutputPreview> =
        distribute_output(allocation.total_wet_weight, &members, total_output_weight)
            .into_iter()
            .map(|share| OutputPreview {
                reception_id: share.reception_id,
                proportional_output_weight: share.proportional_output_weight,
            })
            .collect();
    serde_json::to_string(&outputs).map_err(|e| e.to_string())
}

/// Output each reception would receive from a batch.
///
/// Takes the same `[{reception_id, wet_weight}]` list as
/// `allocate_batch_preview`.
#[wasm_bindgen]
pub fn distribute_output_preview(
    contributions_json: &str,
    total_output_weight: &str,
) -> Result<String, JsValue> {
    preview_distribution(contributions_json, total_output_weight).map_err(to_js_error)
}

/// Validate a quality percentage (0 to 100 inclusive)
#[wasm_bindgen]
pub fn validate_quality_percentage(value: &str) -> bool {
    Decimal::from_str(value.trim())
        .map(|v| shared::validate_percentage(v).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn thresholds() -> String {
        let fruit = Uuid::new_v4();
        format!(
            r#"[
                {{"fruit_type_id": "{fruit}", "metric": "mold", "limit_percent": "10", "enabled": true}},
                {{"fruit_type_id": "{fruit}", "metric": "moisture", "limit_percent": "15", "enabled": true}},
                {{"fruit_type_id": "{fruit}", "metric": "foreign_matter", "limit_percent": "5", "enabled": true}}
            ]"#
        )
    }

    #[test]
    fn test_preview_discount_worked_example() {
        let json = preview_discount(
            "1000",
            r#"{"mold": "12", "moisture": "18", "foreign_matter": "8"}"#,
            &thresholds(),
        )
        .unwrap();

        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["source"], "computed");
        assert_eq!(value["final_weight"], "922.08");
        assert_eq!(value["total_discount"], "77.92");
    }

    #[test]
    fn test_preview_discount_rejects_bad_weight() {
        let err = preview_discount("0", "{}", &thresholds()).unwrap_err();
        assert!(err.contains("greater than zero"));
    }

    #[test]
    fn test_preview_price() {
        let value: Value = serde_json::from_str(&preview_price("2.35", "922.08").unwrap()).unwrap();
        assert_eq!(value["gross_value"], "2166.89");
        assert_eq!(value["final_total"], "2166.89");
    }

    #[test]
    fn test_preview_quality_discount_value() {
        assert_eq!(
            preview_quality_discount_value("1000", "922.08", "2.35").unwrap(),
            "183.11"
        );
    }

    #[test]
    fn test_preview_allocation() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let json = format!(
            r#"[{{"reception_id": "{a}", "wet_weight": "100"}}, {{"reception_id": "{b}", "wet_weight": "300"}}]"#
        );
        let value: Value = serde_json::from_str(&preview_allocation(&json).unwrap()).unwrap();
        assert_eq!(value["total_wet_weight"], "400");
        assert_eq!(value["members"][0]["percentage_of_total"], "25.00");
        assert_eq!(value["members"][1]["percentage_of_total"], "75.00");
    }

    #[test]
    fn test_preview_distribution_from_contributions() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let json = format!(
            r#"[{{"reception_id": "{a}", "wet_weight": "100"}},
                {{"reception_id": "{b}", "wet_weight": "200"}},
                {{"reception_id": "{c}", "wet_weight": "700"}}]"#
        );

        let value: Value =
            serde_json::from_str(&preview_distribution(&json, "400").unwrap()).unwrap();
        let outputs: Vec<Decimal> = value
            .as_array()
            .unwrap()
            .iter()
            .map(|v| Decimal::from_str(v["proportional_output_weight"].as_str().unwrap()).unwrap())
            .collect();
        assert_eq!(outputs, vec![Decimal::from(40), Decimal::from(80), Decimal::from(280)]);
        assert_eq!(value[0]["reception_id"], a.to_string());
    }

    #[test]
    fn test_preview_distribution_rejects_bad_output() {
        let a = Uuid::new_v4();
        let json = format!(r#"[{{"reception_id": "{a}", "wet_weight": "100"}}]"#);
        assert!(preview_distribution(&json, "-1").is_err());
        assert!(preview_distribution(&json, "10.005").is_err());
        assert!(preview_distribution("[]", "10").is_err());
    }

    #[test]
    fn test_validate_quality_percentage() {
        assert!(validate_quality_percentage("0"));
        assert!(validate_quality_percentage("100"));
        assert!(!validate_quality_percentage("100.01"));
        assert!(!validate_quality_percentage("abc"));
    }
}
