//! Read-only view of a fruit type's discount thresholds

use serde::Serialize;
use uuid::Uuid;

use crate::models::{DiscountThreshold, QualityMetric};

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdCatalog {
    fruit_type_id: Uuid,
    thresholds: Vec<DiscountThreshold>,
}

impl ThresholdCatalog {
    /// Build the view for `fruit_type_id`; rows for other fruit types are dropped
    pub fn new(fruit_type_id: Uuid, thresholds: impl IntoIterator<Item = DiscountThreshold>) -> Self {
        let thresholds = thresholds
            .into_iter()
            .filter(|t| t.fruit_type_id == fruit_type_id)
            .collect();
        Self {
            fruit_type_id,
            thresholds,
        }
    }

    pub fn fruit_type_id(&self) -> Uuid {
        self.fruit_type_id
    }

    pub fn thresholds(&self) -> &[DiscountThreshold] {
        &self.thresholds
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Whether any row exists for `metric`, enabled or not
    pub fn contains(&self, metric: QualityMetric) -> bool {
        self.thresholds.iter().any(|t| t.metric == metric)
    }

    /// The enabled threshold for `metric`, if any
    pub fn enabled(&self, metric: QualityMetric) -> Option<&DiscountThreshold> {
        self.thresholds.iter().find(|t| t.metric == metric && t.enabled)
    }

    /// Enabled thresholds in canonical metric order
    pub fn enabled_in_order(&self) -> impl Iterator<Item = &DiscountThreshold> + '_ {
        QualityMetric::ORDERED
            .into_iter()
            .filter_map(move |metric| self.enabled(metric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_enabled_in_order_ignores_storage_order() {
        let fruit = Uuid::new_v4();
        let catalog = ThresholdCatalog::new(
            fruit,
            vec![
                DiscountThreshold::new(fruit, QualityMetric::ForeignMatter, Decimal::from(5)),
                DiscountThreshold::new(fruit, QualityMetric::Moisture, Decimal::from(15)),
                DiscountThreshold::new(fruit, QualityMetric::Mold, Decimal::from(10)),
            ],
        );

        let order: Vec<QualityMetric> = catalog.enabled_in_order().map(|t| t.metric).collect();
        assert_eq!(
            order,
            vec![
                QualityMetric::Mold,
                QualityMetric::Moisture,
                QualityMetric::ForeignMatter
            ]
        );
    }

    #[test]
    fn test_disabled_threshold_is_contained_but_not_enabled() {
        let fruit = Uuid::new_v4();
        let catalog = ThresholdCatalog::new(
            fruit,
            vec![DiscountThreshold::new(fruit, QualityMetric::Mold, Decimal::from(10)).disabled()],
        );

        assert!(catalog.contains(QualityMetric::Mold));
        assert!(catalog.enabled(QualityMetric::Mold).is_none());
        assert_eq!(catalog.enabled_in_order().count(), 0);
    }

    #[test]
    fn test_other_fruit_types_are_dropped() {
        let fruit = Uuid::new_v4();
        let other = Uuid::new_v4();
        let catalog = ThresholdCatalog::new(
            fruit,
            vec![DiscountThreshold::new(other, QualityMetric::Mold, Decimal::from(10))],
        );
        assert!(catalog.is_empty());
    }
}
