//! Quality metrics, thresholds and evaluations

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A measured defect that can reduce a reception's payable weight.
///
/// The declaration order is the order discounts are chained in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum QualityMetric {
    Mold,
    Moisture,
    ForeignMatter,
}

impl QualityMetric {
    /// Canonical discount order, independent of how thresholds are stored
    pub const ORDERED: [QualityMetric; 3] = [
        QualityMetric::Mold,
        QualityMetric::Moisture,
        QualityMetric::ForeignMatter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityMetric::Mold => "mold",
            QualityMetric::Moisture => "moisture",
            QualityMetric::ForeignMatter => "foreign_matter",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mold" => Some(QualityMetric::Mold),
            "moisture" => Some(QualityMetric::Moisture),
            "foreign_matter" => Some(QualityMetric::ForeignMatter),
            _ => None,
        }
    }
}

impl std::fmt::Display for QualityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityMetric::Mold => write!(f, "Mold"),
            QualityMetric::Moisture => write!(f, "Moisture"),
            QualityMetric::ForeignMatter => write!(f, "Foreign matter"),
        }
    }
}

/// Percentage above which a metric starts discounting weight for a fruit type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscountThreshold {
    pub fruit_type_id: Uuid,
    pub metric: QualityMetric,
    pub limit_percent: Decimal,
    pub enabled: bool,
}

impl DiscountThreshold {
    /// An enabled threshold
    pub fn new(fruit_type_id: Uuid, metric: QualityMetric, limit_percent: Decimal) -> Self {
        Self {
            fruit_type_id,
            metric,
            limit_percent,
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Measured percentage per metric. A metric that is absent was not measured.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct QualityMeasurements(BTreeMap<QualityMetric, Decimal>);

impl QualityMeasurements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: QualityMetric, percent: Decimal) -> Self {
        self.set(metric, percent);
        self
    }

    pub fn set(&mut self, metric: QualityMetric, percent: Decimal) {
        self.0.insert(metric, percent);
    }

    pub fn get(&self, metric: QualityMetric) -> Option<Decimal> {
        self.0.get(&metric).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QualityMetric, Decimal)> + '_ {
        self.0.iter().map(|(metric, percent)| (*metric, *percent))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(QualityMetric, Decimal)> for QualityMeasurements {
    fn from_iter<I: IntoIterator<Item = (QualityMetric, Decimal)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Quality measured for one reception
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityEvaluation {
    pub id: Uuid,
    pub reception_id: Uuid,
    pub measurements: QualityMeasurements,
    /// Locked by the surrounding workflow; the engine recalculates regardless
    pub is_final: bool,
    pub evaluated_by: Uuid,
    pub evaluated_at: DateTime<Utc>,
}
