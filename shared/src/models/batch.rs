//! Pooled processing batch models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Batch lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    InProgress,
    Completed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "in_progress" => Some(BatchStatus::InProgress),
            "completed" => Some(BatchStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A pool of receptions processed together (drying, fermentation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub code: String,
    /// Sum of member contributions, captured at creation
    pub total_wet_weight: Decimal,
    /// Set once, at completion
    pub total_output_weight: Option<Decimal>,
    pub status: BatchStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_by: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One reception's contribution to a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchMember {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub reception_id: Uuid,
    pub wet_weight: Decimal,
    pub percentage_of_total: Decimal,
    pub proportional_output_weight: Option<Decimal>,
}
