//! Reception models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Physical receipt of a commodity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reception {
    pub id: Uuid,
    pub code: String,
    pub fruit_type_id: Uuid,
    /// Wet weight as received
    pub original_weight: Decimal,
    /// Payable weight after the quality discount, once calculated
    pub final_weight: Option<Decimal>,
    /// Sum of proportional outputs over every batch the reception is in
    pub cumulative_output_weight: Option<Decimal>,
    pub received_at: DateTime<Utc>,
}

impl Reception {
    /// Weight to price: discounted if a discount exists, original otherwise
    pub fn payable_weight(&self) -> Decimal {
        self.final_weight.unwrap_or(self.original_weight)
    }
}
