//! Best-effort calculation log
//!
//! Audit rows are secondary: a failed write is logged and swallowed, and
//! never rolls back the calculation it describes.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationAction {
    DiscountComputed,
    DiscountOverridden,
    PricingCalculated,
    BatchCreated,
    BatchCompleted,
}

impl CalculationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationAction::DiscountComputed => "discount_computed",
            CalculationAction::DiscountOverridden => "discount_overridden",
            CalculationAction::PricingCalculated => "pricing_calculated",
            CalculationAction::BatchCreated => "batch_created",
            CalculationAction::BatchCompleted => "batch_completed",
        }
    }
}

/// One calculation log row
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub reception_id: Option<Uuid>,
    pub batch_id: Option<Uuid>,
    pub action: CalculationAction,
    pub payload: serde_json::Value,
    pub actor_id: Uuid,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn for_reception(
        reception_id: Uuid,
        action: CalculationAction,
        payload: serde_json::Value,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            reception_id: Some(reception_id),
            batch_id: None,
            action,
            payload,
            actor_id,
            at,
        }
    }

    pub fn for_batch(
        batch_id: Uuid,
        action: CalculationAction,
        payload: serde_json::Value,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            reception_id: None,
            batch_id: Some(batch_id),
            action,
            payload,
            actor_id,
            at,
        }
    }
}

#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

impl AuditService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn record(&self, entry: &AuditEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO calculation_logs (reception_id, batch_id, action, payload, actor_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.reception_id)
        .bind(entry.batch_id)
        .bind(entry.action.as_str())
        .bind(&entry.payload)
        .bind(entry.actor_id)
        .bind(entry.at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Write the entry, logging instead of failing. Not retried.
    pub async fn record_best_effort(&self, entry: AuditEntry) {
        if let Err(e) = self.record(&entry).await {
            tracing::warn!(
                action = entry.action.as_str(),
                reception_id = ?entry.reception_id,
                batch_id = ?entry.batch_id,
                "Failed to write calculation log: {}",
                e
            );
        }
    }
}
