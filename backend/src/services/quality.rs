//! Quality evaluation and weight discount service
//!
//! A discount calculation reads thresholds, computes and persists as one
//! transaction holding the reception's row lock. The calculation log is
//! written afterwards and may fail on its own.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{AuditEntry, AuditService, CalculationAction};
use crate::services::reception::lock_reception;
use crate::services::thresholds::load_catalog;
use shared::{
    calculate_discount, validate_measurements, validate_override, DiscountBreakdownEntry,
    DiscountCalculation, DiscountSource, QualityEvaluation, QualityMeasurements,
};

#[derive(Clone)]
pub struct QualityService {
    db: PgPool,
    audit: AuditService,
    consistency_epsilon: Decimal,
}

/// Database row for a quality evaluation
#[derive(Debug, sqlx::FromRow)]
struct EvaluationRow {
    id: Uuid,
    reception_id: Uuid,
    measurements: serde_json::Value,
    is_final: bool,
    evaluated_by: Uuid,
    evaluated_at: DateTime<Utc>,
}

impl TryFrom<EvaluationRow> for QualityEvaluation {
    type Error = AppError;

    fn try_from(row: EvaluationRow) -> Result<Self, Self::Error> {
        let measurements: QualityMeasurements = serde_json::from_value(row.measurements)
            .map_err(|e| AppError::Internal(format!("Corrupt quality measurements: {}", e)))?;

        Ok(QualityEvaluation {
            id: row.id,
            reception_id: row.reception_id,
            measurements,
            is_final: row.is_final,
            evaluated_by: row.evaluated_by,
            evaluated_at: row.evaluated_at,
        })
    }
}

/// Database row for a weight discount result
#[derive(Debug, sqlx::FromRow)]
struct DiscountRow {
    id: Uuid,
    reception_id: Uuid,
    source: String,
    original_weight: Decimal,
    total_discount: Decimal,
    final_weight: Decimal,
    breakdown: serde_json::Value,
    override_reason: Option<String>,
    calculated_by: Uuid,
    calculated_at: DateTime<Utc>,
}

impl TryFrom<DiscountRow> for DiscountRecord {
    type Error = AppError;

    fn try_from(row: DiscountRow) -> Result<Self, Self::Error> {
        let breakdown: Vec<DiscountBreakdownEntry> = serde_json::from_value(row.breakdown)
            .map_err(|e| AppError::Internal(format!("Corrupt discount breakdown: {}", e)))?;
        let source = DiscountSource::parse(&row.source)
            .ok_or_else(|| AppError::Internal(format!("Unknown discount source '{}'", row.source)))?;

        Ok(DiscountRecord {
            id: row.id,
            reception_id: row.reception_id,
            source,
            original_weight: row.original_weight,
            total_discount: row.total_discount,
            final_weight: row.final_weight,
            breakdown,
            override_reason: row.override_reason,
            calculated_by: row.calculated_by,
            calculated_at: row.calculated_at,
        })
    }
}

/// Persisted weight discount, computed or overridden
#[derive(Debug, Clone, Serialize)]
pub struct DiscountRecord {
    pub id: Uuid,
    pub reception_id: Uuid,
    pub source: DiscountSource,
    pub original_weight: Decimal,
    pub total_discount: Decimal,
    pub final_weight: Decimal,
    pub breakdown: Vec<DiscountBreakdownEntry>,
    pub override_reason: Option<String>,
    pub calculated_by: Uuid,
    pub calculated_at: DateTime<Utc>,
}

/// Input for recording quality measurements
#[derive(Debug, Deserialize)]
pub struct RecordEvaluationInput {
    pub measurements: QualityMeasurements,
    #[serde(default)]
    pub is_final: bool,
}

/// Input for a manually supplied discount
#[derive(Debug, Deserialize, Validate)]
pub struct OverrideDiscountInput {
    pub original_weight: Decimal,
    pub discount_weight: Decimal,
    pub final_weight: Decimal,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

const DISCOUNT_COLUMNS: &str = "id, reception_id, source, original_weight, total_discount, \
     final_weight, breakdown, override_reason, calculated_by, calculated_at";

impl QualityService {
    pub fn new(db: PgPool, consistency_epsilon: Decimal) -> Self {
        Self {
            audit: AuditService::new(db.clone()),
            db,
            consistency_epsilon,
        }
    }

    /// Record (or overwrite) the quality measurements of a reception
    pub async fn record_evaluation(
        &self,
        reception_id: Uuid,
        input: RecordEvaluationInput,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<QualityEvaluation> {
        validate_measurements(&input.measurements)?;

        let measurements_json = serde_json::to_value(&input.measurements)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let mut tx = self.db.begin().await?;
        lock_reception(&mut *tx, reception_id).await?;

        let row = sqlx::query_as::<_, EvaluationRow>(
            r#"
            INSERT INTO quality_evaluations (reception_id, measurements, is_final, evaluated_by, evaluated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (reception_id) DO UPDATE
            SET measurements = EXCLUDED.measurements,
                is_final = EXCLUDED.is_final,
                evaluated_by = EXCLUDED.evaluated_by,
                evaluated_at = EXCLUDED.evaluated_at
            RETURNING id, reception_id, measurements, is_final, evaluated_by, evaluated_at
            "#,
        )
        .bind(reception_id)
        .bind(&measurements_json)
        .bind(input.is_final)
        .bind(actor_id)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.try_into()
    }

    /// Run the discount chain on a reception's measurements and store the
    /// result, replacing any earlier one
    pub async fn calculate_discount(
        &self,
        reception_id: Uuid,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<DiscountRecord> {
        let mut tx = self.db.begin().await?;

        let reception = lock_reception(&mut *tx, reception_id).await?;

        let evaluation: QualityEvaluation = sqlx::query_as::<_, EvaluationRow>(
            r#"
            SELECT id, reception_id, measurements, is_final, evaluated_by, evaluated_at
            FROM quality_evaluations
            WHERE reception_id = $1
            "#,
        )
        .bind(reception_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Quality evaluation".to_string()))?
        .try_into()?;

        let catalog = load_catalog(&mut *tx, reception.fruit_type_id).await?;

        let calculation =
            calculate_discount(reception.original_weight, &evaluation.measurements, &catalog)?;
        calculation.verify_consistency(self.consistency_epsilon)?;

        tracing::debug!(
            reception_id = %reception_id,
            steps = calculation.breakdown().len(),
            "Computed weight discount {} -> {}",
            calculation.original_weight(),
            calculation.final_weight()
        );

        let record = persist_discount(&mut *tx, reception_id, &calculation, actor_id, at).await?;
        tx.commit().await?;

        tracing::info!(
            reception_id = %reception_id,
            final_weight = %record.final_weight,
            "Weight discount calculated"
        );

        self.audit
            .record_best_effort(AuditEntry::for_reception(
                reception_id,
                CalculationAction::DiscountComputed,
                serde_json::to_value(&calculation).unwrap_or_default(),
                actor_id,
                at,
            ))
            .await;

        Ok(record)
    }

    /// Store an administrator-supplied discount in place of the computed one
    pub async fn apply_override(
        &self,
        reception_id: Uuid,
        input: OverrideDiscountInput,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<DiscountRecord> {
        input.validate().map_err(|e| AppError::Validation {
            field: "reason".to_string(),
            message: e.to_string(),
            message_es: "El motivo debe tener entre 1 y 500 caracteres".to_string(),
        })?;
        validate_override(
            input.original_weight,
            input.discount_weight,
            input.final_weight,
            &input.reason,
        )?;

        let mut tx = self.db.begin().await?;
        let reception = lock_reception(&mut *tx, reception_id).await?;

        if input.original_weight != reception.original_weight {
            return Err(AppError::Validation {
                field: "original_weight".to_string(),
                message: format!(
                    "Original weight {} does not match the received weight {}",
                    input.original_weight, reception.original_weight
                ),
                message_es: format!(
                    "El peso original {} no coincide con el peso recibido {}",
                    input.original_weight, reception.original_weight
                ),
            });
        }

        let calculation = DiscountCalculation::Overridden {
            original_weight: input.original_weight,
            discount_weight: input.discount_weight,
            final_weight: input.final_weight,
            reason: input.reason.trim().to_string(),
        };
        calculation.verify_consistency(self.consistency_epsilon)?;

        let record = persist_discount(&mut *tx, reception_id, &calculation, actor_id, at).await?;
        tx.commit().await?;

        tracing::info!(
            reception_id = %reception_id,
            final_weight = %record.final_weight,
            "Weight discount overridden"
        );

        self.audit
            .record_best_effort(AuditEntry::for_reception(
                reception_id,
                CalculationAction::DiscountOverridden,
                serde_json::to_value(&calculation).unwrap_or_default(),
                actor_id,
                at,
            ))
            .await;

        Ok(record)
    }

    /// Get the stored discount of a reception
    pub async fn get_discount(&self, reception_id: Uuid) -> AppResult<DiscountRecord> {
        let row = sqlx::query_as::<_, DiscountRow>(&format!(
            "SELECT {} FROM weight_discount_results WHERE reception_id = $1",
            DISCOUNT_COLUMNS
        ))
        .bind(reception_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Weight discount".to_string()))?;

        row.try_into()
    }
}

/// Upsert the discount result and write the reception's final weight
async fn persist_discount(
    conn: &mut PgConnection,
    reception_id: Uuid,
    calculation: &DiscountCalculation,
    actor_id: Uuid,
    at: DateTime<Utc>,
) -> AppResult<DiscountRecord> {
    let breakdown_json = serde_json::to_value(calculation.breakdown())
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let row = sqlx::query_as::<_, DiscountRow>(&format!(
        r#"
        INSERT INTO weight_discount_results
            (reception_id, source, original_weight, total_discount, final_weight,
             breakdown, override_reason, calculated_by, calculated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (reception_id) DO UPDATE
        SET source = EXCLUDED.source,
            original_weight = EXCLUDED.original_weight,
            total_discount = EXCLUDED.total_discount,
            final_weight = EXCLUDED.final_weight,
            breakdown = EXCLUDED.breakdown,
            override_reason = EXCLUDED.override_reason,
            calculated_by = EXCLUDED.calculated_by,
            calculated_at = EXCLUDED.calculated_at
        RETURNING {}
        "#,
        DISCOUNT_COLUMNS
    ))
    .bind(reception_id)
    .bind(calculation.source().as_str())
    .bind(calculation.original_weight())
    .bind(calculation.total_discount())
    .bind(calculation.final_weight())
    .bind(&breakdown_json)
    .bind(calculation.override_reason())
    .bind(actor_id)
    .bind(at)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE receptions SET final_weight = $1 WHERE id = $2")
        .bind(calculation.final_weight())
        .bind(reception_id)
        .execute(&mut *conn)
        .await?;

    row.try_into()
}
