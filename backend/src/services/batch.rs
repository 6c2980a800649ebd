//! Pooled batch service
//!
//! Completion runs as a single transaction: batch row lock, member reception
//! locks (in id order), member outputs, batch status and the recomputed
//! cumulative output of every affected reception. Nothing is left half
//! applied.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::audit::{AuditEntry, AuditService, CalculationAction};
use crate::services::reception::lock_receptions;
use shared::{
    aggregate_output_by_reception, allocate_batch, complete_batch, Batch, BatchMember,
    BatchStatus, CompletionPolicy,
};

#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
    audit: AuditService,
    policy: CompletionPolicy,
}

/// Database row for a batch
#[derive(Debug, sqlx::FromRow)]
struct BatchRow {
    id: Uuid,
    code: String,
    total_wet_weight: Decimal,
    total_output_weight: Option<Decimal>,
    status: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    completed_by: Option<Uuid>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            code: row.code,
            total_wet_weight: row.total_wet_weight,
            total_output_weight: row.total_output_weight,
            status: BatchStatus::parse(&row.status).unwrap_or(BatchStatus::InProgress),
            created_by: row.created_by,
            created_at: row.created_at,
            completed_by: row.completed_by,
            completed_at: row.completed_at,
        }
    }
}

/// Database row for a batch member
#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    batch_id: Uuid,
    reception_id: Uuid,
    wet_weight: Decimal,
    percentage_of_total: Decimal,
    proportional_output_weight: Option<Decimal>,
}

impl From<MemberRow> for BatchMember {
    fn from(row: MemberRow) -> Self {
        BatchMember {
            id: row.id,
            batch_id: row.batch_id,
            reception_id: row.reception_id,
            wet_weight: row.wet_weight,
            percentage_of_total: row.percentage_of_total,
            proportional_output_weight: row.proportional_output_weight,
        }
    }
}

/// Batch with its members
#[derive(Debug, Clone, Serialize)]
pub struct BatchWithMembers {
    #[serde(flatten)]
    pub batch: Batch,
    pub members: Vec<BatchMember>,
}

/// Input for forming a batch
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchInput {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1))]
    pub reception_ids: Vec<Uuid>,
}

/// Input for closing out a batch
#[derive(Debug, Deserialize)]
pub struct CompleteBatchInput {
    pub total_output_weight: Decimal,
}

const BATCH_COLUMNS: &str = "id, code, total_wet_weight, total_output_weight, status, \
     created_by, created_at, completed_by, completed_at";

const MEMBER_COLUMNS: &str =
    "id, batch_id, reception_id, wet_weight, percentage_of_total, proportional_output_weight";

impl BatchService {
    pub fn new(db: PgPool, policy: CompletionPolicy) -> Self {
        Self {
            audit: AuditService::new(db.clone()),
            db,
            policy,
        }
    }

    /// Form a batch. Each member contributes its reception's original
    /// weight, captured now and never refreshed.
    pub async fn create_batch(
        &self,
        input: CreateBatchInput,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<BatchWithMembers> {
        input.validate().map_err(|e| AppError::Validation {
            field: "batch".to_string(),
            message: e.to_string(),
            message_es: "El código y las recepciones del lote son obligatorios".to_string(),
        })?;

        let mut tx = self.db.begin().await?;

        let weights: HashMap<Uuid, Decimal> = lock_receptions(&mut *tx, &input.reception_ids)
            .await?
            .into_iter()
            .map(|r| (r.id, r.original_weight))
            .collect();

        let contributions: Vec<(Uuid, Decimal)> = input
            .reception_ids
            .iter()
            .map(|id| (*id, weights.get(id).copied().unwrap_or(Decimal::ZERO)))
            .collect();
        let allocation = allocate_batch(&contributions)?;

        let batch_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO batches (code, total_wet_weight, status, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(input.code.trim())
        .bind(allocation.total_wet_weight)
        .bind(BatchStatus::InProgress.as_str())
        .bind(actor_id)
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::DuplicateEntry("batch code".to_string())
            }
            other => AppError::DatabaseError(other),
        })?;

        for member in &allocation.members {
            sqlx::query(
                r#"
                INSERT INTO batch_members (batch_id, reception_id, wet_weight, percentage_of_total)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(batch_id)
            .bind(member.reception_id)
            .bind(member.wet_weight)
            .bind(member.percentage_of_total)
            .execute(&mut *tx)
            .await?;
        }

        let created = fetch_batch_with_members(&mut *tx, batch_id, false).await?;
        tx.commit().await?;

        tracing::info!(
            batch_id = %batch_id,
            members = created.members.len(),
            total_wet_weight = %created.batch.total_wet_weight,
            "Batch created"
        );

        self.audit
            .record_best_effort(AuditEntry::for_batch(
                batch_id,
                CalculationAction::BatchCreated,
                serde_json::to_value(&allocation).unwrap_or_default(),
                actor_id,
                at,
            ))
            .await;

        Ok(created)
    }

    /// Assign the batch's output weight back to its receptions
    pub async fn complete_batch(
        &self,
        batch_id: Uuid,
        input: CompleteBatchInput,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<BatchWithMembers> {
        let mut tx = self.db.begin().await?;

        let BatchWithMembers { batch, members } =
            fetch_batch_with_members(&mut *tx, batch_id, true).await?;

        let reception_ids: Vec<Uuid> = members.iter().map(|m| m.reception_id).collect();
        lock_receptions(&mut *tx, &reception_ids).await?;

        let completion = complete_batch(&batch, &members, input.total_output_weight, self.policy)?;

        for share in &completion.shares {
            sqlx::query("UPDATE batch_members SET proportional_output_weight = $1 WHERE id = $2")
                .bind(share.proportional_output_weight)
                .bind(share.member_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            UPDATE batches
            SET total_output_weight = $1, status = $2, completed_by = $3, completed_at = $4
            WHERE id = $5
            "#,
        )
        .bind(completion.total_output_weight)
        .bind(BatchStatus::Completed.as_str())
        .bind(actor_id)
        .bind(at)
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;

        recompute_cumulative_output(&mut *tx, &completion.affected_receptions()).await?;

        let completed = fetch_batch_with_members(&mut *tx, batch_id, false).await?;
        tx.commit().await?;

        tracing::info!(
            batch_id = %batch_id,
            total_output_weight = %completion.total_output_weight,
            receptions = completion.affected_receptions().len(),
            "Batch completed"
        );

        self.audit
            .record_best_effort(AuditEntry::for_batch(
                batch_id,
                CalculationAction::BatchCompleted,
                serde_json::to_value(&completion).unwrap_or_default(),
                actor_id,
                at,
            ))
            .await;

        Ok(completed)
    }

    /// Get a batch with its members
    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<BatchWithMembers> {
        let mut conn = self.db.acquire().await?;
        fetch_batch_with_members(&mut conn, batch_id, false).await
    }
}

async fn fetch_batch_with_members(
    conn: &mut PgConnection,
    batch_id: Uuid,
    for_update: bool,
) -> AppResult<BatchWithMembers> {
    let batch_sql = format!(
        "SELECT {} FROM batches WHERE id = $1{}",
        BATCH_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    let batch: Batch = sqlx::query_as::<_, BatchRow>(&batch_sql)
        .bind(batch_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))?
        .into();

    let members = sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {} FROM batch_members WHERE batch_id = $1 ORDER BY reception_id",
        MEMBER_COLUMNS
    ))
    .bind(batch_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(BatchMember::from)
    .collect();

    Ok(BatchWithMembers { batch, members })
}

/// Rewrite each reception's cumulative output from every membership row
/// that references it. The caller must hold the reception locks.
async fn recompute_cumulative_output(
    conn: &mut PgConnection,
    reception_ids: &[Uuid],
) -> AppResult<()> {
    let rows = sqlx::query_as::<_, (Uuid, Option<Decimal>)>(
        r#"
        SELECT reception_id, proportional_output_weight
        FROM batch_members
        WHERE reception_id = ANY($1)
        "#,
    )
    .bind(reception_ids)
    .fetch_all(&mut *conn)
    .await?;

    for (reception_id, total) in aggregate_output_by_reception(rows) {
        sqlx::query("UPDATE receptions SET cumulative_output_weight = $1 WHERE id = $2")
            .bind(total)
            .bind(reception_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}
