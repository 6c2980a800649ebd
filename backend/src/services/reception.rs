//! Reception lookups shared by the calculation services

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::Reception;

#[derive(Clone)]
pub struct ReceptionService {
    db: PgPool,
}

/// Database row for a reception
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ReceptionRow {
    id: Uuid,
    code: String,
    fruit_type_id: Uuid,
    original_weight: Decimal,
    final_weight: Option<Decimal>,
    cumulative_output_weight: Option<Decimal>,
    received_at: DateTime<Utc>,
}

impl From<ReceptionRow> for Reception {
    fn from(row: ReceptionRow) -> Self {
        Reception {
            id: row.id,
            code: row.code,
            fruit_type_id: row.fruit_type_id,
            original_weight: row.original_weight,
            final_weight: row.final_weight,
            cumulative_output_weight: row.cumulative_output_weight,
            received_at: row.received_at,
        }
    }
}

impl ReceptionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get_reception(&self, reception_id: Uuid) -> AppResult<Reception> {
        let row = sqlx::query_as::<_, ReceptionRow>(
            r#"
            SELECT id, code, fruit_type_id, original_weight, final_weight,
                   cumulative_output_weight, received_at
            FROM receptions
            WHERE id = $1
            "#,
        )
        .bind(reception_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Reception".to_string()))?;

        Ok(row.into())
    }
}

/// Fetch a reception and hold its row lock until the transaction ends
pub(crate) async fn lock_reception(
    conn: &mut PgConnection,
    reception_id: Uuid,
) -> AppResult<Reception> {
    let row = sqlx::query_as::<_, ReceptionRow>(
        r#"
        SELECT id, code, fruit_type_id, original_weight, final_weight,
               cumulative_output_weight, received_at
        FROM receptions
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(reception_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Reception".to_string()))?;

    Ok(row.into())
}

/// Lock several receptions in id order so concurrent batch operations
/// always acquire them in the same sequence
pub(crate) async fn lock_receptions(
    conn: &mut PgConnection,
    reception_ids: &[Uuid],
) -> AppResult<Vec<Reception>> {
    let mut ids = reception_ids.to_vec();
    ids.sort();
    ids.dedup();

    let rows = sqlx::query_as::<_, ReceptionRow>(
        r#"
        SELECT id, code, fruit_type_id, original_weight, final_weight,
               cumulative_output_weight, received_at
        FROM receptions
        WHERE id = ANY($1)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    if rows.len() != ids.len() {
        return Err(AppError::NotFound("Reception".to_string()));
    }

    Ok(rows.into_iter().map(Reception::from).collect())
}
