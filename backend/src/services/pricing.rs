//! Reception pricing service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::audit::{AuditEntry, AuditService, CalculationAction};
use crate::services::reception::lock_reception;
use shared::{
    price_checked, quality_discount_value, AppliedThreshold, CalculationMetadata, DailyPrice,
    DiscountBreakdownEntry, PricingCalculation,
};

#[derive(Clone)]
pub struct PricingService {
    db: PgPool,
    audit: AuditService,
}

/// Database row for a pricing calculation joined with its reception weights
#[derive(Debug, sqlx::FromRow)]
struct PricingRow {
    id: Uuid,
    reception_id: Uuid,
    base_price_per_unit: Decimal,
    weight_used: Decimal,
    gross_value: Decimal,
    total_discount_amount: Decimal,
    final_total: Decimal,
    metadata: serde_json::Value,
    calculated_by: Uuid,
    calculated_at: DateTime<Utc>,
    original_weight: Decimal,
}

impl TryFrom<PricingRow> for PricingRecord {
    type Error = AppError;

    fn try_from(row: PricingRow) -> Result<Self, Self::Error> {
        let metadata: CalculationMetadata = serde_json::from_value(row.metadata)
            .map_err(|e| AppError::Internal(format!("Corrupt pricing metadata: {}", e)))?;

        Ok(PricingRecord {
            id: row.id,
            reception_id: row.reception_id,
            quality_discount_value: quality_discount_value(
                row.original_weight,
                row.weight_used,
                row.base_price_per_unit,
            ),
            calculation: PricingCalculation {
                base_price_per_unit: row.base_price_per_unit,
                weight_used: row.weight_used,
                gross_value: row.gross_value,
                total_discount_amount: row.total_discount_amount,
                final_total: row.final_total,
                metadata,
            },
            calculated_by: row.calculated_by,
            calculated_at: row.calculated_at,
        })
    }
}

/// Database row for a daily price
#[derive(Debug, sqlx::FromRow)]
struct DailyPriceRow {
    id: Uuid,
    fruit_type_id: Uuid,
    price_date: NaiveDate,
    price_per_unit: Decimal,
    active: bool,
}

impl From<DailyPriceRow> for DailyPrice {
    fn from(row: DailyPriceRow) -> Self {
        DailyPrice {
            id: row.id,
            fruit_type_id: row.fruit_type_id,
            price_date: row.price_date,
            price_per_unit: row.price_per_unit,
            active: row.active,
        }
    }
}

/// Persisted pricing calculation
#[derive(Debug, Clone, Serialize)]
pub struct PricingRecord {
    pub id: Uuid,
    pub reception_id: Uuid,
    #[serde(flatten)]
    pub calculation: PricingCalculation,
    /// Display only: money withheld by the weight discount
    pub quality_discount_value: Decimal,
    pub calculated_by: Uuid,
    pub calculated_at: DateTime<Utc>,
}

/// Input for pricing a reception
#[derive(Debug, Default, Deserialize)]
pub struct PriceReceptionInput {
    /// Defaults to the calculation date
    pub price_date: Option<NaiveDate>,
}

const PRICING_SELECT: &str = r#"
    SELECT p.id, p.reception_id, p.base_price_per_unit, p.weight_used, p.gross_value,
           p.total_discount_amount, p.final_total, p.metadata, p.calculated_by,
           p.calculated_at, r.original_weight
    FROM pricing_calculations p
    JOIN receptions r ON r.id = p.reception_id
    WHERE p.reception_id = $1
"#;

impl PricingService {
    pub fn new(db: PgPool) -> Self {
        Self {
            audit: AuditService::new(db.clone()),
            db,
        }
    }

    /// Price a reception at the active daily price for its fruit type
    pub async fn price_reception(
        &self,
        reception_id: Uuid,
        input: PriceReceptionInput,
        actor_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<PricingRecord> {
        let price_date = input.price_date.unwrap_or_else(|| at.date_naive());

        let mut tx = self.db.begin().await?;
        let reception = lock_reception(&mut *tx, reception_id).await?;

        let daily_price = active_price(&mut *tx, reception.fruit_type_id, price_date)
            .await?
            .ok_or_else(|| {
                AppError::ConfigurationNotFound(format!(
                    "active price for fruit type {} on {}",
                    reception.fruit_type_id, price_date
                ))
            })?;

        let breakdown = stored_breakdown(&mut *tx, reception_id).await?;

        let metadata = CalculationMetadata {
            fruit_type_id: Some(reception.fruit_type_id),
            calculated_at: Some(at),
            calculated_by: Some(actor_id),
            price_id: Some(daily_price.id),
            price_date: Some(daily_price.price_date),
            applied_thresholds: breakdown.iter().map(AppliedThreshold::from).collect(),
        };
        let calculation =
            price_checked(daily_price.price_per_unit, reception.payable_weight())?
                .with_metadata(metadata);

        let metadata_json = serde_json::to_value(&calculation.metadata)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO pricing_calculations
                (reception_id, base_price_per_unit, weight_used, gross_value,
                 total_discount_amount, final_total, metadata, calculated_by, calculated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (reception_id) DO UPDATE
            SET base_price_per_unit = EXCLUDED.base_price_per_unit,
                weight_used = EXCLUDED.weight_used,
                gross_value = EXCLUDED.gross_value,
                total_discount_amount = EXCLUDED.total_discount_amount,
                final_total = EXCLUDED.final_total,
                metadata = EXCLUDED.metadata,
                calculated_by = EXCLUDED.calculated_by,
                calculated_at = EXCLUDED.calculated_at
            "#,
        )
        .bind(reception_id)
        .bind(calculation.base_price_per_unit)
        .bind(calculation.weight_used)
        .bind(calculation.gross_value)
        .bind(calculation.total_discount_amount)
        .bind(calculation.final_total)
        .bind(&metadata_json)
        .bind(actor_id)
        .bind(at)
        .execute(&mut *tx)
        .await?;

        let record: PricingRecord = sqlx::query_as::<_, PricingRow>(PRICING_SELECT)
            .bind(reception_id)
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

        tx.commit().await?;

        tracing::info!(
            reception_id = %reception_id,
            final_total = %record.calculation.final_total,
            "Reception priced"
        );

        self.audit
            .record_best_effort(AuditEntry::for_reception(
                reception_id,
                CalculationAction::PricingCalculated,
                serde_json::to_value(&record.calculation).unwrap_or_default(),
                actor_id,
                at,
            ))
            .await;

        Ok(record)
    }

    /// Get the stored pricing of a reception
    pub async fn get_pricing(&self, reception_id: Uuid) -> AppResult<PricingRecord> {
        let row = sqlx::query_as::<_, PricingRow>(PRICING_SELECT)
            .bind(reception_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Pricing calculation".to_string()))?;

        row.try_into()
    }
}

/// Latest active price effective on or before `on`
async fn active_price(
    conn: &mut PgConnection,
    fruit_type_id: Uuid,
    on: NaiveDate,
) -> AppResult<Option<DailyPrice>> {
    let price = sqlx::query_as::<_, DailyPriceRow>(
        r#"
        SELECT id, fruit_type_id, price_date, price_per_unit, active
        FROM daily_prices
        WHERE fruit_type_id = $1 AND active AND price_date <= $2
        ORDER BY price_date DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(fruit_type_id)
    .bind(on)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(price.map(DailyPrice::from))
}

async fn stored_breakdown(
    conn: &mut PgConnection,
    reception_id: Uuid,
) -> AppResult<Vec<DiscountBreakdownEntry>> {
    let breakdown = sqlx::query_scalar::<_, serde_json::Value>(
        "SELECT breakdown FROM weight_discount_results WHERE reception_id = $1",
    )
    .bind(reception_id)
    .fetch_optional(&mut *conn)
    .await?;

    breakdown
        .map(|value| {
            serde_json::from_value(value)
                .map_err(|e| AppError::Internal(format!("Corrupt discount breakdown: {}", e)))
        })
        .transpose()
        .map(Option::unwrap_or_default)
}
