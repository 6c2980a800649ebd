//! Discount threshold catalog loading
//!
//! Thresholds are read fresh for every calculation; nothing is cached.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::{DiscountThreshold, QualityMetric, ThresholdCatalog};

#[derive(Clone)]
pub struct ThresholdService {
    db: PgPool,
}

/// Database row for a discount threshold
#[derive(Debug, sqlx::FromRow)]
struct ThresholdRow {
    fruit_type_id: Uuid,
    metric: String,
    limit_percent: Decimal,
    enabled: bool,
}

impl TryFrom<ThresholdRow> for DiscountThreshold {
    type Error = AppError;

    fn try_from(row: ThresholdRow) -> Result<Self, Self::Error> {
        let metric = QualityMetric::parse(&row.metric)
            .ok_or_else(|| AppError::Internal(format!("Unknown quality metric '{}'", row.metric)))?;

        Ok(DiscountThreshold {
            fruit_type_id: row.fruit_type_id,
            metric,
            limit_percent: row.limit_percent,
            enabled: row.enabled,
        })
    }
}

const SELECT_THRESHOLDS: &str = r#"
    SELECT fruit_type_id, metric, limit_percent, enabled
    FROM discount_thresholds
    WHERE fruit_type_id = $1
"#;

impl ThresholdService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// All thresholds of a fruit type, enabled or not
    pub async fn list_thresholds(&self, fruit_type_id: Uuid) -> AppResult<Vec<DiscountThreshold>> {
        let rows = sqlx::query_as::<_, ThresholdRow>(SELECT_THRESHOLDS)
            .bind(fruit_type_id)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(DiscountThreshold::try_from).collect()
    }
}

/// Load the catalog inside the caller's transaction
pub(crate) async fn load_catalog(
    conn: &mut PgConnection,
    fruit_type_id: Uuid,
) -> AppResult<ThresholdCatalog> {
    let rows = sqlx::query_as::<_, ThresholdRow>(SELECT_THRESHOLDS)
        .bind(fruit_type_id)
        .fetch_all(&mut *conn)
        .await?;

    if rows.is_empty() {
        return Err(AppError::ConfigurationNotFound(format!(
            "discount thresholds for fruit type {}",
            fruit_type_id
        )));
    }

    let thresholds = rows
        .into_iter()
        .map(DiscountThreshold::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ThresholdCatalog::new(fruit_type_id, thresholds))
}
