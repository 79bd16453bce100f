//! Promo code repository.
//!
//! Codes are stored uppercase and looked up through the `upper(code)` index,
//! so shoppers can type them in any case.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use stride_core::PromoCodeId;
use stride_core::pricing::{PromoCode, PromoKind, PromoType};

use super::{to_i32, to_u32};
use crate::store::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct PromoCodeRow {
    id: Uuid,
    code: String,
    description: Option<String>,
    discount_type: String,
    discount_value: Option<Decimal>,
    min_order_amount: Decimal,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    usage_limit: Option<i32>,
    times_used: i32,
    is_active: bool,
}

impl TryFrom<PromoCodeRow> for PromoCode {
    type Error = StoreError;

    fn try_from(row: PromoCodeRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| StoreError::DataCorruption(format!("promo code {}: {e}", row.id));
        let promo_type: PromoType = row.discount_type.parse().map_err(corrupt)?;
        let kind = PromoKind::from_parts(promo_type, row.discount_value)
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Self {
            id: PromoCodeId::new(row.id),
            code: row.code,
            description: row.description,
            kind,
            min_order_amount: row.min_order_amount,
            start_date: row.start_date,
            end_date: row.end_date,
            usage_limit: row
                .usage_limit
                .map(|limit| to_u32(limit, "usage_limit"))
                .transpose()?,
            times_used: to_u32(row.times_used, "times_used")?,
            is_active: row.is_active,
        })
    }
}

/// Count one use of `code` if its usage limit allows.
///
/// The limit check and the increment are a single statement, so concurrent
/// checkouts cannot overshoot the limit. Takes a connection so callers can
/// run it inside the order transaction.
///
/// # Errors
///
/// Returns `StoreError::Database` if the update fails.
pub async fn redeem(conn: &mut PgConnection, code: &str) -> Result<bool, StoreError> {
    let result = sqlx::query(
        r"
        UPDATE shop.promo_code
        SET times_used = times_used + 1
        WHERE upper(code) = upper($1)
          AND (usage_limit IS NULL OR times_used < usage_limit)
        ",
    )
    .bind(code.trim())
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Repository for promo codes.
pub struct PromoCodeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PromoCodeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Case-insensitive lookup.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    /// Returns `StoreError::DataCorruption` if the stored row is invalid.
    pub async fn find_by_code(&self, code: &str) -> Result<Option<PromoCode>, StoreError> {
        let row = sqlx::query_as::<_, PromoCodeRow>(
            r"
            SELECT id, code, description, discount_type, discount_value, min_order_amount,
                   start_date, end_date, usage_limit, times_used, is_active
            FROM shop.promo_code
            WHERE upper(code) = upper($1)
            ",
        )
        .bind(code.trim())
        .fetch_optional(self.pool)
        .await?;

        row.map(PromoCode::try_from).transpose()
    }

    /// Insert a code, or update it in place if the code already exists.
    ///
    /// The usage counter of an existing code is kept.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn upsert(&self, promo: &PromoCode) -> Result<(), StoreError> {
        let usage_limit = promo
            .usage_limit
            .map(|limit| to_i32(limit, "usage_limit"))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO shop.promo_code
                (id, code, description, discount_type, discount_value, min_order_amount,
                 start_date, end_date, usage_limit, times_used, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT ((upper(code))) DO UPDATE SET
                description = EXCLUDED.description,
                discount_type = EXCLUDED.discount_type,
                discount_value = EXCLUDED.discount_value,
                min_order_amount = EXCLUDED.min_order_amount,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                usage_limit = EXCLUDED.usage_limit,
                is_active = EXCLUDED.is_active
            ",
        )
        .bind(promo.id.as_uuid())
        .bind(&promo.code)
        .bind(&promo.description)
        .bind(promo.kind.promo_type().as_str())
        .bind(promo.kind.value())
        .bind(promo.min_order_amount)
        .bind(promo.start_date)
        .bind(promo.end_date)
        .bind(usage_limit)
        .bind(to_i32(promo.times_used, "times_used")?)
        .bind(promo.is_active)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
