//! Sale banner repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::SalePromotionId;
use stride_core::pricing::SalePromotion;

use crate::store::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct SalePromotionRow {
    id: Uuid,
    title: String,
    end_date: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<SalePromotionRow> for SalePromotion {
    fn from(row: SalePromotionRow) -> Self {
        Self {
            id: SalePromotionId::new(row.id),
            title: row.title,
            end_date: row.end_date,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

pub struct SalePromotionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SalePromotionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Enabled promotions that have not ended at `now`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn running_at(&self, now: DateTime<Utc>) -> Result<Vec<SalePromotion>, StoreError> {
        let rows = sqlx::query_as::<_, SalePromotionRow>(
            r"
            SELECT id, title, end_date, is_active, created_at
            FROM shop.sale_promotion
            WHERE is_active AND end_date > $1
            ORDER BY end_date
            ",
        )
        .bind(now)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(SalePromotion::from).collect())
    }

    /// # Errors
    ///
    /// Returns `StoreError::Database` if the insert fails.
    pub async fn insert(&self, promotion: &SalePromotion) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO shop.sale_promotion (id, title, end_date, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(promotion.id.as_uuid())
        .bind(&promotion.title)
        .bind(promotion.end_date)
        .bind(promotion.is_active)
        .bind(promotion.created_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
