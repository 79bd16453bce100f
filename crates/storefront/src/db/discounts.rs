//! Discount repository.
//!
//! Manual discounts keep their product links in `shop.discount_product`;
//! category discounts carry their category ids inline.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::catalog::Product;
use stride_core::pricing::{Discount, DiscountKind, DiscountScope};
use stride_core::{CategoryId, DiscountId, ProductId};

use crate::store::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct DiscountRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    discount_type: String,
    discount_value: Decimal,
    application_type: String,
    category_ids: Vec<Uuid>,
    product_ids: Vec<Uuid>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    priority: i32,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<DiscountRow> for Discount {
    type Error = StoreError;

    fn try_from(row: DiscountRow) -> Result<Self, Self::Error> {
        let kind: DiscountKind = row
            .discount_type
            .parse()
            .map_err(|e| StoreError::DataCorruption(format!("discount {}: {e}", row.id)))?;
        let scope = match row.application_type.as_str() {
            "manual" => DiscountScope::Manual(row.product_ids.into_iter().map(ProductId::new).collect()),
            "category" => {
                DiscountScope::Category(row.category_ids.into_iter().map(CategoryId::new).collect())
            }
            other => {
                return Err(StoreError::DataCorruption(format!(
                    "discount {}: unknown application type '{other}'",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: DiscountId::new(row.id),
            name: row.name,
            description: row.description,
            kind,
            value: row.discount_value,
            scope,
            start_date: row.start_date,
            end_date: row.end_date,
            priority: row.priority,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

/// Repository for discount records.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Enabled discounts linked to the product or to one of its categories.
    ///
    /// Time windows are not filtered here; the resolver checks them against
    /// the request clock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    /// Returns `StoreError::DataCorruption` if a stored row is invalid.
    pub async fn for_product(&self, product: &Product) -> Result<Vec<Discount>, StoreError> {
        let categories: Vec<Uuid> = product.category_ids.iter().map(CategoryId::as_uuid).collect();

        let rows = sqlx::query_as::<_, DiscountRow>(
            r"
            SELECT d.id, d.name, d.description, d.discount_type, d.discount_value,
                   d.application_type, d.category_ids,
                   COALESCE(
                       (SELECT array_agg(dp.product_id)
                        FROM shop.discount_product dp
                        WHERE dp.discount_id = d.id),
                       '{}'
                   ) AS product_ids,
                   d.start_date, d.end_date, d.priority, d.is_active, d.created_at
            FROM shop.discount d
            WHERE d.is_active
              AND (
                  (d.application_type = 'manual' AND EXISTS (
                      SELECT 1 FROM shop.discount_product dp
                      WHERE dp.discount_id = d.id AND dp.product_id = $1))
                  OR (d.application_type = 'category' AND d.category_ids && $2)
              )
            ",
        )
        .bind(product.id.as_uuid())
        .bind(&categories)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Discount::try_from).collect()
    }

    /// Insert a discount together with its manual product links.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if either insert fails.
    pub async fn insert(&self, discount: &Discount) -> Result<(), StoreError> {
        let (application_type, category_ids, product_ids): (&str, Vec<Uuid>, Vec<Uuid>) =
            match &discount.scope {
                DiscountScope::Manual(ids) => {
                    ("manual", Vec::new(), ids.iter().map(ProductId::as_uuid).collect())
                }
                DiscountScope::Category(ids) => {
                    ("category", ids.iter().map(CategoryId::as_uuid).collect(), Vec::new())
                }
            };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO shop.discount
                (id, name, description, discount_type, discount_value, application_type,
                 category_ids, start_date, end_date, priority, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(discount.id.as_uuid())
        .bind(&discount.name)
        .bind(&discount.description)
        .bind(discount.kind.as_str())
        .bind(discount.value)
        .bind(application_type)
        .bind(&category_ids)
        .bind(discount.start_date)
        .bind(discount.end_date)
        .bind(discount.priority)
        .bind(discount.is_active)
        .bind(discount.created_at)
        .execute(&mut *tx)
        .await?;

        if !product_ids.is_empty() {
            sqlx::query(
                r"
                INSERT INTO shop.discount_product (discount_id, product_id)
                SELECT $1, UNNEST($2::uuid[])
                ",
            )
            .bind(discount.id.as_uuid())
            .bind(&product_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
