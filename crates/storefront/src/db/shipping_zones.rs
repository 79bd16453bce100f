//! Shipping zone repository.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::ShippingZoneId;
use stride_core::pricing::ShippingZone;

use crate::store::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct ShippingZoneRow {
    id: Uuid,
    name: String,
    cities: Vec<String>,
    shipping_fee: Decimal,
    display_order: i32,
    is_active: bool,
    is_default: bool,
}

impl From<ShippingZoneRow> for ShippingZone {
    fn from(row: ShippingZoneRow) -> Self {
        Self {
            id: ShippingZoneId::new(row.id),
            name: row.name,
            cities: row.cities,
            shipping_fee: row.shipping_fee,
            display_order: row.display_order,
            is_active: row.is_active,
            is_default: row.is_default,
        }
    }
}

/// Repository for shipping zones.
pub struct ShippingZoneRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShippingZoneRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All zones in display order, inactive ones included.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ShippingZone>, StoreError> {
        let rows = sqlx::query_as::<_, ShippingZoneRow>(
            r"
            SELECT id, name, cities, shipping_fee, display_order, is_active, is_default
            FROM shop.shipping_zone
            ORDER BY display_order, created_at
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(ShippingZone::from).collect())
    }

    /// # Errors
    ///
    /// Returns `StoreError::Database` if the insert fails.
    pub async fn insert(&self, zone: &ShippingZone) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO shop.shipping_zone
                (id, name, cities, shipping_fee, display_order, is_active, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(zone.id.as_uuid())
        .bind(&zone.name)
        .bind(&zone.cities)
        .bind(zone.shipping_fee)
        .bind(zone.display_order)
        .bind(zone.is_active)
        .bind(zone.is_default)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
