//! Catalog repository: products and categories.

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use stride_core::catalog::{Category, Product};
use stride_core::size::Size;
use stride_core::{CategoryId, ProductId};

use super::{to_i32, to_u32};
use crate::store::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    price: Decimal,
    sale_price: Option<Decimal>,
    stock_quantity: i32,
    sizes: serde_json::Value,
    category_ids: Vec<Uuid>,
    is_active: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            slug: row.slug,
            price: row.price,
            sale_price: row.sale_price,
            stock_quantity: to_u32(row.stock_quantity, "stock_quantity")?,
            sizes: Size::list_from_json(&row.sizes),
            category_ids: row.category_ids.into_iter().map(CategoryId::new).collect(),
            is_active: row.is_active,
        })
    }
}

/// Repository for catalog reads and seeding.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active products with the given ids, in the order requested.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    /// Returns `StoreError::DataCorruption` if a stored row is invalid.
    pub async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();

        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, slug, price, sale_price, stock_quantity, sizes,
                   category_ids, is_active
            FROM shop.product
            WHERE id = ANY($1) AND is_active
            ",
        )
        .bind(&uuids)
        .fetch_all(self.pool)
        .await?;

        let mut products = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        products.sort_by_key(|p| ids.iter().position(|id| *id == p.id));
        Ok(products)
    }

    /// Insert or update a category by slug, returning its id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn upsert_category(&self, category: &Category) -> Result<CategoryId, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            r"
            INSERT INTO shop.category (id, name, slug)
            VALUES ($1, $2, $3)
            ON CONFLICT (slug) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            ",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .fetch_one(self.pool)
        .await?;

        Ok(CategoryId::new(id))
    }

    /// Insert or update a product by slug, returning its id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    /// Returns `StoreError::DataCorruption` if the stock count does not fit the column.
    pub async fn upsert_product(&self, product: &Product) -> Result<ProductId, StoreError> {
        let sizes = serde_json::to_value(&product.sizes)
            .map_err(|e| StoreError::DataCorruption(format!("unserializable sizes: {e}")))?;
        let category_ids: Vec<Uuid> = product.category_ids.iter().map(CategoryId::as_uuid).collect();

        let id: Uuid = sqlx::query_scalar(
            r"
            INSERT INTO shop.product
                (id, name, slug, price, sale_price, stock_quantity, sizes, category_ids, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (slug) DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                sale_price = EXCLUDED.sale_price,
                stock_quantity = EXCLUDED.stock_quantity,
                sizes = EXCLUDED.sizes,
                category_ids = EXCLUDED.category_ids,
                is_active = EXCLUDED.is_active,
                updated_at = now()
            RETURNING id
            ",
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(product.price)
        .bind(product.sale_price)
        .bind(to_i32(product.stock_quantity, "stock_quantity")?)
        .bind(sizes)
        .bind(&category_ids)
        .bind(product.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(ProductId::new(id))
    }
}
