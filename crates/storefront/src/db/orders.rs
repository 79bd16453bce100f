//! Order repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use stride_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus};

use crate::models::{Customer, NewOrder, Order, OrderItem, PaymentUpdate, ShippingAddress};
use crate::store::StoreError;

const ORDER_COLUMNS: &str = r"
    id, reference, customer_name, customer_email, customer_phone,
    shipping_address, shipping_city, shipping_postal_code, items,
    subtotal, discount_amount, shipping_fee, total, promo_code,
    status, payment_method, payment_status, payment_reference, payment_receipt,
    created_at, updated_at
";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    reference: Uuid,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    shipping_address: String,
    shipping_city: String,
    shipping_postal_code: Option<String>,
    items: Json<Vec<OrderItem>>,
    subtotal: Decimal,
    discount_amount: Decimal,
    shipping_fee: Decimal,
    total: Decimal,
    promo_code: Option<String>,
    status: String,
    payment_method: String,
    payment_status: String,
    payment_reference: Option<String>,
    payment_receipt: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let corrupt = |e: stride_core::StatusParseError| {
            StoreError::DataCorruption(format!("order {}: {e}", row.id))
        };
        let status: OrderStatus = row.status.parse().map_err(corrupt)?;
        let payment_method: PaymentMethod = row.payment_method.parse().map_err(corrupt)?;
        let payment_status: PaymentStatus = row.payment_status.parse().map_err(corrupt)?;

        Ok(Self {
            id: OrderId::new(row.id),
            reference: row.reference,
            customer: Customer {
                name: row.customer_name,
                email: row.customer_email,
                phone: row.customer_phone,
            },
            shipping_address: ShippingAddress {
                address: row.shipping_address,
                city: row.shipping_city,
                postal_code: row.shipping_postal_code,
            },
            items: row.items.0,
            subtotal: row.subtotal,
            discount: row.discount_amount,
            shipping_fee: row.shipping_fee,
            total: row.total,
            promo_code: row.promo_code,
            status,
            payment_method,
            payment_status,
            payment_reference: row.payment_reference,
            payment_receipt: row.payment_receipt,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Look up an order by its idempotency reference.
///
/// # Errors
///
/// Returns `StoreError::Database` if the query fails.
pub async fn find_by_reference(
    conn: &mut PgConnection,
    reference: Uuid,
) -> Result<Option<Order>, StoreError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM shop.\"order\" WHERE reference = $1"
    ))
    .bind(reference)
    .fetch_optional(conn)
    .await?;

    row.map(Order::try_from).transpose()
}

/// Insert a new order with pending statuses.
///
/// # Errors
///
/// Returns `StoreError::Database` if the insert fails, including a unique
/// violation when the reference is already taken.
pub async fn insert(conn: &mut PgConnection, order: NewOrder) -> Result<Order, StoreError> {
    let order = order.into_order(Utc::now());

    sqlx::query(
        r#"
        INSERT INTO shop."order"
            (id, reference, customer_name, customer_email, customer_phone,
             shipping_address, shipping_city, shipping_postal_code, items,
             subtotal, discount_amount, shipping_fee, total, promo_code,
             status, payment_method, payment_status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19)
        "#,
    )
    .bind(order.id.as_uuid())
    .bind(order.reference)
    .bind(&order.customer.name)
    .bind(&order.customer.email)
    .bind(&order.customer.phone)
    .bind(&order.shipping_address.address)
    .bind(&order.shipping_address.city)
    .bind(&order.shipping_address.postal_code)
    .bind(Json(&order.items))
    .bind(order.subtotal)
    .bind(order.discount)
    .bind(order.shipping_fee)
    .bind(order.total)
    .bind(&order.promo_code)
    .bind(order.status.as_str())
    .bind(order.payment_method.as_str())
    .bind(order.payment_status.as_str())
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(conn)
    .await?;

    Ok(order)
}

/// Repository for order reads and payment updates.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    /// Returns `StoreError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.\"order\" WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(self.pool)
        .await?;

        row.map(Order::try_from).transpose()
    }

    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn get_by_reference(&self, reference: Uuid) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        find_by_reference(&mut conn, reference).await
    }

    /// Record a payment outcome. Fields the update leaves empty keep their
    /// stored values. A paid order only accepts another payment; otherwise
    /// it is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the update fails.
    pub async fn update_payment(
        &self,
        id: OrderId,
        update: &PaymentUpdate,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE shop."order" SET
                status = $2,
                payment_status = COALESCE($3, payment_status),
                payment_reference = COALESCE($4, payment_reference),
                payment_receipt = COALESCE($5, payment_receipt),
                updated_at = now()
            WHERE id = $1
              AND (payment_status <> 'paid' OR $3 = 'paid')
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(update.status.as_str())
        .bind(update.payment_status.map(|s| s.as_str()))
        .bind(&update.payment_reference)
        .bind(&update.payment_receipt)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Order::try_from(row).map(Some),
            // Unknown, or paid and left as is
            None => self.get(id).await,
        }
    }
}
