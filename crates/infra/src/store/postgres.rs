//! Postgres-backed store implementation.
//!
//! Placement is the one multi-write path: header insert, item inserts, and
//! stock decrements all execute inside a single transaction, so callers
//! observe either the fully-committed order or nothing at all. Product rows
//! are locked (`FOR UPDATE`, in id order) and every decrement is still a
//! guarded conditional write whose affected-row count is checked.
//!
//! ## Schema
//!
//! | Table | Columns |
//! |-------|---------|
//! | `products` | `id uuid PK`, `retailer_id uuid NULL`, `name text`, `image_url text NULL`, `price bigint`, `quantity bigint CHECK (quantity >= 0)`, `status text`, `subcategory_id uuid NULL`, `updated_at timestamptz` |
//! | `customers` | `id uuid PK`, `name text`, `email text`, `phone text` |
//! | `orders` | `id uuid PK`, `customer_id uuid`, `address_id uuid NULL`, `payment_id uuid NULL`, `order_status text`, `payment_status text`, `payment_method text`, `total_amount bigint`, `delivery_charge bigint`, `discount bigint`, `placed_at timestamptz`, `updated_at timestamptz` |
//! | `order_items` | `id uuid PK`, `order_id uuid REFERENCES orders`, `product_id uuid REFERENCES products`, `quantity bigint`, `unit_price bigint`, `total_price bigint` |
//!
//! ## Error mapping
//!
//! | SQLx error | PostgreSQL code | DomainError | Scenario |
//! |------------|-----------------|-------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate key |
//! | Database (foreign key violation) | `23503` | `InvalidState` | Dangling reference |
//! | Database (check constraint) | `23514` | `Validation` | e.g. negative quantity write |
//! | Database (other) | any other | `Internal` | Other database errors |
//! | PoolClosed / RowNotFound / other | n/a | `Internal` | Pool/network failures |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use orderdesk_catalog::{Product, ProductStatus};
use orderdesk_core::{
    AddressId, CustomerId, DomainError, OrderId, OrderItemId, PaymentId, ProductId, RetailerId,
    SubcategoryId,
};
use orderdesk_orders::{
    Order, OrderItem, OrderStatus, PaymentStatus, PlaceOrder, PlacementReceipt,
};

use super::r#trait::{
    CatalogStore, Customer, OrderStats, OrderStatusCounts, OrderStore, ScopedOrder,
    ScopedOrderItem,
};

/// The retailer-scoping predicate, shared by every order-touching query.
/// `$1` is always the retailer id; `o` is the `orders` alias.
const VISIBLE_TO_RETAILER: &str = "EXISTS (
    SELECT 1 FROM order_items oi
    JOIN products p ON p.id = oi.product_id
    WHERE oi.order_id = o.id AND p.retailer_id = $1
)";

const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.address_id, o.payment_id, o.order_status,
    o.payment_status, o.payment_method, o.total_amount, o.delivery_charge, o.discount,
    o.placed_at, o.updated_at";

/// Postgres store.
///
/// Uses the SQLx connection pool, which is thread-safe (`Arc` + `Send` +
/// `Sync`); placement and every status mutation run inside transactions.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Load the scoped item projection for a set of visible orders.
    async fn scoped_items(
        &self,
        retailer_id: RetailerId,
        order_ids: &[Uuid],
    ) -> Result<Vec<ScopedOrderItem>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT
                oi.id,
                oi.order_id,
                oi.product_id,
                oi.quantity,
                oi.unit_price,
                oi.total_price,
                p.name AS product_name,
                p.image_url AS product_image
            FROM order_items oi
            JOIN products p ON p.id = oi.product_id
            WHERE p.retailer_id = $1 AND oi.order_id = ANY($2)
            ORDER BY oi.id ASC
            "#,
        )
        .bind(retailer_id.as_uuid())
        .bind(order_ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("scoped_items", e))?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let item = ScopedItemRow::from_row(&row)
                .map_err(|e| DomainError::internal(format!("bad order_items row: {e}")))?;
            items.push(item.into());
        }
        Ok(items)
    }

    /// Decode header rows (already scope-filtered) and attach each
    /// retailer's item slice.
    async fn scoped_orders(
        &self,
        retailer_id: RetailerId,
        rows: Vec<sqlx::postgres::PgRow>,
    ) -> Result<Vec<ScopedOrder>, DomainError> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let order_row = OrderRow::from_row(&row)
                .map_err(|e| DomainError::internal(format!("bad orders row: {e}")))?;
            orders.push(Order::try_from(order_row)?);
        }

        let ids: Vec<Uuid> = orders.iter().map(|o| *o.id.as_uuid()).collect();
        let mut by_order: std::collections::HashMap<OrderId, Vec<ScopedOrderItem>> =
            std::collections::HashMap::new();
        for item in self.scoped_items(retailer_id, &ids).await? {
            by_order.entry(item.item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                ScopedOrder { order, items }
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl CatalogStore for PostgresStore {
    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, retailer_id, name, image_url, price, quantity, status,
                   subcategory_id, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        match row {
            Some(row) => {
                let product = ProductRow::from_row(&row)
                    .map_err(|e| DomainError::internal(format!("bad products row: {e}")))?;
                Ok(Some(Product::try_from(product)?))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(product_id = %id, amount = amount), err)]
    async fn decrement_quantity(&self, id: ProductId, amount: i64) -> Result<(), DomainError> {
        // Single conditional update; the affected-row check is what makes
        // concurrent decrements safe without reading first.
        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity - $2, updated_at = NOW()
            WHERE id = $1 AND quantity >= $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(amount)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("decrement_quantity", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing was updated: either the row is missing or stock is short.
        let row = sqlx::query("SELECT quantity FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("decrement_quantity", e))?;

        match row {
            Some(row) => {
                let available: i64 = row
                    .try_get("quantity")
                    .map_err(|e| DomainError::internal(format!("bad products row: {e}")))?;
                Err(DomainError::insufficient_stock(id, available))
            }
            None => Err(DomainError::not_found(format!("product {id} not found"))),
        }
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&self, product: Product) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, retailer_id, name, image_url, price, quantity,
                                  status, subcategory_id, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(product.retailer_id.map(|r| *r.as_uuid()))
        .bind(&product.name)
        .bind(&product.image_url)
        .bind(product.price as i64)
        .bind(product.quantity)
        .bind(product.status.as_str())
        .bind(product.subcategory_id.map(|s| *s.as_uuid()))
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderStore for PostgresStore {
    #[instrument(
        skip(self, cmd),
        fields(customer_id = %cmd.customer_id, item_count = cmd.items.len()),
        err
    )]
    async fn place_order(&self, cmd: &PlaceOrder) -> Result<PlacementReceipt, DomainError> {
        // Everything decidable without live data is rejected before the
        // transaction opens.
        cmd.validate()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Lock product rows in id order so concurrent carts over the same
        // products cannot deadlock.
        let mut lock_order: Vec<&orderdesk_orders::NewOrderItem> = cmd.items.iter().collect();
        lock_order.sort_by_key(|item| *item.product_id.as_uuid());

        let mut retailer_ids: Vec<RetailerId> = Vec::new();
        for item in &lock_order {
            let product = lock_product(&mut tx, item.product_id).await?;
            let owner = product.owner()?;
            product.check_fulfillable(item.quantity)?;
            if !retailer_ids.contains(&owner) {
                retailer_ids.push(owner);
            }
        }

        let order_id = OrderId::new();
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, address_id, payment_id, order_status,
                                payment_status, payment_method, total_amount,
                                delivery_charge, discount, placed_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(cmd.customer_id.as_uuid())
        .bind(cmd.address_id.map(|a| *a.as_uuid()))
        .bind(cmd.payment_id.map(|p| *p.as_uuid()))
        .bind(OrderStatus::Pending.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .bind(&cmd.payment_method)
        .bind(cmd.total_amount as i64)
        .bind(cmd.delivery_charge as i64)
        .bind(cmd.discount as i64)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for item in &cmd.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, quantity,
                                         unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(OrderItemId::new().as_uuid())
            .bind(order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(item.unit_price as i64)
            .bind(item.total_price as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }

        for item in &lock_order {
            // The rows are locked above, but the decrement stays guarded:
            // the affected-row check is the contract, not an optimization.
            let result = sqlx::query(
                r#"
                UPDATE products
                SET quantity = quantity - $2, updated_at = NOW()
                WHERE id = $1 AND quantity >= $2
                "#,
            )
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("decrement_stock", e))?;

            if result.rows_affected() != 1 {
                let available = current_quantity(&mut tx, item.product_id).await;
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(DomainError::insufficient_stock(
                    item.product_id,
                    available.unwrap_or(0),
                ));
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        retailer_ids.sort();
        Ok(PlacementReceipt {
            order_id,
            retailer_ids,
        })
    }

    #[instrument(skip(self), fields(retailer_id = %retailer_id), err)]
    async fn list_orders(
        &self,
        retailer_id: RetailerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<ScopedOrder>, DomainError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o
             WHERE {VISIBLE_TO_RETAILER}
               AND ($2::text IS NULL OR o.order_status = $2)
             ORDER BY o.placed_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(retailer_id.as_uuid())
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_orders", e))?;

        self.scoped_orders(retailer_id, rows).await
    }

    #[instrument(skip(self), fields(retailer_id = %retailer_id, order_id = %order_id), err)]
    async fn get_order(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
    ) -> Result<ScopedOrder, DomainError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o
             WHERE o.id = $2 AND {VISIBLE_TO_RETAILER}"
        );
        let rows = sqlx::query(&sql)
            .bind(retailer_id.as_uuid())
            .bind(order_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_order", e))?;

        // A non-owned order answers exactly like a missing one.
        self.scoped_orders(retailer_id, rows)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))
    }

    #[instrument(
        skip(self),
        fields(retailer_id = %retailer_id, order_id = %order_id, next = next.as_str()),
        err
    )]
    async fn update_order_status(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current = lock_scoped_status(&mut tx, retailer_id, order_id, "order_status").await?;
        let current = OrderStatus::parse(&current)
            .ok_or_else(|| DomainError::internal(format!("corrupt order_status: {current}")))?;
        let next = current.transition(next)?;

        sqlx::query("UPDATE orders SET order_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(next.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_order_status", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(
        skip(self),
        fields(retailer_id = %retailer_id, order_id = %order_id, next = next.as_str()),
        err
    )]
    async fn update_payment_status(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
        next: PaymentStatus,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current = lock_scoped_status(&mut tx, retailer_id, order_id, "payment_status").await?;
        let current = PaymentStatus::parse(&current)
            .ok_or_else(|| DomainError::internal(format!("corrupt payment_status: {current}")))?;
        let next = current.transition(next)?;

        sqlx::query("UPDATE orders SET payment_status = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id.as_uuid())
            .bind(next.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_payment_status", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(order_id = %order_id, payment_id = %payment_id), err)]
    async fn record_payment(
        &self,
        order_id: OrderId,
        payment_id: PaymentId,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query("SELECT payment_status FROM orders WHERE id = $1 FOR UPDATE")
            .bind(order_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("record_payment", e))?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))?;

        let current: String = row
            .try_get("payment_status")
            .map_err(|e| DomainError::internal(format!("bad orders row: {e}")))?;
        let current = PaymentStatus::parse(&current)
            .ok_or_else(|| DomainError::internal(format!("corrupt payment_status: {current}")))?;
        let next = current.transition(PaymentStatus::Paid)?;

        sqlx::query(
            "UPDATE orders SET payment_status = $2, payment_id = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(order_id.as_uuid())
        .bind(next.as_str())
        .bind(payment_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("record_payment", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self), fields(retailer_id = %retailer_id, order_id = %order_id), err)]
    async fn delete_order(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current = lock_scoped_status(&mut tx, retailer_id, order_id, "order_status").await?;
        let current = OrderStatus::parse(&current)
            .ok_or_else(|| DomainError::internal(format!("corrupt order_status: {current}")))?;
        if current != OrderStatus::Pending {
            return Err(DomainError::validation(format!(
                "only pending orders can be deleted (current status: {})",
                current.as_str()
            )));
        }

        // Items and header leave together inside the same transaction.
        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order_items", e))?;
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_order", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    #[instrument(skip(self, term), fields(retailer_id = %retailer_id), err)]
    async fn search_orders(
        &self,
        retailer_id: RetailerId,
        term: &str,
    ) -> Result<Vec<ScopedOrder>, DomainError> {
        let needle = term.trim();
        if needle.is_empty() {
            return Err(DomainError::validation("search term must not be empty"));
        }
        let pattern = format!("%{needle}%");

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders o
             JOIN customers c ON c.id = o.customer_id
             WHERE {VISIBLE_TO_RETAILER}
               AND (c.name ILIKE $2 OR c.email ILIKE $2 OR c.phone LIKE $2)
             ORDER BY o.placed_at DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(retailer_id.as_uuid())
            .bind(&pattern)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("search_orders", e))?;

        self.scoped_orders(retailer_id, rows).await
    }

    #[instrument(skip(self), fields(retailer_id = %retailer_id), err)]
    async fn order_statistics(&self, retailer_id: RetailerId) -> Result<OrderStats, DomainError> {
        let sql = format!(
            "SELECT o.order_status, COUNT(*) AS n FROM orders o
             WHERE {VISIBLE_TO_RETAILER}
             GROUP BY o.order_status"
        );
        let rows = sqlx::query(&sql)
            .bind(retailer_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("order_statistics", e))?;

        let mut counts = OrderStatusCounts::default();
        for row in rows {
            let status: String = row
                .try_get("order_status")
                .map_err(|e| DomainError::internal(format!("bad orders row: {e}")))?;
            let n: i64 = row
                .try_get("n")
                .map_err(|e| DomainError::internal(format!("bad orders row: {e}")))?;
            let status = OrderStatus::parse(&status)
                .ok_or_else(|| DomainError::internal(format!("corrupt order_status: {status}")))?;
            for _ in 0..n {
                counts.bump(status);
            }
        }

        // Revenue is the retailer's own slice: their item totals over
        // non-cancelled orders.
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(oi.total_price), 0) AS revenue,
                   COUNT(DISTINCT o.id) AS orders
            FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            JOIN products p ON p.id = oi.product_id
            WHERE p.retailer_id = $1 AND o.order_status <> 'cancelled'
            "#,
        )
        .bind(retailer_id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("order_statistics", e))?;

        let revenue: i64 = row
            .try_get("revenue")
            .map_err(|e| DomainError::internal(format!("bad stats row: {e}")))?;
        let order_count: i64 = row
            .try_get("orders")
            .map_err(|e| DomainError::internal(format!("bad stats row: {e}")))?;

        Ok(OrderStats::from_parts(
            counts,
            revenue.max(0) as u64,
            order_count.max(0) as u64,
        ))
    }

    #[instrument(skip(self, customer), fields(customer_id = %customer.id), err)]
    async fn insert_customer(&self, customer: Customer) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO customers (id, name, email, phone) VALUES ($1, $2, $3, $4)",
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_customer", e))?;
        Ok(())
    }
}

/// Lock a product row for the duration of the placement transaction.
async fn lock_product(
    tx: &mut Transaction<'_, Postgres>,
    id: ProductId,
) -> Result<Product, DomainError> {
    let row = sqlx::query(
        r#"
        SELECT id, retailer_id, name, image_url, price, quantity, status,
               subcategory_id, updated_at
        FROM products
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_product", e))?
    .ok_or_else(|| DomainError::not_found(format!("product {id} not found")))?;

    let product = ProductRow::from_row(&row)
        .map_err(|e| DomainError::internal(format!("bad products row: {e}")))?;
    Product::try_from(product)
}

async fn current_quantity(tx: &mut Transaction<'_, Postgres>, id: ProductId) -> Option<i64> {
    sqlx::query("SELECT quantity FROM products WHERE id = $1")
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .ok()
        .flatten()
        .and_then(|row| row.try_get("quantity").ok())
}

/// Select one status column of a visible order, row-locked. A non-owned
/// order is indistinguishable from a missing one.
async fn lock_scoped_status(
    tx: &mut Transaction<'_, Postgres>,
    retailer_id: RetailerId,
    order_id: OrderId,
    column: &str,
) -> Result<String, DomainError> {
    let sql = format!(
        "SELECT o.{column} FROM orders o
         WHERE o.id = $2 AND {VISIBLE_TO_RETAILER}
         FOR UPDATE OF o"
    );
    let row = sqlx::query(&sql)
        .bind(retailer_id.as_uuid())
        .bind(order_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_scoped_status", e))?
        .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))?;

    row.try_get(column)
        .map_err(|e| DomainError::internal(format!("bad orders row: {e}")))
}

/// Map SQLx errors to the domain taxonomy (see module docs).
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => DomainError::conflict(msg),
                Some("23503") => DomainError::invalid_state(msg),
                Some("23514") => DomainError::validation(msg),
                _ => DomainError::internal(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            DomainError::internal(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => {
            DomainError::internal(format!("unexpected row not found in {operation}"))
        }
        _ => DomainError::internal(format!("sqlx error in {operation}: {err}")),
    }
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    retailer_id: Option<Uuid>,
    name: String,
    image_url: Option<String>,
    price: i64,
    quantity: i64,
    status: String,
    subcategory_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for ProductRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            retailer_id: row.try_get("retailer_id")?,
            name: row.try_get("name")?,
            image_url: row.try_get("image_url")?,
            price: row.try_get("price")?,
            quantity: row.try_get("quantity")?,
            status: row.try_get("status")?,
            subcategory_id: row.try_get("subcategory_id")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<ProductRow> for Product {
    type Error = DomainError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let status = ProductStatus::parse(&row.status)
            .ok_or_else(|| DomainError::internal(format!("corrupt product status: {}", row.status)))?;
        Ok(Product {
            id: ProductId::from_uuid(row.id),
            retailer_id: row.retailer_id.map(RetailerId::from_uuid),
            name: row.name,
            image_url: row.image_url,
            price: row.price.max(0) as u64,
            quantity: row.quantity,
            status,
            subcategory_id: row.subcategory_id.map(SubcategoryId::from_uuid),
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug)]
struct OrderRow {
    id: Uuid,
    customer_id: Uuid,
    address_id: Option<Uuid>,
    payment_id: Option<Uuid>,
    order_status: String,
    payment_status: String,
    payment_method: String,
    total_amount: i64,
    delivery_charge: i64,
    discount: i64,
    placed_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for OrderRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            address_id: row.try_get("address_id")?,
            payment_id: row.try_get("payment_id")?,
            order_status: row.try_get("order_status")?,
            payment_status: row.try_get("payment_status")?,
            payment_method: row.try_get("payment_method")?,
            total_amount: row.try_get("total_amount")?,
            delivery_charge: row.try_get("delivery_charge")?,
            discount: row.try_get("discount")?,
            placed_at: row.try_get("placed_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let order_status = OrderStatus::parse(&row.order_status).ok_or_else(|| {
            DomainError::internal(format!("corrupt order_status: {}", row.order_status))
        })?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
            DomainError::internal(format!("corrupt payment_status: {}", row.payment_status))
        })?;
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            customer_id: CustomerId::from_uuid(row.customer_id),
            address_id: row.address_id.map(AddressId::from_uuid),
            payment_id: row.payment_id.map(PaymentId::from_uuid),
            order_status,
            payment_status,
            payment_method: row.payment_method,
            total_amount: row.total_amount.max(0) as u64,
            delivery_charge: row.delivery_charge.max(0) as u64,
            discount: row.discount.max(0) as u64,
            placed_at: row.placed_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug)]
struct ScopedItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    quantity: i64,
    unit_price: i64,
    total_price: i64,
    product_name: String,
    product_image: Option<String>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for ScopedItemRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(ScopedItemRow {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
            total_price: row.try_get("total_price")?,
            product_name: row.try_get("product_name")?,
            product_image: row.try_get("product_image")?,
        })
    }
}

impl From<ScopedItemRow> for ScopedOrderItem {
    fn from(row: ScopedItemRow) -> Self {
        ScopedOrderItem {
            item: OrderItem {
                id: OrderItemId::from_uuid(row.id),
                order_id: OrderId::from_uuid(row.order_id),
                product_id: ProductId::from_uuid(row.product_id),
                quantity: row.quantity,
                unit_price: row.unit_price.max(0) as u64,
                total_price: row.total_price.max(0) as u64,
            },
            product_name: row.product_name,
            product_image: row.product_image,
        }
    }
}
