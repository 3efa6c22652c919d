//! Store traits consumed by the HTTP layer and the placement orchestration.

use serde::{Deserialize, Serialize};

use orderdesk_catalog::Product;
use orderdesk_core::{CustomerId, DomainError, OrderId, PaymentId, ProductId, RetailerId};
use orderdesk_orders::{Order, OrderItem, OrderStatus, PaymentStatus, PlaceOrder, PlacementReceipt};

/// Customer directory record (consumed interface; CRUD lives elsewhere).
///
/// Orders reference customers by id; the search path matches on these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// A line item projected into one retailer's view, with the product fields
/// dashboards embed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopedOrderItem {
    pub item: OrderItem,
    pub product_name: String,
    pub product_image: Option<String>,
}

/// An order as one retailer sees it: the shared header plus only that
/// retailer's line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopedOrder {
    pub order: Order,
    pub items: Vec<ScopedOrderItem>,
}

/// Per-status order counts for a retailer's dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderStatusCounts {
    pub pending: u64,
    pub confirmed: u64,
    pub shipped: u64,
    pub delivered: u64,
    pub cancelled: u64,
}

impl OrderStatusCounts {
    pub fn bump(&mut self, status: OrderStatus) {
        match status {
            OrderStatus::Pending => self.pending += 1,
            OrderStatus::Confirmed => self.confirmed += 1,
            OrderStatus::Shipped => self.shipped += 1,
            OrderStatus::Delivered => self.delivered += 1,
            OrderStatus::Cancelled => self.cancelled += 1,
        }
    }
}

/// Retailer-scoped order statistics.
///
/// Revenue sums the retailer's own item totals over non-cancelled visible
/// orders; whole-order totals would leak other sellers' amounts through
/// shared orders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderStats {
    pub counts: OrderStatusCounts,
    pub total_revenue: u64,
    pub order_count: u64,
    pub average_order_value: f64,
}

impl OrderStats {
    pub fn from_parts(counts: OrderStatusCounts, total_revenue: u64, order_count: u64) -> Self {
        let average_order_value = if order_count == 0 {
            0.0
        } else {
            total_revenue as f64 / order_count as f64
        };
        Self {
            counts,
            total_revenue,
            order_count,
            average_order_value,
        }
    }
}

/// Catalog access consumed by the placement orchestration.
///
/// `decrement_quantity` must be a single guarded conditional write
/// ("decrement iff quantity >= amount") whose affected-row count is checked,
/// so two concurrent decrements against the same row cannot both succeed
/// past the available balance.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, DomainError>;

    async fn decrement_quantity(&self, id: ProductId, amount: i64) -> Result<(), DomainError>;

    /// Seeding surface for tests/dev and the out-of-scope CRUD collaborator.
    async fn insert_product(&self, product: Product) -> Result<(), DomainError>;
}

/// Order ledger access. Every read and write is retailer-scoped except
/// placement (customer-initiated) and the gateway payment callback.
#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    /// Validate a cart and commit it as one atomic unit: order header, all
    /// line items, and a guarded stock decrement per item. Callers observe
    /// either the fully-committed order or nothing at all.
    async fn place_order(&self, cmd: &PlaceOrder) -> Result<PlacementReceipt, DomainError>;

    /// Headers visible to the retailer (>= 1 owned item), newest first,
    /// each projected down to the retailer's own items.
    async fn list_orders(
        &self,
        retailer_id: RetailerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<ScopedOrder>, DomainError>;

    /// Scoped lookup. An order with no items owned by the caller is reported
    /// as `NotFound`, never as a permission error, so ids cannot be probed.
    async fn get_order(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
    ) -> Result<ScopedOrder, DomainError>;

    /// Advance the order status through the allowed-transitions table.
    async fn update_order_status(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<(), DomainError>;

    /// Advance the payment status through the allowed-transitions table.
    async fn update_payment_status(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
        next: PaymentStatus,
    ) -> Result<(), DomainError>;

    /// Record a signature-verified gateway confirmation: attach the payment
    /// reference and mark the order paid. Not retailer-scoped; the verified
    /// signature is the caller's authority.
    async fn record_payment(
        &self,
        order_id: OrderId,
        payment_id: PaymentId,
    ) -> Result<(), DomainError>;

    /// Delete a pending order together with all its items.
    async fn delete_order(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
    ) -> Result<(), DomainError>;

    /// Substring search over customer name/email/phone, scoped like `list`.
    async fn search_orders(
        &self,
        retailer_id: RetailerId,
        term: &str,
    ) -> Result<Vec<ScopedOrder>, DomainError>;

    async fn order_statistics(&self, retailer_id: RetailerId) -> Result<OrderStats, DomainError>;

    /// Seeding surface for tests/dev and the out-of-scope CRUD collaborator.
    async fn insert_customer(&self, customer: Customer) -> Result<(), DomainError>;
}
