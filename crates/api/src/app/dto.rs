use serde::Deserialize;
use serde_json::json;

use orderdesk_core::{DomainError, DomainResult};
use orderdesk_infra::store::{OrderStats, ScopedOrder};
use orderdesk_orders::{NewOrderItem, PlaceOrder};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct PlaceOrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: u64,
    pub total_price: u64,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub customer_id: String,
    pub address_id: Option<String>,
    pub payment_id: Option<String>,
    pub total_amount: u64,
    #[serde(default)]
    pub delivery_charge: u64,
    #[serde(default)]
    pub discount: u64,
    pub payment_method: String,
    pub items: Vec<PlaceOrderItemRequest>,
}

impl PlaceOrderRequest {
    /// Parse ids into the typed placement command. Id parse failures are
    /// validation errors; the command's own checks run in the store.
    pub fn into_command(self) -> DomainResult<PlaceOrder> {
        let items = self
            .items
            .into_iter()
            .map(|item| {
                Ok(NewOrderItem {
                    product_id: item.product_id.parse()?,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                })
            })
            .collect::<Result<Vec<_>, DomainError>>()?;

        Ok(PlaceOrder {
            customer_id: self.customer_id.parse()?,
            address_id: self.address_id.as_deref().map(str::parse).transpose()?,
            payment_id: self.payment_id.as_deref().map(str::parse).transpose()?,
            total_amount: self.total_amount,
            delivery_charge: self.delivery_charge,
            discount: self.discount,
            payment_method: self.payment_method,
            items,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchOrdersQuery {
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct PaymentCallbackRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

// -------------------------
// Response mapping
// -------------------------

pub fn scoped_order_to_json(scoped: ScopedOrder) -> serde_json::Value {
    let items = scoped
        .items
        .into_iter()
        .map(|i| {
            json!({
                "id": i.item.id.to_string(),
                "product_id": i.item.product_id.to_string(),
                "product_name": i.product_name,
                "product_image": i.product_image,
                "quantity": i.item.quantity,
                "unit_price": i.item.unit_price,
                "total_price": i.item.total_price,
            })
        })
        .collect::<Vec<_>>();

    let o = scoped.order;
    json!({
        "id": o.id.to_string(),
        "customer_id": o.customer_id.to_string(),
        "address_id": o.address_id.map(|a| a.to_string()),
        "payment_id": o.payment_id.map(|p| p.to_string()),
        "order_status": o.order_status.as_str(),
        "payment_status": o.payment_status.as_str(),
        "payment_method": o.payment_method,
        "total_amount": o.total_amount,
        "delivery_charge": o.delivery_charge,
        "discount": o.discount,
        "placed_at": o.placed_at.to_rfc3339(),
        "updated_at": o.updated_at.to_rfc3339(),
        "items": items,
    })
}

pub fn order_stats_to_json(stats: OrderStats) -> serde_json::Value {
    json!({
        "counts": {
            "pending": stats.counts.pending,
            "confirmed": stats.counts.confirmed,
            "shipped": stats.counts.shipped,
            "delivered": stats.counts.delivered,
            "cancelled": stats.counts.cancelled,
        },
        "total_revenue": stats.total_revenue,
        "order_count": stats.order_count,
        "average_order_value": stats.average_order_value,
    })
}
