use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderdesk_core::{
    AddressId, CustomerId, DomainError, OrderId, OrderItemId, PaymentId, ProductId,
};

/// Order lifecycle status.
///
/// The set is closed: free-form values never reach storage, and every
/// change goes through [`OrderStatus::transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "shipped" => Some(Self::Shipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Delivered and cancelled orders accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Allowed-transitions table.
    ///
    /// `pending → confirmed → shipped → delivered`, with cancellation
    /// possible while the order has not yet shipped. Skipping states is not
    /// allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Shipped)
                | (Self::Confirmed, Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }

    /// Validate and perform a transition.
    pub fn transition(&self, next: OrderStatus) -> Result<OrderStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::validation(format!(
                "invalid order status transition: {} -> {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

/// Payment status, tracked independently of the order lifecycle.
///
/// Terminal payment events arrive from the payment gateway via the
/// signature-verified callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Allowed-transitions table: a failed payment may be retried, a paid
    /// one may be refunded, and refunds are final.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid)
                | (Self::Pending, Self::Failed)
                | (Self::Failed, Self::Paid)
                | (Self::Paid, Self::Refunded)
        )
    }

    pub fn transition(&self, next: PaymentStatus) -> Result<PaymentStatus, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::validation(format!(
                "invalid payment status transition: {} -> {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

/// Order header: one committed purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub address_id: Option<AddressId>,
    pub payment_id: Option<PaymentId>,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    /// Amounts in smallest currency unit.
    pub total_amount: u64,
    pub delivery_charge: u64,
    pub discount: u64,
    pub placed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Orders can only be deleted while still pending; deletion removes the
    /// header and all its items together.
    pub fn is_deletable(&self) -> bool {
        matches!(self.order_status, OrderStatus::Pending)
    }
}

/// Line item: product/quantity/price tuple within an order.
///
/// `unit_price` and `total_price` are snapshots taken at purchase time and
/// are never recomputed from the live product price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: u64,
    pub total_price: u64,
}
