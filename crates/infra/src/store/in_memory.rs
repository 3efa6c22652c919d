//! In-memory store backend.
//!
//! Intended for tests/dev. Not optimized for performance. A single `RwLock`
//! over the whole state stands in for the database transaction: placement
//! validates everything first, then applies all of its writes under one
//! write guard, so readers observe either the committed order or nothing.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use orderdesk_catalog::Product;
use orderdesk_core::{
    CustomerId, DomainError, OrderId, OrderItemId, PaymentId, ProductId, RetailerId,
};
use orderdesk_orders::{
    Order, OrderItem, OrderStatus, PaymentStatus, PlaceOrder, PlacementReceipt,
};

use super::r#trait::{
    CatalogStore, Customer, OrderStats, OrderStatusCounts, OrderStore, ScopedOrder,
    ScopedOrderItem,
};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    customers: HashMap<CustomerId, Customer>,
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderId, Vec<OrderItem>>,
}

impl State {
    /// The scoping predicate: an order is visible to a retailer iff at least
    /// one of its items references a product the retailer owns. Every
    /// order-touching operation below goes through this one function.
    fn visible_to(&self, order_id: OrderId, retailer_id: RetailerId) -> bool {
        self.items
            .get(&order_id)
            .map(|items| {
                items.iter().any(|item| {
                    self.products
                        .get(&item.product_id)
                        .is_some_and(|p| p.retailer_id == Some(retailer_id))
                })
            })
            .unwrap_or(false)
    }

    /// Project an order down to the retailer's own items.
    fn scoped(&self, order: &Order, retailer_id: RetailerId) -> ScopedOrder {
        let items = self
            .items
            .get(&order.id)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        let product = self.products.get(&item.product_id)?;
                        if product.retailer_id != Some(retailer_id) {
                            return None;
                        }
                        Some(ScopedOrderItem {
                            item: item.clone(),
                            product_name: product.name.clone(),
                            product_image: product.image_url.clone(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        ScopedOrder {
            order: order.clone(),
            items,
        }
    }

    fn scoped_order(
        &self,
        order_id: OrderId,
        retailer_id: RetailerId,
    ) -> Result<ScopedOrder, DomainError> {
        let order = self
            .orders
            .get(&order_id)
            .filter(|_| self.visible_to(order_id, retailer_id))
            .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))?;
        Ok(self.scoped(order, retailer_id))
    }
}

/// In-memory twin of [`super::PostgresStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned() -> DomainError {
    DomainError::internal("store lock poisoned")
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, DomainError> {
        let state = self.state.read().map_err(|_| lock_poisoned())?;
        Ok(state.products.get(&id).cloned())
    }

    async fn decrement_quantity(&self, id: ProductId, amount: i64) -> Result<(), DomainError> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        let product = state
            .products
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("product {id} not found")))?;
        // Guarded decrement: check and write under the same lock, mirroring
        // the conditional UPDATE in the Postgres backend.
        if product.quantity < amount {
            return Err(DomainError::insufficient_stock(id, product.quantity));
        }
        product.quantity -= amount;
        product.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_product(&self, product: Product) -> Result<(), DomainError> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        if state.products.contains_key(&product.id) {
            return Err(DomainError::conflict(format!(
                "product {} already exists",
                product.id
            )));
        }
        state.products.insert(product.id, product);
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderStore for InMemoryStore {
    async fn place_order(&self, cmd: &PlaceOrder) -> Result<PlacementReceipt, DomainError> {
        cmd.validate()?;

        let mut state = self.state.write().map_err(|_| lock_poisoned())?;

        // Resolve and check every line before mutating anything; holding the
        // write guard for the whole block makes the commit all-or-nothing.
        let mut retailer_ids: Vec<RetailerId> = Vec::new();
        for item in &cmd.items {
            let product = state.products.get(&item.product_id).ok_or_else(|| {
                DomainError::not_found(format!("product {} not found", item.product_id))
            })?;
            let owner = product.owner()?;
            product.check_fulfillable(item.quantity)?;
            if !retailer_ids.contains(&owner) {
                retailer_ids.push(owner);
            }
        }

        let order_id = OrderId::new();
        let now = Utc::now();
        let order = Order {
            id: order_id,
            customer_id: cmd.customer_id,
            address_id: cmd.address_id,
            payment_id: cmd.payment_id,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: cmd.payment_method.clone(),
            total_amount: cmd.total_amount,
            delivery_charge: cmd.delivery_charge,
            discount: cmd.discount,
            placed_at: now,
            updated_at: now,
        };

        let items: Vec<OrderItem> = cmd
            .items
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::new(),
                order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
            })
            .collect();

        for item in &cmd.items {
            let product = state
                .products
                .get_mut(&item.product_id)
                .expect("product resolved above");
            product.quantity -= item.quantity;
            product.updated_at = now;
        }
        state.orders.insert(order_id, order);
        state.items.insert(order_id, items);

        retailer_ids.sort();
        Ok(PlacementReceipt {
            order_id,
            retailer_ids,
        })
    }

    async fn list_orders(
        &self,
        retailer_id: RetailerId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<ScopedOrder>, DomainError> {
        let state = self.state.read().map_err(|_| lock_poisoned())?;
        let mut orders: Vec<ScopedOrder> = state
            .orders
            .values()
            .filter(|o| status.is_none_or(|s| o.order_status == s))
            .filter(|o| state.visible_to(o.id, retailer_id))
            .map(|o| state.scoped(o, retailer_id))
            .collect();
        orders.sort_by(|a, b| b.order.placed_at.cmp(&a.order.placed_at));
        Ok(orders)
    }

    async fn get_order(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
    ) -> Result<ScopedOrder, DomainError> {
        let state = self.state.read().map_err(|_| lock_poisoned())?;
        state.scoped_order(order_id, retailer_id)
    }

    async fn update_order_status(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        if !state.visible_to(order_id, retailer_id) {
            return Err(DomainError::not_found(format!("order {order_id} not found")));
        }
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))?;
        order.order_status = order.order_status.transition(next)?;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn update_payment_status(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
        next: PaymentStatus,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        if !state.visible_to(order_id, retailer_id) {
            return Err(DomainError::not_found(format!("order {order_id} not found")));
        }
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))?;
        order.payment_status = order.payment_status.transition(next)?;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn record_payment(
        &self,
        order_id: OrderId,
        payment_id: PaymentId,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))?;
        order.payment_status = order.payment_status.transition(PaymentStatus::Paid)?;
        order.payment_id = Some(payment_id);
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_order(
        &self,
        retailer_id: RetailerId,
        order_id: OrderId,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        if !state.visible_to(order_id, retailer_id) {
            return Err(DomainError::not_found(format!("order {order_id} not found")));
        }
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| DomainError::not_found(format!("order {order_id} not found")))?;
        if !order.is_deletable() {
            return Err(DomainError::validation(format!(
                "only pending orders can be deleted (current status: {})",
                order.order_status.as_str()
            )));
        }
        // Header and items go together; never one without the other.
        state.orders.remove(&order_id);
        state.items.remove(&order_id);
        Ok(())
    }

    async fn search_orders(
        &self,
        retailer_id: RetailerId,
        term: &str,
    ) -> Result<Vec<ScopedOrder>, DomainError> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Err(DomainError::validation("search term must not be empty"));
        }

        let state = self.state.read().map_err(|_| lock_poisoned())?;
        let mut orders: Vec<ScopedOrder> = state
            .orders
            .values()
            .filter(|o| state.visible_to(o.id, retailer_id))
            .filter(|o| {
                state.customers.get(&o.customer_id).is_some_and(|c| {
                    c.name.to_lowercase().contains(&needle)
                        || c.email.to_lowercase().contains(&needle)
                        || c.phone.contains(&needle)
                })
            })
            .map(|o| state.scoped(o, retailer_id))
            .collect();
        orders.sort_by(|a, b| b.order.placed_at.cmp(&a.order.placed_at));
        Ok(orders)
    }

    async fn order_statistics(&self, retailer_id: RetailerId) -> Result<OrderStats, DomainError> {
        let state = self.state.read().map_err(|_| lock_poisoned())?;

        let mut counts = OrderStatusCounts::default();
        let mut total_revenue: u64 = 0;
        let mut order_count: u64 = 0;

        for order in state.orders.values() {
            if !state.visible_to(order.id, retailer_id) {
                continue;
            }
            counts.bump(order.order_status);
            if order.order_status == OrderStatus::Cancelled {
                continue;
            }
            order_count += 1;
            if let Some(items) = state.items.get(&order.id) {
                for item in items {
                    let owned = state
                        .products
                        .get(&item.product_id)
                        .is_some_and(|p| p.retailer_id == Some(retailer_id));
                    if owned {
                        total_revenue += item.total_price;
                    }
                }
            }
        }

        Ok(OrderStats::from_parts(counts, total_revenue, order_count))
    }

    async fn insert_customer(&self, customer: Customer) -> Result<(), DomainError> {
        let mut state = self.state.write().map_err(|_| lock_poisoned())?;
        if state.customers.contains_key(&customer.id) {
            return Err(DomainError::conflict(format!(
                "customer {} already exists",
                customer.id
            )));
        }
        state.customers.insert(customer.id, customer);
        Ok(())
    }
}
