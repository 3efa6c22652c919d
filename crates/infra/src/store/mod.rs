//! Store boundary for the order engine.
//!
//! Two interchangeable backends implement the same traits: a Postgres store
//! (production) and an in-memory store (dev/tests). Both funnel every
//! order-touching read and write through the same retailer-scoping predicate
//! so no code path can forget the filter.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{
    CatalogStore, Customer, OrderStats, OrderStatusCounts, OrderStore, ScopedOrder,
    ScopedOrderItem,
};
