//! `orderdesk-catalog` — product domain model.
//!
//! Products are owned by exactly one retailer (single foreign key; no
//! multi-seller listings). Stock is a plain counter that must never go
//! negative; the guarded decrement lives in the store layer.

pub mod product;

pub use product::{Product, ProductStatus};
