//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// missing rows, stock shortfalls, conflicts). Transport mapping lives at the
/// HTTP boundary; `Internal` carries store/transport failures upward without
/// leaking driver types into the domain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, empty cart).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested resource was not found.
    ///
    /// Also used when a row exists but is not owned by the caller, so order
    /// ids cannot be probed across retailers.
    #[error("not found: {0}")]
    NotFound(String),

    /// A row exists but is not in a state that permits the operation
    /// (e.g. a product with no owning retailer, or marked unavailable).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Requested quantity exceeds the available stock for a product.
    #[error("insufficient stock for product {product_id}: {available} available")]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
    },

    /// A conflict occurred (e.g. duplicate unique key).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store or transport failure; the operation may be retried.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn insufficient_stock(product_id: ProductId, available: i64) -> Self {
        Self::InsufficientStock {
            product_id,
            available,
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
