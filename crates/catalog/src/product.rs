use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderdesk_core::{DomainError, ProductId, RetailerId, SubcategoryId};

/// Product availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Available,
    Unavailable,
}

impl ProductStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(Self::Available),
            "unavailable" => Some(Self::Unavailable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Catalog product record.
///
/// `quantity` is the live stock counter. It is mutated in exactly two places:
/// retailer CRUD (outside this engine) and the placement decrement. The
/// decrement itself is a guarded conditional write in the store; this type
/// only expresses the rule being guarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Owning retailer. A product without an owner is unsellable; placement
    /// treats it as an invalid state rather than silently skipping it.
    pub retailer_id: Option<RetailerId>,
    pub name: String,
    pub image_url: Option<String>,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
    pub quantity: i64,
    pub status: ProductStatus,
    pub subcategory_id: Option<SubcategoryId>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_available(&self) -> bool {
        matches!(self.status, ProductStatus::Available)
    }

    /// Owning retailer, or `InvalidState` if the listing is orphaned.
    pub fn owner(&self) -> Result<RetailerId, DomainError> {
        self.retailer_id.ok_or_else(|| {
            DomainError::invalid_state(format!("product {} has no owning retailer", self.id))
        })
    }

    /// Check that `requested` units can be taken from current stock.
    ///
    /// This is the pre-decrement read-side check; the store re-checks the
    /// same condition inside the conditional update, which is what actually
    /// prevents oversell under concurrency.
    pub fn check_fulfillable(&self, requested: i64) -> Result<(), DomainError> {
        if !self.is_available() {
            return Err(DomainError::invalid_state(format!(
                "product {} is not available for purchase",
                self.id
            )));
        }
        if requested > self.quantity {
            return Err(DomainError::insufficient_stock(self.id, self.quantity));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_product(quantity: i64, status: ProductStatus) -> Product {
        Product {
            id: ProductId::new(),
            retailer_id: Some(RetailerId::new()),
            name: "widget".to_string(),
            image_url: None,
            price: 100,
            quantity,
            status,
            subcategory_id: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn fulfillable_within_stock() {
        let p = test_product(5, ProductStatus::Available);
        assert!(p.check_fulfillable(5).is_ok());
        assert!(p.check_fulfillable(1).is_ok());
    }

    #[test]
    fn oversell_is_rejected_with_available_count() {
        let p = test_product(2, ProductStatus::Available);
        match p.check_fulfillable(3) {
            Err(DomainError::InsufficientStock {
                product_id,
                available,
            }) => {
                assert_eq!(product_id, p.id);
                assert_eq!(available, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn unavailable_product_is_not_fulfillable() {
        let p = test_product(10, ProductStatus::Unavailable);
        match p.check_fulfillable(1) {
            Err(DomainError::InvalidState(_)) => {}
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn orphaned_product_has_no_owner() {
        let mut p = test_product(1, ProductStatus::Available);
        p.retailer_id = None;
        match p.owner() {
            Err(DomainError::InvalidState(_)) => {}
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(
            ProductStatus::parse("available"),
            Some(ProductStatus::Available)
        );
        assert_eq!(
            ProductStatus::parse("unavailable"),
            Some(ProductStatus::Unavailable)
        );
        assert_eq!(ProductStatus::parse("archived"), None);
        assert_eq!(ProductStatus::Available.as_str(), "available");
    }

    proptest! {
        /// Fulfillability is exactly the stock comparison; the error always
        /// reports the true available count.
        #[test]
        fn fulfillability_matches_stock(stock in 0i64..1_000, requested in 1i64..1_000) {
            let p = test_product(stock, ProductStatus::Available);
            match p.check_fulfillable(requested) {
                Ok(()) => prop_assert!(requested <= stock),
                Err(DomainError::InsufficientStock { available, .. }) => {
                    prop_assert!(requested > stock);
                    prop_assert_eq!(available, stock);
                }
                Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
            }
        }
    }
}
