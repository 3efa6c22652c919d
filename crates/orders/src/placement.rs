use serde::{Deserialize, Serialize};

use orderdesk_core::{
    AddressId, CustomerId, DomainError, DomainResult, OrderId, PaymentId, ProductId, RetailerId,
};

/// One requested line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Caller-submitted snapshot prices (smallest currency unit). Validated
    /// against each other and against the header total before any write.
    pub unit_price: u64,
    pub total_price: u64,
}

/// Placement command: everything needed to turn a cart into a committed
/// order.
///
/// [`PlaceOrder::validate`] runs before the store transaction opens; the
/// stock and ownership checks that need live data run inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub customer_id: CustomerId,
    pub address_id: Option<AddressId>,
    pub payment_id: Option<PaymentId>,
    pub total_amount: u64,
    pub delivery_charge: u64,
    pub discount: u64,
    pub payment_method: String,
    pub items: Vec<NewOrderItem>,
}

impl PlaceOrder {
    /// Pure pre-transaction validation.
    ///
    /// Submitted totals are recomputed and enforced server-side rather than
    /// trusted: every line must satisfy `quantity * unit_price ==
    /// total_price`, and the header must satisfy `sum(line totals) +
    /// delivery_charge - discount == total_amount`.
    pub fn validate(&self) -> DomainResult<()> {
        if self.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        if self.payment_method.trim().is_empty() {
            return Err(DomainError::validation("payment_method is required"));
        }

        let mut items_total: u64 = 0;
        for (idx, item) in self.items.iter().enumerate() {
            if item.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "item {idx}: quantity must be positive"
                )));
            }
            if item.unit_price == 0 {
                return Err(DomainError::validation(format!(
                    "item {idx}: unit_price must be positive"
                )));
            }

            let expected = (item.quantity as u64)
                .checked_mul(item.unit_price)
                .ok_or_else(|| {
                    DomainError::validation(format!("item {idx}: line total overflows"))
                })?;
            if expected != item.total_price {
                return Err(DomainError::validation(format!(
                    "item {idx}: total_price {} does not match quantity * unit_price = {}",
                    item.total_price, expected
                )));
            }

            items_total = items_total.checked_add(expected).ok_or_else(|| {
                DomainError::validation("order total overflows".to_string())
            })?;
        }

        let gross = items_total
            .checked_add(self.delivery_charge)
            .ok_or_else(|| DomainError::validation("order total overflows".to_string()))?;
        let expected_total = gross.checked_sub(self.discount).ok_or_else(|| {
            DomainError::validation("discount exceeds items total plus delivery charge")
        })?;
        if expected_total != self.total_amount {
            return Err(DomainError::validation(format!(
                "total_amount {} does not match items + delivery - discount = {}",
                self.total_amount, expected_total
            )));
        }

        Ok(())
    }
}

/// Result of a committed placement.
///
/// `retailer_ids` is the distinct set of retailers whose products were
/// purchased; the notification collaborator fans out to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementReceipt {
    pub order_id: OrderId,
    pub retailer_ids: Vec<RetailerId>,
}

/// Outbound notification seam (email/push senders live behind it, out of
/// scope here).
pub trait PlacementNotifier: Send + Sync {
    fn order_placed(&self, receipt: &PlacementReceipt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(quantity: i64, unit_price: u64) -> NewOrderItem {
        NewOrderItem {
            product_id: ProductId::new(),
            quantity,
            unit_price,
            total_price: (quantity.max(0) as u64) * unit_price,
        }
    }

    fn place_order(items: Vec<NewOrderItem>, delivery: u64, discount: u64) -> PlaceOrder {
        let items_total: u64 = items.iter().map(|i| i.total_price).sum();
        PlaceOrder {
            customer_id: CustomerId::new(),
            address_id: None,
            payment_id: None,
            total_amount: items_total + delivery - discount,
            delivery_charge: delivery,
            discount,
            payment_method: "online".to_string(),
            items,
        }
    }

    #[test]
    fn consistent_cart_validates() {
        let cmd = place_order(vec![line(3, 100), line(1, 250)], 50, 20);
        assert!(cmd.validate().is_ok());
    }

    #[test]
    fn empty_cart_is_rejected() {
        let cmd = place_order(vec![], 0, 0);
        match cmd.validate() {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("at least one item")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let cmd = place_order(vec![line(0, 100)], 0, 0);
        assert!(cmd.validate().is_err());

        let mut bad = line(2, 100);
        bad.quantity = -2;
        let cmd = PlaceOrder {
            total_amount: bad.total_price,
            ..place_order(vec![bad.clone()], 0, 0)
        };
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn line_total_mismatch_is_rejected() {
        let mut item = line(3, 100);
        item.total_price = 299;
        let mut cmd = place_order(vec![item], 0, 0);
        cmd.total_amount = 299;
        match cmd.validate() {
            Err(DomainError::Validation(msg)) => {
                assert!(msg.contains("does not match quantity * unit_price"))
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn header_total_mismatch_is_rejected() {
        let mut cmd = place_order(vec![line(3, 100)], 0, 0);
        cmd.total_amount += 1;
        match cmd.validate() {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("total_amount")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn discount_larger_than_gross_is_rejected() {
        let mut cmd = place_order(vec![line(1, 100)], 0, 0);
        cmd.discount = 500;
        cmd.total_amount = 0;
        match cmd.validate() {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("discount exceeds")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn missing_payment_method_is_rejected() {
        let mut cmd = place_order(vec![line(1, 100)], 0, 0);
        cmd.payment_method = "  ".to_string();
        assert!(cmd.validate().is_err());
    }

    proptest! {
        /// Any cart whose totals are derived from its own lines validates,
        /// and perturbing the header total by any nonzero delta breaks it.
        #[test]
        fn totals_enforcement_is_exact(
            lines in prop::collection::vec((1i64..50, 1u64..10_000), 1..8),
            delivery in 0u64..1_000,
            delta in 1u64..100,
        ) {
            let items: Vec<NewOrderItem> =
                lines.into_iter().map(|(q, p)| line(q, p)).collect();
            let cmd = place_order(items, delivery, 0);
            prop_assert!(cmd.validate().is_ok());

            let mut skewed = cmd.clone();
            skewed.total_amount += delta;
            prop_assert!(skewed.validate().is_err());
        }
    }
}
