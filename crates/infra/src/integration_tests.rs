//! Integration tests for the placement/scoping/transition pipeline.
//!
//! Runs against the in-memory backend; both backends share the trait
//! contract these tests pin down:
//! - placement is all-or-nothing (header + items + decrements)
//! - concurrent competing placements never oversell
//! - retailer scoping hides foreign orders entirely
//! - status transitions and deletion follow the closed tables

use std::sync::Arc;

use chrono::Utc;

use orderdesk_catalog::{Product, ProductStatus};
use orderdesk_core::{CustomerId, DomainError, OrderId, PaymentId, ProductId, RetailerId};
use orderdesk_orders::{NewOrderItem, OrderStatus, PaymentStatus, PlaceOrder};

use crate::store::{CatalogStore, Customer, InMemoryStore, OrderStore};

fn product(retailer_id: Option<RetailerId>, quantity: i64, price: u64) -> Product {
    Product {
        id: ProductId::new(),
        retailer_id,
        name: "widget".to_string(),
        image_url: Some("https://cdn.example/widget.png".to_string()),
        price,
        quantity,
        status: ProductStatus::Available,
        subcategory_id: None,
        updated_at: Utc::now(),
    }
}

fn customer(name: &str, email: &str, phone: &str) -> Customer {
    Customer {
        id: CustomerId::new(),
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
    }
}

fn cart(customer_id: CustomerId, lines: &[(ProductId, i64, u64)]) -> PlaceOrder {
    let items: Vec<NewOrderItem> = lines
        .iter()
        .map(|&(product_id, quantity, unit_price)| NewOrderItem {
            product_id,
            quantity,
            unit_price,
            total_price: quantity as u64 * unit_price,
        })
        .collect();
    let total_amount = items.iter().map(|i| i.total_price).sum();
    PlaceOrder {
        customer_id,
        address_id: None,
        payment_id: None,
        total_amount,
        delivery_charge: 0,
        discount: 0,
        payment_method: "online".to_string(),
        items,
    }
}

async fn seed_product(store: &InMemoryStore, p: &Product) {
    store.insert_product(p.clone()).await.unwrap();
}

#[tokio::test]
async fn placement_commits_header_items_and_decrements() {
    let store = InMemoryStore::new();
    let retailer = RetailerId::new();
    let p = product(Some(retailer), 5, 100);
    seed_product(&store, &p).await;

    let cmd = cart(CustomerId::new(), &[(p.id, 3, 100)]);
    let receipt = store.place_order(&cmd).await.unwrap();

    assert_eq!(receipt.retailer_ids, vec![retailer]);

    let live = store.get_product(p.id).await.unwrap().unwrap();
    assert_eq!(live.quantity, 2);

    let scoped = store.get_order(retailer, receipt.order_id).await.unwrap();
    assert_eq!(scoped.order.order_status, OrderStatus::Pending);
    assert_eq!(scoped.order.payment_status, PaymentStatus::Pending);
    assert_eq!(scoped.order.total_amount, 300);
    assert_eq!(scoped.items.len(), 1);
    assert_eq!(scoped.items[0].item.quantity, 3);
    assert_eq!(scoped.items[0].item.unit_price, 100);
    assert_eq!(scoped.items[0].product_name, "widget");
}

#[tokio::test]
async fn oversell_is_rejected_and_nothing_is_written() {
    let store = InMemoryStore::new();
    let retailer = RetailerId::new();
    let p = product(Some(retailer), 5, 100);
    seed_product(&store, &p).await;

    let cmd = cart(CustomerId::new(), &[(p.id, 6, 100)]);
    match store.place_order(&cmd).await {
        Err(DomainError::InsufficientStock {
            product_id,
            available,
        }) => {
            assert_eq!(product_id, p.id);
            assert_eq!(available, 5);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    let live = store.get_product(p.id).await.unwrap().unwrap();
    assert_eq!(live.quantity, 5);
    assert!(store.list_orders(retailer, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn failing_line_rolls_back_the_whole_cart() {
    let store = InMemoryStore::new();
    let retailer = RetailerId::new();
    let plenty = product(Some(retailer), 10, 100);
    let scarce = product(Some(retailer), 1, 50);
    seed_product(&store, &plenty).await;
    seed_product(&store, &scarce).await;

    let cmd = cart(CustomerId::new(), &[(plenty.id, 2, 100), (scarce.id, 3, 50)]);
    assert!(matches!(
        store.place_order(&cmd).await,
        Err(DomainError::InsufficientStock { .. })
    ));

    // The fulfillable line must not have been decremented.
    assert_eq!(store.get_product(plenty.id).await.unwrap().unwrap().quantity, 10);
    assert_eq!(store.get_product(scarce.id).await.unwrap().unwrap().quantity, 1);
    assert!(store.list_orders(retailer, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_product_is_named_in_the_error() {
    let store = InMemoryStore::new();
    let ghost = ProductId::new();
    let cmd = cart(CustomerId::new(), &[(ghost, 1, 100)]);
    match store.place_order(&cmd).await {
        Err(DomainError::NotFound(msg)) => assert!(msg.contains(&ghost.to_string())),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn orphaned_product_is_an_invalid_state() {
    let store = InMemoryStore::new();
    let p = product(None, 5, 100);
    seed_product(&store, &p).await;

    let cmd = cart(CustomerId::new(), &[(p.id, 1, 100)]);
    assert!(matches!(
        store.place_order(&cmd).await,
        Err(DomainError::InvalidState(_))
    ));
}

#[tokio::test]
async fn concurrent_placements_never_oversell() {
    let store = Arc::new(InMemoryStore::new());
    let retailer = RetailerId::new();
    let p = product(Some(retailer), 3, 100);
    seed_product(&store, &p).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let store = store.clone();
        let product_id = p.id;
        handles.push(tokio::spawn(async move {
            let cmd = cart(CustomerId::new(), &[(product_id, 1, 100)]);
            store.place_order(&cmd).await
        }));
    }

    let mut successes = 0;
    let mut stock_errors = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(DomainError::InsufficientStock { .. }) => stock_errors += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 3);
    assert_eq!(stock_errors, 3);
    assert_eq!(store.get_product(p.id).await.unwrap().unwrap().quantity, 0);
}

#[tokio::test]
async fn competing_carts_for_the_last_units_leave_one_winner() {
    let store = Arc::new(InMemoryStore::new());
    let retailer = RetailerId::new();
    let p = product(Some(retailer), 3, 100);
    seed_product(&store, &p).await;

    let a = {
        let store = store.clone();
        let id = p.id;
        tokio::spawn(async move { store.place_order(&cart(CustomerId::new(), &[(id, 3, 100)])).await })
    };
    let b = {
        let store = store.clone();
        let id = p.id;
        tokio::spawn(async move { store.place_order(&cart(CustomerId::new(), &[(id, 3, 100)])).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(DomainError::InsufficientStock { available: 0, .. })
    )));
    assert_eq!(store.get_product(p.id).await.unwrap().unwrap().quantity, 0);
}

#[tokio::test]
async fn shared_orders_are_sliced_per_retailer() {
    let store = InMemoryStore::new();
    let alice = RetailerId::new();
    let bob = RetailerId::new();
    let carol = RetailerId::new();
    let pa = product(Some(alice), 10, 100);
    let pb = product(Some(bob), 10, 250);
    seed_product(&store, &pa).await;
    seed_product(&store, &pb).await;

    let cmd = cart(CustomerId::new(), &[(pa.id, 1, 100), (pb.id, 2, 250)]);
    let receipt = store.place_order(&cmd).await.unwrap();

    let mut expected = vec![alice, bob];
    expected.sort();
    assert_eq!(receipt.retailer_ids, expected);

    // Each seller sees the shared header but only their own line.
    let for_alice = store.get_order(alice, receipt.order_id).await.unwrap();
    assert_eq!(for_alice.items.len(), 1);
    assert_eq!(for_alice.items[0].item.product_id, pa.id);

    let for_bob = store.get_order(bob, receipt.order_id).await.unwrap();
    assert_eq!(for_bob.items.len(), 1);
    assert_eq!(for_bob.items[0].item.product_id, pb.id);

    // A third retailer cannot even observe that the order exists.
    assert!(matches!(
        store.get_order(carol, receipt.order_id).await,
        Err(DomainError::NotFound(_))
    ));
    assert!(store.list_orders(carol, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_filters_by_status() {
    let store = InMemoryStore::new();
    let retailer = RetailerId::new();
    let p = product(Some(retailer), 10, 100);
    seed_product(&store, &p).await;

    let first = store
        .place_order(&cart(CustomerId::new(), &[(p.id, 1, 100)]))
        .await
        .unwrap();
    store
        .place_order(&cart(CustomerId::new(), &[(p.id, 1, 100)]))
        .await
        .unwrap();
    store
        .update_order_status(retailer, first.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();

    let pending = store
        .list_orders(retailer, Some(OrderStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    let confirmed = store
        .list_orders(retailer, Some(OrderStatus::Confirmed))
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].order.id, first.order_id);
}

#[tokio::test]
async fn status_transitions_follow_the_table() {
    let store = InMemoryStore::new();
    let retailer = RetailerId::new();
    let p = product(Some(retailer), 10, 100);
    seed_product(&store, &p).await;

    let receipt = store
        .place_order(&cart(CustomerId::new(), &[(p.id, 1, 100)]))
        .await
        .unwrap();
    let order_id = receipt.order_id;

    // Skipping straight to delivered is rejected and leaves the row alone.
    match store
        .update_order_status(retailer, order_id, OrderStatus::Delivered)
        .await
    {
        Err(DomainError::Validation(msg)) => assert!(msg.contains("pending -> delivered")),
        other => panic!("expected Validation, got {other:?}"),
    }
    let current = store.get_order(retailer, order_id).await.unwrap();
    assert_eq!(current.order.order_status, OrderStatus::Pending);

    store
        .update_order_status(retailer, order_id, OrderStatus::Confirmed)
        .await
        .unwrap();
    store
        .update_order_status(retailer, order_id, OrderStatus::Shipped)
        .await
        .unwrap();
    store
        .update_order_status(retailer, order_id, OrderStatus::Delivered)
        .await
        .unwrap();

    // Terminal.
    assert!(
        store
            .update_order_status(retailer, order_id, OrderStatus::Cancelled)
            .await
            .is_err()
    );
}

#[tokio::test]
async fn foreign_retailer_cannot_transition_an_order() {
    let store = InMemoryStore::new();
    let owner = RetailerId::new();
    let stranger = RetailerId::new();
    let p = product(Some(owner), 10, 100);
    seed_product(&store, &p).await;

    let receipt = store
        .place_order(&cart(CustomerId::new(), &[(p.id, 1, 100)]))
        .await
        .unwrap();

    assert!(matches!(
        store
            .update_order_status(stranger, receipt.order_id, OrderStatus::Confirmed)
            .await,
        Err(DomainError::NotFound(_))
    ));

    let unchanged = store.get_order(owner, receipt.order_id).await.unwrap();
    assert_eq!(unchanged.order.order_status, OrderStatus::Pending);
}

#[tokio::test]
async fn deletion_is_pending_only_and_removes_items_with_the_header() {
    let store = InMemoryStore::new();
    let retailer = RetailerId::new();
    let p = product(Some(retailer), 10, 100);
    seed_product(&store, &p).await;

    let pending = store
        .place_order(&cart(CustomerId::new(), &[(p.id, 1, 100)]))
        .await
        .unwrap();
    let confirmed = store
        .place_order(&cart(CustomerId::new(), &[(p.id, 1, 100)]))
        .await
        .unwrap();
    store
        .update_order_status(retailer, confirmed.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();

    match store.delete_order(retailer, confirmed.order_id).await {
        Err(DomainError::Validation(msg)) => assert!(msg.contains("only pending")),
        other => panic!("expected Validation, got {other:?}"),
    }
    assert!(store.get_order(retailer, confirmed.order_id).await.is_ok());

    store.delete_order(retailer, pending.order_id).await.unwrap();
    assert!(matches!(
        store.get_order(retailer, pending.order_id).await,
        Err(DomainError::NotFound(_))
    ));
    // Items went with the header: only the confirmed order remains listed.
    let remaining = store.list_orders(retailer, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].order.id, confirmed.order_id);
}

#[tokio::test]
async fn search_matches_customer_fields_within_scope() {
    let store = InMemoryStore::new();
    let retailer = RetailerId::new();
    let other = RetailerId::new();
    let p = product(Some(retailer), 10, 100);
    seed_product(&store, &p).await;

    let ada = customer("Ada Lovelace", "ada@example.com", "+442071234567");
    store.insert_customer(ada.clone()).await.unwrap();

    let receipt = store
        .place_order(&cart(ada.id, &[(p.id, 1, 100)]))
        .await
        .unwrap();

    let by_name = store.search_orders(retailer, "lovelace").await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].order.id, receipt.order_id);

    let by_email = store.search_orders(retailer, "ada@").await.unwrap();
    assert_eq!(by_email.len(), 1);

    let by_phone = store.search_orders(retailer, "20712").await.unwrap();
    assert_eq!(by_phone.len(), 1);

    assert!(store.search_orders(retailer, "nobody").await.unwrap().is_empty());
    // Scoped: another retailer finds nothing for the same customer.
    assert!(store.search_orders(other, "lovelace").await.unwrap().is_empty());
}

#[tokio::test]
async fn statistics_exclude_cancelled_orders_and_count_own_items_only() {
    let store = InMemoryStore::new();
    let retailer = RetailerId::new();
    let other = RetailerId::new();
    let own = product(Some(retailer), 50, 100);
    let foreign = product(Some(other), 50, 900);
    seed_product(&store, &own).await;
    seed_product(&store, &foreign).await;

    // Shared order: only the retailer's 200 should count toward revenue.
    store
        .place_order(&cart(
            CustomerId::new(),
            &[(own.id, 2, 100), (foreign.id, 1, 900)],
        ))
        .await
        .unwrap();

    // Own order that gets cancelled: counted by status, excluded from revenue.
    let cancelled = store
        .place_order(&cart(CustomerId::new(), &[(own.id, 3, 100)]))
        .await
        .unwrap();
    store
        .update_order_status(retailer, cancelled.order_id, OrderStatus::Cancelled)
        .await
        .unwrap();

    // Own order that gets confirmed.
    let confirmed = store
        .place_order(&cart(CustomerId::new(), &[(own.id, 4, 100)]))
        .await
        .unwrap();
    store
        .update_order_status(retailer, confirmed.order_id, OrderStatus::Confirmed)
        .await
        .unwrap();

    let stats = store.order_statistics(retailer).await.unwrap();
    assert_eq!(stats.counts.pending, 1);
    assert_eq!(stats.counts.confirmed, 1);
    assert_eq!(stats.counts.cancelled, 1);
    assert_eq!(stats.total_revenue, 200 + 400);
    assert_eq!(stats.order_count, 2);
    assert!((stats.average_order_value - 300.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn payment_callback_marks_paid_once() {
    let store = InMemoryStore::new();
    let retailer = RetailerId::new();
    let p = product(Some(retailer), 10, 100);
    seed_product(&store, &p).await;

    let receipt = store
        .place_order(&cart(CustomerId::new(), &[(p.id, 1, 100)]))
        .await
        .unwrap();
    let payment_id = PaymentId::new();

    store.record_payment(receipt.order_id, payment_id).await.unwrap();

    let scoped = store.get_order(retailer, receipt.order_id).await.unwrap();
    assert_eq!(scoped.order.payment_status, PaymentStatus::Paid);
    assert_eq!(scoped.order.payment_id, Some(payment_id));

    // paid -> paid is not in the table.
    assert!(store.record_payment(receipt.order_id, payment_id).await.is_err());

    // Unknown order.
    assert!(matches!(
        store.record_payment(OrderId::new(), payment_id).await,
        Err(DomainError::NotFound(_))
    ));
}

#[tokio::test]
async fn standalone_decrement_is_guarded() {
    let store = InMemoryStore::new();
    let retailer = RetailerId::new();
    let p = product(Some(retailer), 2, 100);
    seed_product(&store, &p).await;

    store.decrement_quantity(p.id, 2).await.unwrap();
    match store.decrement_quantity(p.id, 1).await {
        Err(DomainError::InsufficientStock { available, .. }) => assert_eq!(available, 0),
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert!(matches!(
        store.decrement_quantity(ProductId::new(), 1).await,
        Err(DomainError::NotFound(_))
    ));
}
