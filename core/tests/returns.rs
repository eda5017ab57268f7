//! Return modeling: uniqueness per order item, refund aggregation onto
//! the owning payment, and the CAPTURED -> REFUNDED flip.

use cartflow_core::config::{ModelConfig, ScaleConfig};
use cartflow_core::model::PaymentStatus;
use cartflow_core::refresh::seed_warehouse;
use cartflow_core::store::WarehouseStore;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{HashMap, HashSet};

fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 15)
        .expect("valid date")
        .and_hms_opt(12, 0, 0)
        .expect("valid time")
}

fn seeded_store() -> WarehouseStore {
    let store = WarehouseStore::in_memory().expect("store");
    store.migrate().expect("migrate");
    // Enough orders that the ~3% return rate reliably produces returns.
    let scale = ScaleConfig {
        geos: 5,
        fulfillment_centers: 3,
        customers: 150,
        products: 60,
        orders: 600,
        max_items_per_order: 4,
    };
    seed_warehouse(&store, &scale, 31, fixed_now(), &ModelConfig::default()).expect("seed");
    store
}

#[test]
fn at_most_one_return_per_order_item() {
    let store = seeded_store();
    let returns = store.all_returns().expect("returns");
    assert!(!returns.is_empty(), "expected some returns at this scale");

    let mut seen_items = HashSet::new();
    for r in &returns {
        assert!(
            seen_items.insert(r.order_item_id),
            "order item {} was returned twice",
            r.order_item_id
        );
    }
}

#[test]
fn returns_only_touch_shipped_orders() {
    let store = seeded_store();
    for r in store.all_returns().expect("returns") {
        let order = store.order(r.order_id).expect("order");
        assert!(
            order.order_status.is_fulfilled(),
            "return {} against order {} in state {:?}",
            r.return_id,
            r.order_id,
            order.order_status
        );
        assert!(
            store
                .shipment_for_order(r.order_id)
                .expect("shipment query")
                .is_some(),
            "returned order {} has no shipment",
            r.order_id
        );
    }
}

#[test]
fn refunds_flip_and_aggregate_onto_the_owning_payment() {
    let store = seeded_store();
    let returns = store.all_returns().expect("returns");

    let mut refunds_by_order: HashMap<i64, f64> = HashMap::new();
    for r in &returns {
        *refunds_by_order.entry(r.order_id).or_insert(0.0) += r.refund_amount;
    }

    for (order_id, expected_refund) in refunds_by_order {
        let payment = store.payment_for_order(order_id).expect("payment");
        assert_eq!(
            payment.payment_status,
            PaymentStatus::Refunded,
            "order {order_id} has returns but payment status {:?}",
            payment.payment_status
        );
        assert!(
            (payment.refund_amount - expected_refund).abs() < 0.02,
            "order {order_id}: payment refund {} != return total {expected_refund}",
            payment.refund_amount
        );
    }
}

#[test]
fn refund_never_exceeds_the_line_net() {
    let store = seeded_store();
    let items: HashMap<i64, f64> = store
        .all_order_items()
        .expect("items")
        .into_iter()
        .map(|i| (i.order_item_id, i.line_net_revenue))
        .collect();

    for r in store.all_returns().expect("returns") {
        let line_net = items[&r.order_item_id];
        assert!(
            r.refund_amount <= line_net + 0.01,
            "return {} refunds {} against a {} line",
            r.return_id,
            r.refund_amount,
            line_net
        );
        assert!(r.refund_amount >= 0.0);
        assert_eq!(r.return_status, "REFUNDED");
    }
}

#[test]
fn unreturned_captured_payments_carry_no_refund() {
    let store = seeded_store();
    for payment in store.all_payments().expect("payments") {
        if payment.payment_status == PaymentStatus::Captured {
            assert_eq!(
                payment.refund_amount, 0.0,
                "captured payment {} has a refund amount",
                payment.payment_id
            );
            assert!(!payment.chargeback_flag);
        }
    }
}
