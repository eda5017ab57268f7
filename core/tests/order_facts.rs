//! Order/fact generator tests: monetary consistency, payment outcome
//! rules, shipment SLA semantics, and discount bounds.

use cartflow_core::config::{ModelConfig, ScaleConfig};
use cartflow_core::model::{sla_breached, OrderStatus, PaymentMethod, PaymentStatus};
use cartflow_core::refresh::seed_warehouse;
use cartflow_core::store::WarehouseStore;
use chrono::{Duration, NaiveDate, NaiveDateTime};

fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 15)
        .expect("valid date")
        .and_hms_opt(12, 0, 0)
        .expect("valid time")
}

fn seeded_store() -> WarehouseStore {
    let store = WarehouseStore::in_memory().expect("store");
    store.migrate().expect("migrate");
    let scale = ScaleConfig {
        geos: 5,
        fulfillment_centers: 3,
        customers: 100,
        products: 60,
        orders: 250,
        max_items_per_order: 5,
    };
    seed_warehouse(&store, &scale, 21, fixed_now(), &ModelConfig::default()).expect("seed");
    store
}

#[test]
fn order_totals_reconcile_with_their_lines() {
    let store = seeded_store();
    for order in store.all_orders().expect("orders") {
        let items = store.items_for_order(order.order_id).expect("items");
        assert!(!items.is_empty(), "order {} has no items", order.order_id);

        let net: f64 = items.iter().map(|i| i.line_net_revenue).sum();
        let tax: f64 = items.iter().map(|i| i.line_tax).sum();
        let discount: f64 = items.iter().map(|i| i.line_discount).sum();

        assert!(
            (order.net_amount - net).abs() < 0.01,
            "order {}: net {} != line sum {}",
            order.order_id,
            order.net_amount,
            net
        );
        assert!((order.tax_amount - tax).abs() < 0.01);
        assert!((order.discount_amount - discount).abs() < 0.01);
    }
}

#[test]
fn cancelled_orders_get_failed_payments_and_no_shipment() {
    let store = seeded_store();
    let cancelled = store
        .orders_with_status(OrderStatus::Cancelled)
        .expect("cancelled orders");
    assert!(!cancelled.is_empty(), "expected some cancelled orders");

    for order in cancelled {
        let payment = store.payment_for_order(order.order_id).expect("payment");
        assert!(
            payment.payment_status.is_failure(),
            "cancelled order {} has payment status {:?}",
            order.order_id,
            payment.payment_status
        );
        assert!(
            payment.failure_reason.is_some(),
            "cancelled order {} has no failure reason",
            order.order_id
        );
        assert!(payment.captured_ts.is_none());
        assert_eq!(payment.gateway_fee_amount, 0.0);
        assert!(store
            .shipment_for_order(order.order_id)
            .expect("shipment query")
            .is_none());
    }
}

#[test]
fn fulfilled_orders_carry_exactly_one_consistent_shipment() {
    let store = seeded_store();
    let mut fulfilled = store
        .orders_with_status(OrderStatus::Delivered)
        .expect("delivered");
    fulfilled.extend(store.orders_with_status(OrderStatus::Completed).expect("completed"));
    assert!(!fulfilled.is_empty());

    for order in fulfilled {
        let shipment = store
            .shipment_for_order(order.order_id)
            .expect("shipment query")
            .unwrap_or_else(|| panic!("order {} has no shipment", order.order_id));
        assert_eq!(
            shipment.sla_breached_flag,
            shipment.delivered_dt > shipment.promised_delivery_dt,
            "shipment {} breach flag disagrees with its dates",
            shipment.shipment_id
        );
        assert!(shipment.shipped_ts > order.order_ts);
        assert!(shipment.shipping_cost > 0.0);
        // Promise window is 2-6 days out from the order.
        let promised_offset = shipment.promised_delivery_dt - order.order_ts.date();
        assert!((2..=7).contains(&promised_offset.num_days()));
    }
}

#[test]
fn created_orders_are_paid_but_unshipped() {
    let store = seeded_store();
    for order in store.orders_with_status(OrderStatus::Created).expect("created") {
        let payment = store.payment_for_order(order.order_id).expect("payment");
        assert_eq!(payment.payment_status, PaymentStatus::Captured);
        assert!(store
            .shipment_for_order(order.order_id)
            .expect("shipment query")
            .is_none());
    }
}

#[test]
fn gateway_fees_follow_method_and_outcome() {
    let store = seeded_store();
    for payment in store.all_payments().expect("payments") {
        if payment.payment_method == PaymentMethod::Cod || payment.payment_status.is_failure() {
            assert_eq!(
                payment.gateway_fee_amount, 0.0,
                "payment {} should carry no gateway fee",
                payment.payment_id
            );
        } else {
            // rate cap 2.5% plus fixed fee cap 6.0, with rounding slop.
            let cap = payment.amount * 0.025 + 6.0 + 0.01;
            assert!(
                payment.gateway_fee_amount >= 0.0 && payment.gateway_fee_amount <= cap,
                "payment {} fee {} outside [0, {cap}]",
                payment.payment_id,
                payment.gateway_fee_amount
            );
        }
    }
}

#[test]
fn discounts_never_exceed_the_cap() {
    let store = seeded_store();
    for item in store.all_order_items().expect("items") {
        let floor = item.unit_list_price * (1.0 - 0.55) - 0.01;
        assert!(
            item.unit_sell_price >= floor,
            "item {} sell price {} below 55% discount cap on list {}",
            item.order_item_id,
            item.unit_sell_price,
            item.unit_list_price
        );
        assert!(item.unit_sell_price <= item.unit_list_price);
        assert!(item.qty >= 1 && item.qty <= 3);
    }
}

#[test]
fn sla_breach_is_a_pure_date_comparison() {
    let promised = NaiveDate::from_ymd_opt(2025, 3, 10).expect("date");
    assert!(sla_breached(promised, promised + Duration::days(2)));
    assert!(!sla_breached(promised, promised));
    assert!(!sla_breached(promised, promised - Duration::days(1)));
}
