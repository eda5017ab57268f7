//! Funnel causality: for every session, no event of a stage exists
//! without all causally-prior stages present earlier in the same
//! session, and the two terminal stages never co-occur.

use cartflow_core::config::{ModelConfig, ScaleConfig};
use cartflow_core::model::{FunnelEvent, FunnelStage};
use cartflow_core::refresh::seed_warehouse;
use cartflow_core::store::WarehouseStore;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 15)
        .expect("valid date")
        .and_hms_opt(12, 0, 0)
        .expect("valid time")
}

fn seeded_events() -> Vec<FunnelEvent> {
    let store = WarehouseStore::in_memory().expect("store");
    store.migrate().expect("migrate");
    let scale = ScaleConfig {
        geos: 5,
        fulfillment_centers: 3,
        customers: 120,
        products: 60,
        orders: 300,
        max_items_per_order: 4,
    };
    seed_warehouse(&store, &scale, 17, fixed_now(), &ModelConfig::default()).expect("seed");
    store.all_funnel_events().expect("events")
}

fn by_session(events: Vec<FunnelEvent>) -> BTreeMap<String, Vec<FunnelEvent>> {
    let mut sessions: BTreeMap<String, Vec<FunnelEvent>> = BTreeMap::new();
    for event in events {
        sessions.entry(event.session_id.clone()).or_default().push(event);
    }
    for events in sessions.values_mut() {
        events.sort_by_key(|e| (e.event_ts, e.event_id));
    }
    sessions
}

#[test]
fn every_stage_has_its_causal_prefix() {
    for (session_id, events) in by_session(seeded_events()) {
        let mut seen = [false; 6];
        for event in &events {
            let rank = event.stage.causal_rank() as usize;
            for prior in 0..rank {
                assert!(
                    seen[prior],
                    "session {session_id}: {} at rank {rank} missing prior rank {prior}",
                    event.stage.as_str()
                );
            }
            seen[rank] = true;
        }
    }
}

#[test]
fn timestamps_strictly_increase_within_a_session() {
    for (session_id, events) in by_session(seeded_events()) {
        for pair in events.windows(2) {
            assert!(
                pair[1].event_ts > pair[0].event_ts,
                "session {session_id}: events {} and {} share or invert timestamps",
                pair[0].event_id,
                pair[1].event_id
            );
        }
    }
}

#[test]
fn terminal_stages_are_mutually_exclusive() {
    for (session_id, events) in by_session(seeded_events()) {
        let placed = events
            .iter()
            .filter(|e| e.stage == FunnelStage::OrderPlaced)
            .count();
        let failed = events
            .iter()
            .filter(|e| e.stage == FunnelStage::PaymentFailed)
            .count();
        assert!(
            placed + failed <= 1,
            "session {session_id} has {placed} ORDER_PLACED and {failed} PAYMENT_FAILED events"
        );
    }
}

#[test]
fn failure_reason_only_on_payment_failed() {
    for event in seeded_events() {
        match event.stage {
            FunnelStage::PaymentFailed => assert!(
                event.failure_reason.is_some(),
                "event {} is PAYMENT_FAILED without a reason",
                event.event_id
            ),
            _ => assert!(
                event.failure_reason.is_none(),
                "event {} ({}) carries a failure reason",
                event.event_id,
                event.stage.as_str()
            ),
        }
    }
}

#[test]
fn anonymous_browsing_sessions_exist() {
    let events = seeded_events();
    assert!(
        events.iter().any(|e| e.customer_id.is_none()),
        "expected at least one anonymous session in the extra-session pool"
    );
    // Anonymous sessions never produce an order.
    for event in &events {
        if event.customer_id.is_none() {
            assert!(event.order_id.is_none());
        }
    }
}

#[test]
fn order_refs_appear_only_at_payment_stages() {
    for event in seeded_events() {
        match event.stage {
            FunnelStage::PaymentAttempted
            | FunnelStage::PaymentFailed
            | FunnelStage::OrderPlaced => {
                assert!(event.order_id.is_some())
            }
            _ => assert!(event.order_id.is_none()),
        }
    }
}
