//! Staging-and-merge engine tests: idempotency under key, no-op
//! detection, per-key dedupe, and no double-counted revenue when the
//! same delta batch lands twice.

use cartflow_core::config::{ModelConfig, RefreshConfig, ScaleConfig, TimeWindow};
use cartflow_core::merge::{dedupe_latest, DimBatch, MergeEngine, RefreshCounts};
use cartflow_core::refresh::{seed_warehouse, RefreshOrchestrator};
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
        geos: 4,
        fulfillment_centers: 3,
        customers: 60,
        products: 40,
        orders: 120,
        max_items_per_order: 4,
    };
    seed_warehouse(&store, &scale, 13, fixed_now(), &ModelConfig::default()).expect("seed");
    store
}

#[test]
fn restaging_identical_rows_is_a_full_noop() {
    let store = seeded_store();
    let engine = MergeEngine::new(&store);

    let batch = DimBatch {
        customers: store.all_customers().expect("customers"),
        products: store.all_products().expect("products"),
    };

    store.clear_staging().expect("clear");
    let mut counts = RefreshCounts::default();
    engine
        .stage_and_merge_dimensions(&batch, &mut counts)
        .expect("merge");

    assert_eq!(counts.dim_customer.inserted, 0);
    assert_eq!(counts.dim_customer.updated, 0);
    assert_eq!(counts.dim_product.inserted, 0);
    assert_eq!(counts.dim_product.updated, 0);
}

#[test]
fn merge_separates_inserts_updates_and_noops() {
    let store = seeded_store();
    let engine = MergeEngine::new(&store);
    let later = fixed_now() + Duration::minutes(5);

    let mut customers = store.all_customers().expect("customers");
    let unchanged = customers.len() - 3;

    // Three content changes...
    for customer in customers.iter_mut().take(3) {
        customer.acquisition_channel = "EMAIL_WINBACK".to_string();
        customer.updated_at = later;
    }
    // ...and two brand-new rows.
    let mut fresh_a = customers[0].clone();
    fresh_a.customer_id = 10_001;
    let mut fresh_b = customers[0].clone();
    fresh_b.customer_id = 10_002;
    customers.push(fresh_a);
    customers.push(fresh_b);

    let batch = DimBatch {
        customers,
        products: Vec::new(),
    };

    store.clear_staging().expect("clear");
    let mut counts = RefreshCounts::default();
    engine
        .stage_and_merge_dimensions(&batch, &mut counts)
        .expect("merge");

    assert_eq!(counts.dim_customer.inserted, 2);
    assert_eq!(counts.dim_customer.updated, 3);
    assert_eq!(
        store.table_count("dim_customer").expect("count") as usize,
        unchanged + 3 + 2
    );

    // Second application of the same batch: nothing left to do.
    store.clear_staging().expect("clear");
    let mut second = RefreshCounts::default();
    engine
        .stage_and_merge_dimensions(&batch, &mut second)
        .expect("merge");
    assert_eq!(second.dim_customer.inserted, 0);
    assert_eq!(second.dim_customer.updated, 0);
}

/// Applying one run's fact delta twice must leave the warehouse exactly
/// as one application did: same row counts, same revenue, all-zero
/// counts on the second pass.
#[test]
fn reapplying_a_fact_delta_changes_nothing() {
    let store = seeded_store();
    let engine = MergeEngine::new(&store);

    let config = RefreshConfig::default_test();
    let orchestrator = RefreshOrchestrator::new(&store, config).expect("orchestrator");

    let now = fixed_now() + Duration::minutes(30);
    let window = TimeWindow::new(fixed_now(), now).expect("window");
    let batch = orchestrator
        .generate_fact_batch(&window, now)
        .expect("fact batch");

    store.clear_staging().expect("clear");
    let mut first = RefreshCounts::default();
    engine
        .stage_and_merge_facts(&batch, &mut first)
        .expect("first merge");
    assert!(first.fact_orders.inserted > 0);

    let orders_after_first = store.table_count("fact_orders").expect("count");
    let returns_after_first = store.table_count("fact_returns").expect("count");
    let revenue_after_first: f64 = store
        .all_orders()
        .expect("orders")
        .iter()
        .map(|o| o.net_amount)
        .sum();

    store.clear_staging().expect("clear");
    let mut second = RefreshCounts::default();
    engine
        .stage_and_merge_facts(&batch, &mut second)
        .expect("second merge");

    for (table, counts) in second.entries() {
        assert_eq!(
            counts.inserted, 0,
            "{table} inserted rows on a repeated batch"
        );
        assert_eq!(counts.updated, 0, "{table} updated rows on a repeated batch");
    }
    assert_eq!(store.table_count("fact_orders").expect("count"), orders_after_first);
    assert_eq!(
        store.table_count("fact_returns").expect("count"),
        returns_after_first
    );
    let revenue_after_second: f64 = store
        .all_orders()
        .expect("orders")
        .iter()
        .map(|o| o.net_amount)
        .sum();
    assert!(
        (revenue_after_second - revenue_after_first).abs() < 0.001,
        "revenue drifted across identical merges: {revenue_after_first} -> {revenue_after_second}"
    );
}

#[test]
fn dedupe_keeps_the_latest_version_per_key() {
    let store = seeded_store();
    let base = store.all_customers().expect("customers");

    let mut stale = base[0].clone();
    stale.acquisition_channel = "STALE".to_string();
    stale.updated_at = fixed_now();

    let mut current = base[0].clone();
    current.acquisition_channel = "CURRENT".to_string();
    current.updated_at = fixed_now() + Duration::minutes(10);

    // Latest-updated wins regardless of position.
    let mut rows = vec![current.clone(), stale.clone()];
    dedupe_latest(&mut rows, |c| c.customer_id, |c| c.updated_at);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].acquisition_channel, "CURRENT");

    // On an exact timestamp tie, the later element sticks.
    let mut tied_a = base[1].clone();
    tied_a.acquisition_channel = "FIRST".to_string();
    let mut tied_b = base[1].clone();
    tied_b.acquisition_channel = "SECOND".to_string();
    let mut rows = vec![tied_a, tied_b];
    dedupe_latest(&mut rows, |c| c.customer_id, |c| c.updated_at);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].acquisition_channel, "SECOND");
}
