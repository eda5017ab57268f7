//! Dimension generator tests: id assignment, referential links, and the
//! taxonomy's price consistency guarantees.

use cartflow_core::config::ScaleConfig;
use cartflow_core::dimension_generator;
use cartflow_core::rng::{RngBank, StreamSlot};
use chrono::{Duration, NaiveDate, NaiveDateTime};

fn fixed_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .expect("valid date")
        .and_hms_opt(9, 30, 0)
        .expect("valid time")
}

fn generate(seed: u64, scale: &ScaleConfig) -> dimension_generator::DimensionSet {
    let bank = RngBank::new(seed);
    let mut rng = bank.stream(StreamSlot::Dimension);
    dimension_generator::generate(scale, fixed_now(), &mut rng).expect("generate dimensions")
}

#[test]
fn customers_get_dense_ids_and_valid_geo_refs() {
    let scale = ScaleConfig {
        geos: 5,
        fulfillment_centers: 3,
        customers: 100,
        products: 50,
        orders: 0,
        max_items_per_order: 4,
    };
    let dims = generate(1, &scale);

    assert_eq!(dims.customers.len(), 100);
    for (index, customer) in dims.customers.iter().enumerate() {
        assert_eq!(customer.customer_id, index as i64 + 1);
        assert!(
            (1..=5).contains(&customer.geo_id),
            "customer {} references geo {} outside [1, 5]",
            customer.customer_id,
            customer.geo_id
        );
    }
}

#[test]
fn customer_creation_times_stay_inside_the_lookback_window() {
    let scale = ScaleConfig {
        geos: 4,
        fulfillment_centers: 2,
        customers: 200,
        products: 10,
        orders: 0,
        max_items_per_order: 3,
    };
    let dims = generate(3, &scale);

    let window_start = fixed_now() - Duration::days(365);
    for customer in &dims.customers {
        assert!(customer.customer_created_ts >= window_start);
        assert!(customer.customer_created_ts < fixed_now());
    }
}

#[test]
fn product_margin_is_always_positive_and_bounded() {
    let scale = ScaleConfig {
        geos: 3,
        fulfillment_centers: 2,
        customers: 10,
        products: 400,
        orders: 0,
        max_items_per_order: 3,
    };
    let dims = generate(11, &scale);

    assert_eq!(dims.products.len(), 400);
    for product in &dims.products {
        assert!(product.unit_cost > 0.0, "{} has zero cost", product.sku);
        assert!(
            product.unit_cost < product.list_price,
            "{} has non-positive margin: cost {} vs list {}",
            product.sku,
            product.unit_cost,
            product.list_price
        );
        // Markup bound [1.18, 1.75] with a little room for 2dp rounding.
        let markup = product.list_price / product.unit_cost;
        assert!(
            (1.17..=1.77).contains(&markup),
            "{} markup {markup} escaped the configured band",
            product.sku
        );
    }
}

#[test]
fn fulfillment_centers_reference_generated_geos() {
    let scale = ScaleConfig {
        geos: 6,
        fulfillment_centers: 10,
        customers: 10,
        products: 10,
        orders: 0,
        max_items_per_order: 3,
    };
    let dims = generate(5, &scale);

    assert_eq!(dims.fulfillment_centers.len(), 10);
    for fc in &dims.fulfillment_centers {
        assert!(dims.geos.iter().any(|g| g.geo_id == fc.geo_id));
        assert!(fc.fc_name.starts_with("FC-"));
        assert!(!fc.timezone.is_empty());
    }
}

#[test]
fn skus_are_unique_and_sequenced() {
    let scale = ScaleConfig {
        geos: 3,
        fulfillment_centers: 2,
        customers: 10,
        products: 250,
        orders: 0,
        max_items_per_order: 3,
    };
    let dims = generate(23, &scale);

    let mut skus: Vec<&str> = dims.products.iter().map(|p| p.sku.as_str()).collect();
    skus.sort_unstable();
    skus.dedup();
    assert_eq!(skus.len(), 250, "duplicate SKUs generated");
    assert_eq!(dims.products[0].sku, "SKU-0000001");
}

#[test]
fn date_dimension_is_continuous_and_flags_weekends() {
    let scale = ScaleConfig {
        geos: 2,
        fulfillment_centers: 1,
        customers: 5,
        products: 5,
        orders: 0,
        max_items_per_order: 2,
    };
    let dims = generate(9, &scale);

    assert!(!dims.dates.is_empty());
    for pair in dims.dates.windows(2) {
        assert_eq!(
            pair[1].date_value,
            pair[0].date_value + Duration::days(1),
            "calendar gap between {} and {}",
            pair[0].date_value,
            pair[1].date_value
        );
    }
    for d in &dims.dates {
        assert_eq!(d.is_weekend, d.day_of_week >= 6);
        assert_eq!(
            d.date_id,
            d.year as i64 * 10_000 + d.month as i64 * 100 + d.day_of_month as i64
        );
    }
}
