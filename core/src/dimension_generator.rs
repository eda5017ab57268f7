//! Dimension generation: geographies, fulfillment centers, customers,
//! products, and the calendar dimension.
//!
//! Same seed + same scale = byte-identical output. Every draw goes
//! through the caller-provided deterministic stream.

use crate::catalog;
use crate::config::{ScaleConfig, TimeWindow};
use crate::error::{RefreshError, RefreshResult};
use crate::model::{round2, Customer, DateDim, FulfillmentCenter, Geo, Product};
use crate::rng::StreamRng;
use crate::types::EntityId;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};

/// Days of calendar dimension generated before the load window's end.
const DATE_DIM_LOOKBACK_DAYS: i64 = 430;

/// Customer acquisition window.
pub const CUSTOMER_LOOKBACK_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct DimensionSet {
    pub geos: Vec<Geo>,
    pub fulfillment_centers: Vec<FulfillmentCenter>,
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
    pub dates: Vec<DateDim>,
}

/// Generate the full dimension set for a warehouse seed.
pub fn generate(
    scale: &ScaleConfig,
    now: NaiveDateTime,
    rng: &mut StreamRng,
) -> RefreshResult<DimensionSet> {
    scale.validate()?;

    let geos = generate_geos(scale.geos, now, rng);
    let fulfillment_centers = generate_fulfillment_centers(scale.fulfillment_centers, &geos, now, rng)?;
    let window = TimeWindow::lookback_days(now, CUSTOMER_LOOKBACK_DAYS);
    let customers = generate_customers(scale.customers, 1, &geos, &window, rng)?;
    let products = generate_products(scale.products, 1, now, rng);
    let dates = generate_date_dim(
        now.date() - Duration::days(DATE_DIM_LOOKBACK_DAYS),
        now.date(),
    );

    Ok(DimensionSet {
        geos,
        fulfillment_centers,
        customers,
        products,
        dates,
    })
}

pub fn generate_geos(count: u32, now: NaiveDateTime, rng: &mut StreamRng) -> Vec<Geo> {
    (1..=count as EntityId)
        .map(|geo_id| {
            let spec = rng.pick(catalog::COUNTRIES);
            let city = *rng.pick(catalog::cities_for_region(spec.region));
            Geo {
                geo_id,
                country: spec.country.to_string(),
                region: spec.region.to_string(),
                city: city.to_string(),
                currency: spec.currency.to_string(),
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}

pub fn generate_fulfillment_centers(
    count: u32,
    geos: &[Geo],
    now: NaiveDateTime,
    rng: &mut StreamRng,
) -> RefreshResult<Vec<FulfillmentCenter>> {
    if geos.is_empty() {
        return Err(RefreshError::missing("geo", "no geographies available"));
    }
    Ok((1..=count as EntityId)
        .map(|fc_id| {
            let geo = rng.pick(geos);
            FulfillmentCenter {
                fc_id,
                fc_name: format!("FC-{}-{}", catalog::letter_code(rng, 4), fc_id),
                geo_id: geo.geo_id,
                timezone: catalog::timezone_for_region(&geo.region).to_string(),
                created_at: now,
                updated_at: now,
            }
        })
        .collect())
}

/// Customers get ids `first_id..first_id + count` and creation timestamps
/// uniform over the window. Also used by the dimension delta path, which
/// continues numbering after the warehouse's current maximum.
pub fn generate_customers(
    count: u32,
    first_id: EntityId,
    geos: &[Geo],
    window: &TimeWindow,
    rng: &mut StreamRng,
) -> RefreshResult<Vec<Customer>> {
    if geos.is_empty() {
        return Err(RefreshError::missing("geo", "no geographies available"));
    }
    let seconds = window.seconds();
    Ok((0..count as EntityId)
        .map(|i| {
            let created_ts = window.start + Duration::seconds(rng.range_i64(0, seconds - 1));
            Customer {
                customer_id: first_id + i,
                customer_created_ts: created_ts,
                geo_id: rng.pick(geos).geo_id,
                acquisition_channel: rng.pick(catalog::ACQUISITION_CHANNELS).to_string(),
                created_at: created_ts,
                updated_at: created_ts,
            }
        })
        .collect())
}

pub fn generate_products(
    count: u32,
    first_id: EntityId,
    now: NaiveDateTime,
    rng: &mut StreamRng,
) -> Vec<Product> {
    (0..count as EntityId)
        .map(|i| {
            let product_id = first_id + i;
            let spec = catalog::pick_category(rng);
            let brand = *rng.pick(spec.brands);

            let list_price = round2(rng.uniform(spec.price_band.0, spec.price_band.1));
            let markup = rng.uniform(catalog::MARKUP_RANGE.0, catalog::MARKUP_RANGE.1);
            let unit_cost = round2(list_price / markup);

            Product {
                product_id,
                sku: format!("SKU-{product_id:07}"),
                product_name: catalog::product_name(rng, spec, brand),
                category_l1: spec.l1.to_string(),
                category_l2: spec.l2.to_string(),
                brand: brand.to_string(),
                unit_cost,
                list_price,
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}

pub fn generate_date_dim(start: NaiveDate, end: NaiveDate) -> Vec<DateDim> {
    let mut rows = Vec::new();
    let mut d = start;
    while d <= end {
        let dow = d.weekday().number_from_monday();
        rows.push(DateDim {
            date_id: d.year() as i64 * 10_000 + d.month() as i64 * 100 + d.day() as i64,
            date_value: d,
            year: d.year(),
            quarter: (d.month() - 1) / 3 + 1,
            month: d.month(),
            month_name: month_name(d.month()).to_string(),
            week_of_year: d.iso_week().week(),
            day_of_month: d.day(),
            day_of_week: dow,
            day_name: day_name(d.weekday()).to_string(),
            is_weekend: dow >= 6,
        });
        d = d + Duration::days(1);
    }
    rows
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
