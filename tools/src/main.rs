//! refresh-runner: headless CLI for the CartFlow warehouse.
//!
//! Usage:
//!   refresh-runner --mode seed --db cart.db --scale small --seed 42
//!   refresh-runner --mode refresh --db cart.db --source cartflow_incremental --seed 7
//!   refresh-runner --mode refresh --db cart.db --config refresh.json

use anyhow::Result;
use cartflow_core::config::{DeltaConfig, DimDeltaConfig, ModelConfig, RefreshConfig, ScaleConfig};
use cartflow_core::refresh::{seed_warehouse, RefreshOrchestrator};
use cartflow_core::store::WarehouseStore;
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mode = string_arg(&args, "--mode", "refresh");
    let db = string_arg(&args, "--db", "cartflow.db");
    let seed = parse_arg(&args, "--seed", 42u64);
    let now = chrono::Utc::now().naive_utc();

    let store = WarehouseStore::open(&db)?;
    store.migrate()?;
    log::debug!("opened warehouse at {db}");

    match mode.as_str() {
        "seed" => {
            let scale_name = string_arg(&args, "--scale", "small");
            let scale = ScaleConfig::named(&scale_name)?;

            println!("CartFlow refresh-runner — seed");
            println!("  db:     {db}");
            println!("  scale:  {scale_name}");
            println!("  seed:   {seed}");
            println!();

            let report = seed_warehouse(&store, &scale, seed, now, &ModelConfig::default())?;
            println!("Seed completed");
            println!("dim_geo: {}", report.geos);
            println!("dim_fc: {}", report.fulfillment_centers);
            println!("dim_customer: {}", report.customers);
            println!("dim_product: {}", report.products);
            println!("dim_date: {}", report.dates);
            println!("fact_orders: {}", report.orders);
            println!("fact_order_items: {}", report.order_items);
            println!("fact_payments: {}", report.payments);
            println!("fact_funnel_events: {}", report.funnel_events);
            println!("fact_shipments: {}", report.shipments);
            println!("fact_returns: {}", report.returns);
        }
        "refresh" => {
            let config = match args
                .windows(2)
                .find(|w| w[0] == "--config")
                .map(|w| w[1].clone())
            {
                Some(path) => RefreshConfig::from_json_file(&path)?,
                None => RefreshConfig {
                    source_name: string_arg(&args, "--source", "cartflow_incremental"),
                    seed,
                    delta: DeltaConfig {
                        new_orders: parse_arg(&args, "--new-orders", 1_500u32),
                        max_items_per_order: parse_arg(&args, "--max-items", 4u32),
                        update_orders: parse_arg(&args, "--update-orders", 250u32),
                        update_shipments: parse_arg(&args, "--update-shipments", 200u32),
                        late_returns: parse_arg(&args, "--late-returns", 120u32),
                    },
                    dim_delta: DimDeltaConfig {
                        new_customers: parse_arg(&args, "--new-customers", 200u32),
                        update_products: parse_arg(&args, "--update-products", 40u32),
                    },
                    model: ModelConfig::default(),
                },
            };

            println!("CartFlow refresh-runner — incremental refresh");
            println!("  db:     {db}");
            println!("  source: {}", config.source_name);
            println!("  seed:   {}", config.seed);
            println!();

            let orchestrator = RefreshOrchestrator::new(&store, config)?;
            let report = orchestrator.run(now)?;

            println!("Incremental refresh completed");
            for (table, counts) in report.counts.entries() {
                println!(
                    "{table}: inserted={}, updated={}",
                    counts.inserted, counts.updated
                );
            }
            println!(
                "watermark({}) = {}",
                report.source_name,
                report.watermark_to
            );
        }
        other => {
            anyhow::bail!("unknown --mode '{other}' (expected seed or refresh)");
        }
    }

    Ok(())
}

fn string_arg(args: &[String], flag: &str, default: &str) -> String {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
        .unwrap_or_else(|| default.to_string())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
