//! Refresh configuration.
//!
//! RULE: Configuration is constructed once at the entry point and passed
//! down. No generation function reads the environment, the clock, or any
//! other ambient state — scale, seed, window, and model knobs all arrive
//! as explicit parameters.

use crate::error::{RefreshError, RefreshResult};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Target entity counts for a full warehouse seed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScaleConfig {
    pub geos: u32,
    pub fulfillment_centers: u32,
    pub customers: u32,
    pub products: u32,
    pub orders: u32,
    pub max_items_per_order: u32,
}

impl ScaleConfig {
    /// Named presets matching the demo dataset tiers.
    pub fn named(name: &str) -> RefreshResult<Self> {
        match name {
            "small" => Ok(Self {
                geos: 20,
                fulfillment_centers: 12,
                customers: 25_000,
                products: 2_000,
                orders: 60_000,
                max_items_per_order: 5,
            }),
            "medium" => Ok(Self {
                geos: 35,
                fulfillment_centers: 20,
                customers: 90_000,
                products: 6_000,
                orders: 220_000,
                max_items_per_order: 6,
            }),
            "large" => Ok(Self {
                geos: 60,
                fulfillment_centers: 35,
                customers: 250_000,
                products: 15_000,
                orders: 700_000,
                max_items_per_order: 7,
            }),
            other => Err(RefreshError::config(format!(
                "unknown scale '{other}' (expected small, medium, or large)"
            ))),
        }
    }

    pub fn validate(&self) -> RefreshResult<()> {
        if self.geos == 0
            || self.fulfillment_centers == 0
            || self.customers == 0
            || self.products == 0
            || self.max_items_per_order == 0
        {
            return Err(RefreshError::config(
                "scale counts must all be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-run fact delta sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeltaConfig {
    pub new_orders: u32,
    pub max_items_per_order: u32,
    pub update_orders: u32,
    pub update_shipments: u32,
    pub late_returns: u32,
}

impl Default for DeltaConfig {
    fn default() -> Self {
        Self {
            new_orders: 1_500,
            max_items_per_order: 4,
            update_orders: 250,
            update_shipments: 200,
            late_returns: 120,
        }
    }
}

/// Per-run dimension delta sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DimDeltaConfig {
    pub new_customers: u32,
    pub update_products: u32,
}

impl Default for DimDeltaConfig {
    fn default() -> Self {
        Self {
            new_customers: 200,
            update_products: 40,
        }
    }
}

/// Behavioral and monetary model knobs. The bounds here are tunables, not
/// contracts — tests pin them through `RefreshConfig::default_test()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Order status weights for CREATED / CANCELLED / DELIVERED / COMPLETED.
    pub order_status_weights: [f64; 4],
    pub tax_rate: f64,
    pub base_discount: (f64, f64),
    /// Extra per-line discount in November/December.
    pub peak_discount_bonus: (f64, f64),
    /// Extra per-line discount in June/July.
    pub midyear_discount_bonus: (f64, f64),
    /// Extra per-line discount for promotion-heavy categories.
    pub category_discount_bonus: (f64, f64),
    pub discount_cap: f64,
    /// COD orders cancelled via return-to-origin.
    pub cod_rto_rate: f64,
    pub card_fee_rate: (f64, f64),
    pub upi_fee_rate: (f64, f64),
    pub max_fixed_fee: f64,
    pub promised_days: (i64, i64),
    /// Pool of extra delivery days, weighted toward on-time.
    pub delivery_delay_pool: Vec<i64>,
    pub shipping_cost_mu: f64,
    pub shipping_cost_sigma: f64,
    pub base_return_rate: f64,
    pub breach_return_bonus: f64,
    pub size_issue_override_rate: f64,
    pub late_delivery_override_rate: f64,
    pub refund_fraction: (f64, f64),
    pub chargeback_rate: f64,
    pub restock_rate: f64,
    pub add_to_cart_rate: f64,
    /// Fraction of sessions carrying a known customer id.
    pub identified_session_rate: f64,
    /// Browse-only and cart-abandonment sessions per seeded order.
    pub browse_session_ratio: f64,
    pub abandon_session_ratio: f64,
    pub max_extra_sessions: u32,
    pub price_drift_mean: f64,
    pub price_drift_std: f64,
    pub price_drift_floor: f64,
    pub price_drift_ceiling: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            order_status_weights: [0.05, 0.08, 0.52, 0.35],
            tax_rate: 0.07,
            base_discount: (0.02, 0.18),
            peak_discount_bonus: (0.05, 0.18),
            midyear_discount_bonus: (0.02, 0.06),
            category_discount_bonus: (0.02, 0.08),
            discount_cap: 0.55,
            cod_rto_rate: 0.03,
            card_fee_rate: (0.015, 0.025),
            upi_fee_rate: (0.010, 0.016),
            max_fixed_fee: 6.0,
            promised_days: (2, 6),
            delivery_delay_pool: vec![0, 0, 0, 1, 1, 2, 3],
            shipping_cost_mu: 2.1,
            shipping_cost_sigma: 0.35,
            base_return_rate: 0.028,
            breach_return_bonus: 0.035,
            size_issue_override_rate: 0.45,
            late_delivery_override_rate: 0.40,
            refund_fraction: (0.85, 1.0),
            chargeback_rate: 0.004,
            restock_rate: 0.65,
            add_to_cart_rate: 0.92,
            identified_session_rate: 0.62,
            browse_session_ratio: 0.18,
            abandon_session_ratio: 0.22,
            max_extra_sessions: 150_000,
            price_drift_mean: 0.01,
            price_drift_std: 0.02,
            price_drift_floor: -0.03,
            price_drift_ceiling: 0.06,
        }
    }
}

/// The half-open time range a batch of rows is generated into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> RefreshResult<Self> {
        if start >= end {
            return Err(RefreshError::config(format!(
                "time window start {start} is not before end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Window covering the `days` days ending at `end`.
    pub fn lookback_days(end: NaiveDateTime, days: i64) -> Self {
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub fn seconds(&self) -> i64 {
        (self.end - self.start).num_seconds().max(1)
    }
}

/// Everything one incremental refresh invocation needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    pub source_name: String,
    pub seed: u64,
    #[serde(default)]
    pub delta: DeltaConfig,
    #[serde(default)]
    pub dim_delta: DimDeltaConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

impl RefreshConfig {
    pub fn new(source_name: impl Into<String>, seed: u64) -> Self {
        Self {
            source_name: source_name.into(),
            seed,
            delta: DeltaConfig::default(),
            dim_delta: DimDeltaConfig::default(),
            model: ModelConfig::default(),
        }
    }

    /// Load from a JSON file. Used by the runner's `--config` flag.
    pub fn from_json_file(path: &str) -> RefreshResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RefreshError::config(format!("cannot read {path}: {e}")))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RefreshResult<()> {
        if self.source_name.is_empty() {
            return Err(RefreshError::config("source_name must not be empty"));
        }
        if self.delta.new_orders == 0 {
            return Err(RefreshError::config(
                "delta.new_orders must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Small config for unit and integration tests.
    pub fn default_test() -> Self {
        Self {
            source_name: "cartflow_test".into(),
            seed: 42,
            delta: DeltaConfig {
                new_orders: 40,
                max_items_per_order: 4,
                update_orders: 10,
                update_shipments: 8,
                late_returns: 5,
            },
            dim_delta: DimDeltaConfig {
                new_customers: 10,
                update_products: 5,
            },
            model: ModelConfig::default(),
        }
    }
}
