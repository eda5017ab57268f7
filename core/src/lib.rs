//! cartflow-core — the incremental warehouse refresh engine behind the
//! CartFlow demo storefront.
//!
//! Two responsibilities live here:
//!   1. Deterministic generation of a statistically realistic synthetic
//!      order/session dataset (dimensions, purchase funnel, facts).
//!   2. Bounded, idempotent incremental refresh of an existing warehouse
//!      via a watermark-driven staging-and-merge protocol.
//!
//! The storefront API, admin dashboards, and BI exports consume the
//! warehouse read-only and are not part of this crate.

pub mod catalog;
pub mod config;
pub mod delta_generator;
pub mod dimension_generator;
pub mod error;
pub mod fact_generator;
pub mod funnel_synthesizer;
pub mod merge;
pub mod model;
pub mod refresh;
pub mod rng;
pub mod store;
pub mod types;
