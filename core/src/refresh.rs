//! The refresh orchestrator — one linear flow per invocation:
//!
//!   READ_WATERMARK -> GENERATE_DIM_DELTA -> MERGE_DIM ->
//!   GENERATE_FACT_DELTA -> MERGE_FACT -> ADVANCE_WATERMARK -> DONE
//!
//! RULES:
//!   - One SQLite transaction per run. Any error before commit rolls
//!     back every staged and merged row and leaves the watermark
//!     untouched; the run is safe to repeat because the merges are
//!     idempotent under key.
//!   - No branching retries, no per-row salvage, no partial success.
//!   - Concurrent runs against the same source name are the caller's
//!     problem to prevent: there is deliberately no cross-run lock here.
//!
//! This module also owns the initial bulk load that bootstraps an empty
//! warehouse.

use crate::config::{ModelConfig, RefreshConfig, ScaleConfig, TimeWindow};
use crate::delta_generator::{self, UpdateCandidates};
use crate::dimension_generator::{self, CUSTOMER_LOOKBACK_DAYS};
use crate::error::{RefreshError, RefreshResult};
use crate::fact_generator::{DimensionSnapshot, FactGenerator, IdCursors};
use crate::merge::{DimBatch, FactBatchDelta, MergeEngine, RefreshCounts};
use crate::rng::{RngBank, StreamSlot};
use crate::store::WarehouseStore;
use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

/// First-run watermark default: now minus this lookback.
pub const DEFAULT_WATERMARK_LOOKBACK_MINUTES: i64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshPhase {
    ReadWatermark,
    GenerateDimDelta,
    MergeDim,
    GenerateFactDelta,
    MergeFact,
    AdvanceWatermark,
}

impl std::fmt::Display for RefreshPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ReadWatermark => "READ_WATERMARK",
            Self::GenerateDimDelta => "GENERATE_DIM_DELTA",
            Self::MergeDim => "MERGE_DIM",
            Self::GenerateFactDelta => "GENERATE_FACT_DELTA",
            Self::MergeFact => "MERGE_FACT",
            Self::AdvanceWatermark => "ADVANCE_WATERMARK",
        };
        f.write_str(name)
    }
}

/// What one successful refresh run did.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub refresh_id: Uuid,
    pub source_name: String,
    pub watermark_from: NaiveDateTime,
    pub watermark_to: NaiveDateTime,
    pub counts: RefreshCounts,
}

pub struct RefreshOrchestrator<'a> {
    store: &'a WarehouseStore,
    config: RefreshConfig,
}

impl<'a> RefreshOrchestrator<'a> {
    pub fn new(store: &'a WarehouseStore, config: RefreshConfig) -> RefreshResult<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Run one incremental refresh with `now` as the batch boundary.
    pub fn run(&self, now: NaiveDateTime) -> RefreshResult<RefreshReport> {
        let refresh_id = Uuid::new_v4();
        log::info!(
            "refresh {refresh_id} source={} seed={} starting",
            self.config.source_name,
            self.config.seed
        );

        // The watermark read sits outside the run transaction so a new
        // source's default boundary is durable even if this run dies.
        let since = phase(RefreshPhase::ReadWatermark, || {
            self.store.get_or_init_watermark(
                &self.config.source_name,
                now - Duration::minutes(DEFAULT_WATERMARK_LOOKBACK_MINUTES),
            )
        })?;

        self.store.begin_run()?;
        match self.run_phases(since, now) {
            Ok(counts) => {
                self.store.commit_run()?;
                log::info!(
                    "refresh {refresh_id} done: +{} rows, ~{} rows, watermark -> {now}",
                    counts.total_inserted(),
                    counts.total_updated()
                );
                Ok(RefreshReport {
                    refresh_id,
                    source_name: self.config.source_name.clone(),
                    watermark_from: since,
                    watermark_to: now,
                    counts,
                })
            }
            Err(error) => {
                // Roll back everything staged or merged this run; the
                // rollback error (if any) is secondary to the cause.
                let _ = self.store.rollback_run();
                log::warn!("refresh {refresh_id} aborted: {error}");
                Err(error)
            }
        }
    }

    fn run_phases(&self, since: NaiveDateTime, now: NaiveDateTime) -> RefreshResult<RefreshCounts> {
        let engine = MergeEngine::new(self.store);
        let mut counts = RefreshCounts::default();

        let window = TimeWindow::new(since, now)?;

        // GENERATE_DIM_DELTA
        let dim_batch = phase(RefreshPhase::GenerateDimDelta, || {
            self.store.clear_staging()?;
            self.generate_dim_batch(&window, now)
        })?;

        // MERGE_DIM
        phase(RefreshPhase::MergeDim, || {
            engine.stage_and_merge_dimensions(&dim_batch, &mut counts)
        })?;

        // GENERATE_FACT_DELTA — reads dimensions after the dim merge so
        // new customers can place orders in the same run.
        let fact_batch = phase(RefreshPhase::GenerateFactDelta, || {
            self.generate_fact_batch(&window, now)
        })?;

        // MERGE_FACT
        phase(RefreshPhase::MergeFact, || {
            engine.stage_and_merge_facts(&fact_batch, &mut counts)
        })?;

        // ADVANCE_WATERMARK — inside the transaction: the boundary and
        // the rows it covers become durable together.
        phase(RefreshPhase::AdvanceWatermark, || {
            self.store.set_watermark(&self.config.source_name, now)
        })?;

        Ok(counts)
    }

    /// Dimension-side candidate batch for the window, deduped and ready
    /// to stage. Pure given the warehouse state it reads.
    pub fn generate_dim_batch(
        &self,
        window: &TimeWindow,
        now: NaiveDateTime,
    ) -> RefreshResult<DimBatch> {
        let config = &self.config;
        let bank = RngBank::new(config.seed);
        let geos = self.store.all_geos()?;
        let max_customer_id = self.store.max_customer_id()?;
        let products = self.store.all_products()?;
        let mut rng = bank.stream(StreamSlot::DimDelta);
        let delta = delta_generator::generate_dim_delta(
            &config.dim_delta,
            &geos,
            max_customer_id,
            &products,
            window,
            now,
            &config.model,
            &mut rng,
        )?;
        let mut batch = DimBatch {
            customers: delta.new_customers,
            products: delta.product_updates,
        };
        batch.dedupe();
        Ok(batch)
    }

    /// Fact-side candidate batch: new orders plus update rows, deduped
    /// by key with the terminal writes winning. Pure given the warehouse
    /// state it reads, so re-running against an unchanged warehouse
    /// reproduces the identical batch.
    pub fn generate_fact_batch(
        &self,
        window: &TimeWindow,
        now: NaiveDateTime,
    ) -> RefreshResult<FactBatchDelta> {
        let config = &self.config;
        let bank = RngBank::new(config.seed);
        let snapshot = self.store.dimension_snapshot()?;
        let mut ids = self.store.fact_id_cursors()?;
        let generator = FactGenerator::new(&snapshot, &config.model);

        let new_facts = generator.generate_orders(
            config.delta.new_orders,
            config.delta.max_items_per_order,
            window,
            false,
            &mut ids,
            &bank,
        )?;

        let candidates = UpdateCandidates {
            delivered_orders: self.store.delivered_orders()?,
            unbreached_shipments: self.store.unbreached_shipments()?,
            returnable: self.store.returnable_candidates()?,
        };
        let mut update_rng = bank.stream(StreamSlot::UpdateDelta);
        let updates = delta_generator::generate_update_delta(
            &config.delta,
            &candidates,
            now,
            ids.next_return_id,
            &config.model,
            &mut update_rng,
        );

        let mut batch = FactBatchDelta {
            orders: new_facts.orders,
            items: new_facts.items,
            payments: new_facts.payments,
            funnel_events: new_facts.funnel_events,
            shipments: new_facts.shipments,
            returns: updates.late_returns,
        };
        batch.orders.extend(updates.order_updates);
        batch.payments.extend(updates.payment_updates);
        batch.shipments.extend(updates.shipment_updates);
        batch.dedupe();
        Ok(batch)
    }
}

fn phase<T>(
    phase: RefreshPhase,
    body: impl FnOnce() -> RefreshResult<T>,
) -> RefreshResult<T> {
    body().map_err(|source| RefreshError::Phase {
        phase,
        source: Box::new(source),
    })
}

// ── Initial load ───────────────────────────────────────────────────

/// Row counts written by the initial load.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedReport {
    pub geos: usize,
    pub fulfillment_centers: usize,
    pub customers: usize,
    pub products: usize,
    pub dates: usize,
    pub orders: usize,
    pub order_items: usize,
    pub payments: usize,
    pub shipments: usize,
    pub returns: usize,
    pub funnel_events: usize,
}

/// Generate and bulk-load a complete synthetic warehouse into an empty
/// store, atomically.
pub fn seed_warehouse(
    store: &WarehouseStore,
    scale: &ScaleConfig,
    seed: u64,
    now: NaiveDateTime,
    model: &ModelConfig,
) -> RefreshResult<SeedReport> {
    scale.validate()?;
    if store.table_count("dim_geo")? > 0 {
        return Err(RefreshError::config(
            "warehouse is already seeded; refusing to load over existing dimensions",
        ));
    }

    let bank = RngBank::new(seed);
    let mut dim_rng = bank.stream(StreamSlot::Dimension);
    let dims = dimension_generator::generate(scale, now, &mut dim_rng)?;

    let window = TimeWindow::lookback_days(now, CUSTOMER_LOOKBACK_DAYS);
    let snapshot = DimensionSnapshot::from_dimension_set(&dims);
    let generator = FactGenerator::new(&snapshot, model);
    let mut ids = IdCursors::starting_at_one();

    let mut batch = generator.generate_orders(
        scale.orders,
        scale.max_items_per_order,
        &window,
        true,
        &mut ids,
        &bank,
    )?;

    let browse = ((scale.orders as f64 * model.browse_session_ratio) as u32)
        .min(model.max_extra_sessions);
    let abandon = ((scale.orders as f64 * model.abandon_session_ratio) as u32)
        .min(model.max_extra_sessions);
    let mut session_rng = bank.stream(StreamSlot::ExtraSessions);
    batch.funnel_events.extend(generator.generate_extra_sessions(
        browse,
        abandon,
        &window,
        &mut ids,
        &mut session_rng,
    )?);

    store.begin_run()?;
    let loaded = (|| -> RefreshResult<()> {
        store.insert_geos(&dims.geos)?;
        store.insert_fulfillment_centers(&dims.fulfillment_centers)?;
        store.insert_customers(&dims.customers)?;
        store.insert_products(&dims.products)?;
        store.insert_date_dim(&dims.dates)?;
        store.insert_orders(&batch.orders)?;
        store.insert_order_items(&batch.items)?;
        store.insert_payments(&batch.payments)?;
        store.insert_funnel_events(&batch.funnel_events)?;
        store.insert_shipments(&batch.shipments)?;
        store.insert_returns(&batch.returns)?;
        Ok(())
    })();
    match loaded {
        Ok(()) => store.commit_run()?,
        Err(error) => {
            let _ = store.rollback_run();
            return Err(error);
        }
    }

    log::info!(
        "seeded warehouse: {} customers, {} products, {} orders, {} funnel events",
        dims.customers.len(),
        dims.products.len(),
        batch.orders.len(),
        batch.funnel_events.len()
    );

    Ok(SeedReport {
        geos: dims.geos.len(),
        fulfillment_centers: dims.fulfillment_centers.len(),
        customers: dims.customers.len(),
        products: dims.products.len(),
        dates: dims.dates.len(),
        orders: batch.orders.len(),
        order_items: batch.items.len(),
        payments: batch.payments.len(),
        shipments: batch.shipments.len(),
        returns: batch.returns.len(),
        funnel_events: batch.funnel_events.len(),
    })
}
