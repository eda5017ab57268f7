//! The staging-and-merge engine.
//!
//! RULE: Dimensions merge before the facts that reference them, so the
//! warehouse is referentially consistent at every intermediate point of
//! a run. The entity order below is fixed — append new kinds, never
//! reorder.
//!
//! Before staging, every candidate batch is deduplicated by primary key
//! keeping the most-recently-updated row, so a single run never issues
//! two conflicting writes to the same key.

use crate::error::RefreshResult;
use crate::model::{Customer, FunnelEvent, Order, OrderItem, Payment, Product, Return, Shipment};
use crate::store::WarehouseStore;
use crate::types::EntityId;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;

/// Warehouse entities that participate in staged merges, in dependency
/// order: dimensions first, then facts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    DimCustomer,
    DimProduct,
    FactOrders,
    FactOrderItems,
    FactPayments,
    FactFunnelEvents,
    FactShipments,
    FactReturns,
}

pub const MERGE_ORDER: [EntityKind; 8] = [
    EntityKind::DimCustomer,
    EntityKind::DimProduct,
    EntityKind::FactOrders,
    EntityKind::FactOrderItems,
    EntityKind::FactPayments,
    EntityKind::FactFunnelEvents,
    EntityKind::FactShipments,
    EntityKind::FactReturns,
];

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            Self::DimCustomer => "dim_customer",
            Self::DimProduct => "dim_product",
            Self::FactOrders => "fact_orders",
            Self::FactOrderItems => "fact_order_items",
            Self::FactPayments => "fact_payments",
            Self::FactFunnelEvents => "fact_funnel_events",
            Self::FactShipments => "fact_shipments",
            Self::FactReturns => "fact_returns",
        }
    }

    pub fn is_dimension(&self) -> bool {
        matches!(self, Self::DimCustomer | Self::DimProduct)
    }
}

/// Insert/update counts returned by one entity's merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeCounts {
    pub inserted: u64,
    pub updated: u64,
}

/// Per-entity counts for a whole refresh run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RefreshCounts {
    pub dim_customer: MergeCounts,
    pub dim_product: MergeCounts,
    pub fact_orders: MergeCounts,
    pub fact_order_items: MergeCounts,
    pub fact_payments: MergeCounts,
    pub fact_funnel_events: MergeCounts,
    pub fact_shipments: MergeCounts,
    pub fact_returns: MergeCounts,
}

impl RefreshCounts {
    pub fn get(&self, kind: EntityKind) -> MergeCounts {
        match kind {
            EntityKind::DimCustomer => self.dim_customer,
            EntityKind::DimProduct => self.dim_product,
            EntityKind::FactOrders => self.fact_orders,
            EntityKind::FactOrderItems => self.fact_order_items,
            EntityKind::FactPayments => self.fact_payments,
            EntityKind::FactFunnelEvents => self.fact_funnel_events,
            EntityKind::FactShipments => self.fact_shipments,
            EntityKind::FactReturns => self.fact_returns,
        }
    }

    /// (table, counts) pairs in merge order, for reports.
    pub fn entries(&self) -> Vec<(&'static str, MergeCounts)> {
        MERGE_ORDER
            .iter()
            .map(|kind| (kind.table(), self.get(*kind)))
            .collect()
    }

    pub fn total_inserted(&self) -> u64 {
        MERGE_ORDER.iter().map(|k| self.get(*k).inserted).sum()
    }

    pub fn total_updated(&self) -> u64 {
        MERGE_ORDER.iter().map(|k| self.get(*k).updated).sum()
    }
}

/// Dimension-side staged batch.
#[derive(Debug, Clone, Default)]
pub struct DimBatch {
    pub customers: Vec<Customer>,
    pub products: Vec<Product>,
}

impl DimBatch {
    pub fn dedupe(&mut self) {
        dedupe_latest(&mut self.customers, |c| c.customer_id, |c| c.updated_at);
        dedupe_latest(&mut self.products, |p| p.product_id, |p| p.updated_at);
    }
}

/// Fact-side staged batch: new rows and update rows combined.
#[derive(Debug, Clone, Default)]
pub struct FactBatchDelta {
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
    pub funnel_events: Vec<FunnelEvent>,
    pub shipments: Vec<Shipment>,
    pub returns: Vec<Return>,
}

impl FactBatchDelta {
    pub fn dedupe(&mut self) {
        dedupe_latest(&mut self.orders, |o| o.order_id, |o| o.updated_at);
        dedupe_latest(&mut self.items, |i| i.order_item_id, |i| i.updated_at);
        dedupe_latest(&mut self.payments, |p| p.payment_id, |p| p.updated_at);
        dedupe_latest(&mut self.funnel_events, |e| e.event_id, |e| e.event_ts);
        dedupe_latest(&mut self.shipments, |s| s.shipment_id, |s| s.updated_at);
        dedupe_latest(&mut self.returns, |r| r.return_id, |r| r.updated_at);
    }
}

/// Keep one row per key: the one with the latest update timestamp. On a
/// tie the later element wins, so callers can order same-instant writes
/// by appending the one that should stick last.
pub fn dedupe_latest<T>(
    rows: &mut Vec<T>,
    key: impl Fn(&T) -> EntityId,
    updated: impl Fn(&T) -> NaiveDateTime,
) {
    let mut winner: HashMap<EntityId, usize> = HashMap::new();
    for (index, row) in rows.iter().enumerate() {
        let k = key(row);
        match winner.get(&k) {
            Some(&existing) if updated(&rows[existing]) > updated(row) => {}
            _ => {
                winner.insert(k, index);
            }
        }
    }
    let mut index = 0;
    rows.retain(|row| {
        let keep = winner.get(&key(row)) == Some(&index);
        index += 1;
        keep
    });
}

/// Drives staging and merging against the store, honoring the
/// dimension-before-fact ordering.
pub struct MergeEngine<'a> {
    store: &'a WarehouseStore,
}

impl<'a> MergeEngine<'a> {
    pub fn new(store: &'a WarehouseStore) -> Self {
        Self { store }
    }

    pub fn stage_and_merge_dimensions(
        &self,
        batch: &DimBatch,
        counts: &mut RefreshCounts,
    ) -> RefreshResult<()> {
        self.store.stage_customers(&batch.customers)?;
        self.store.stage_products(&batch.products)?;
        counts.dim_customer = self.store.merge_customers()?;
        counts.dim_product = self.store.merge_products()?;
        log::debug!(
            "dim merge: customers +{}/~{}, products +{}/~{}",
            counts.dim_customer.inserted,
            counts.dim_customer.updated,
            counts.dim_product.inserted,
            counts.dim_product.updated,
        );
        Ok(())
    }

    pub fn stage_and_merge_facts(
        &self,
        batch: &FactBatchDelta,
        counts: &mut RefreshCounts,
    ) -> RefreshResult<()> {
        self.store.stage_orders(&batch.orders)?;
        self.store.stage_order_items(&batch.items)?;
        self.store.stage_payments(&batch.payments)?;
        self.store.stage_funnel_events(&batch.funnel_events)?;
        self.store.stage_shipments(&batch.shipments)?;
        self.store.stage_returns(&batch.returns)?;

        counts.fact_orders = self.store.merge_orders()?;
        counts.fact_order_items = self.store.merge_order_items()?;
        counts.fact_payments = self.store.merge_payments()?;
        counts.fact_funnel_events = self.store.merge_funnel_events()?;
        counts.fact_shipments = self.store.merge_shipments()?;
        counts.fact_returns = self.store.merge_returns()?;
        Ok(())
    }
}
