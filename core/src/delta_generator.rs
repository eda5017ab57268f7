//! Incremental delta generation: the update half of a refresh run.
//!
//! New orders reuse the fact generator; this module produces the rows
//! that *change* existing warehouse state — order status advances,
//! shipment delays, late returns with their payment and order flips —
//! plus the dimension deltas (new customers, product price drift).
//!
//! RULE: Candidate pools arrive pre-read from the warehouse in key order
//! and are sampled with the seeded stream. Selection never depends on
//! store iteration order, so a rerun with the same watermark reproduces
//! the same delta.

use crate::config::{DeltaConfig, DimDeltaConfig, ModelConfig, TimeWindow};
use crate::dimension_generator;
use crate::error::RefreshResult;
use crate::model::{
    round2, sla_breached, Customer, Geo, Order, OrderStatus, Payment, PaymentStatus, Product,
    Return, ReturnReason, RETURN_STATUS_REFUNDED,
};
use crate::model::Shipment;
use crate::rng::StreamRng;
use crate::types::EntityId;
use chrono::{Duration, NaiveDateTime};
use std::collections::HashMap;

/// Dimension-side delta for one refresh run.
#[derive(Debug, Clone, Default)]
pub struct DimDelta {
    pub new_customers: Vec<Customer>,
    pub product_updates: Vec<Product>,
}

/// A returnable order item joined with its owning order and payment.
/// The store excludes items that already have a return, so staging a
/// candidate can never violate the one-return-per-item invariant.
#[derive(Debug, Clone)]
pub struct ReturnCandidate {
    pub order_item_id: EntityId,
    pub product_id: EntityId,
    pub line_net_revenue: f64,
    pub order: Order,
    pub payment: Payment,
}

/// Candidate pools read from the warehouse, all ordered by key.
#[derive(Debug, Clone, Default)]
pub struct UpdateCandidates {
    pub delivered_orders: Vec<Order>,
    pub unbreached_shipments: Vec<Shipment>,
    pub returnable: Vec<ReturnCandidate>,
}

/// Fact-side update rows for one refresh run.
#[derive(Debug, Clone, Default)]
pub struct UpdateDelta {
    /// Status advances; RETURNED flips are ordered after COMPLETED
    /// advances so the terminal state wins key-level dedupe.
    pub order_updates: Vec<Order>,
    pub shipment_updates: Vec<Shipment>,
    pub late_returns: Vec<Return>,
    pub payment_updates: Vec<Payment>,
}

pub fn generate_dim_delta(
    cfg: &DimDeltaConfig,
    geos: &[Geo],
    max_customer_id: EntityId,
    products: &[Product],
    window: &TimeWindow,
    now: NaiveDateTime,
    model: &ModelConfig,
    rng: &mut StreamRng,
) -> RefreshResult<DimDelta> {
    let new_customers = if cfg.new_customers > 0 {
        dimension_generator::generate_customers(
            cfg.new_customers,
            max_customer_id + 1,
            geos,
            window,
            rng,
        )?
    } else {
        Vec::new()
    };

    let mut product_updates = Vec::new();
    for product in sample(rng, products, cfg.update_products as usize) {
        let drift = rng
            .normal(model.price_drift_mean, model.price_drift_std)
            .clamp(model.price_drift_floor, model.price_drift_ceiling);
        let mut updated = product.clone();
        updated.list_price = round2(updated.list_price * (1.0 + drift));
        updated.updated_at = now;
        product_updates.push(updated);
    }

    Ok(DimDelta {
        new_customers,
        product_updates,
    })
}

pub fn generate_update_delta(
    cfg: &DeltaConfig,
    candidates: &UpdateCandidates,
    now: NaiveDateTime,
    first_return_id: EntityId,
    model: &ModelConfig,
    rng: &mut StreamRng,
) -> UpdateDelta {
    let mut delta = UpdateDelta::default();

    // DELIVERED orders quietly complete.
    for order in sample(rng, &candidates.delivered_orders, cfg.update_orders as usize) {
        let mut updated = order.clone();
        updated.order_status = OrderStatus::Completed;
        updated.updated_at = now;
        delta.order_updates.push(updated);
    }

    // Some deliveries slip past their promise. The breach flag only ever
    // flips false-to-true.
    let mut delayed_orders: Vec<EntityId> = Vec::new();
    for shipment in sample(
        rng,
        &candidates.unbreached_shipments,
        cfg.update_shipments as usize,
    ) {
        let mut updated = shipment.clone();
        updated.delivered_dt = updated.delivered_dt + Duration::days(rng.range_i64(1, 3));
        updated.sla_breached_flag = sla_breached(updated.promised_delivery_dt, updated.delivered_dt);
        updated.updated_at = now;
        delayed_orders.push(updated.order_id);
        delta.shipment_updates.push(updated);
    }

    // Late returns against completed deliveries. Refunds aggregate per
    // payment; the owning order flips to RETURNED.
    let picked = sample(rng, &candidates.returnable, cfg.late_returns as usize);
    let mut next_return_id = first_return_id;
    let mut refunds_by_order: HashMap<EntityId, f64> = HashMap::new();
    let mut payment_by_order: HashMap<EntityId, Payment> = HashMap::new();
    let mut returned_orders: HashMap<EntityId, Order> = HashMap::new();

    for candidate in &picked {
        let refund_amount = round2(
            (candidate.line_net_revenue
                * rng.uniform(model.refund_fraction.0, model.refund_fraction.1))
            .max(0.0),
        );

        let mut reason = *rng.pick(&[
            ReturnReason::Damaged,
            ReturnReason::NotAsDescribed,
            ReturnReason::SizeIssue,
            ReturnReason::LateDelivery,
            ReturnReason::QualityIssue,
            ReturnReason::ChangedMind,
        ]);
        if delayed_orders.contains(&candidate.order.order_id) {
            reason = ReturnReason::LateDelivery;
        }

        delta.late_returns.push(Return {
            return_id: next_return_id,
            order_id: candidate.order.order_id,
            order_item_id: candidate.order_item_id,
            product_id: candidate.product_id,
            return_ts: now - Duration::days(rng.range_i64(0, 5)),
            return_reason: reason,
            refund_amount,
            return_status: RETURN_STATUS_REFUNDED.to_string(),
            restocked_flag: rng.chance(model.restock_rate),
            created_at: now,
            updated_at: now,
        });
        next_return_id += 1;

        *refunds_by_order.entry(candidate.order.order_id).or_insert(0.0) += refund_amount;
        payment_by_order
            .entry(candidate.order.order_id)
            .or_insert_with(|| candidate.payment.clone());
        returned_orders
            .entry(candidate.order.order_id)
            .or_insert_with(|| candidate.order.clone());
    }

    let mut refunded_order_ids: Vec<EntityId> = refunds_by_order.keys().copied().collect();
    refunded_order_ids.sort_unstable();

    for order_id in refunded_order_ids {
        if let Some(payment) = payment_by_order.remove(&order_id) {
            let mut updated = payment;
            updated.payment_status = PaymentStatus::Refunded;
            updated.refund_amount = round2(updated.refund_amount + refunds_by_order[&order_id]);
            updated.updated_at = now;
            delta.payment_updates.push(updated);
        }
        if let Some(order) = returned_orders.remove(&order_id) {
            let mut updated = order;
            updated.order_status = OrderStatus::Returned;
            updated.updated_at = now;
            delta.order_updates.push(updated);
        }
    }

    delta
}

/// Deterministic sample without replacement: partial Fisher-Yates over an
/// index vector, preserving nothing of the pool's order beyond the seed.
fn sample<T: Clone>(rng: &mut StreamRng, pool: &[T], k: usize) -> Vec<T> {
    let k = k.min(pool.len());
    let mut indices: Vec<usize> = (0..pool.len()).collect();
    for i in 0..k {
        let j = i + rng.next_u64_below((indices.len() - i) as u64) as usize;
        indices.swap(i, j);
    }
    indices[..k].iter().map(|&i| pool[i].clone()).collect()
}
