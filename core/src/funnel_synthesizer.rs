//! Behavioral event synthesis: one shopping session in, an ordered
//! funnel event sequence out.
//!
//! RULE: A stage is never emitted without all causally-prior stages
//! already present in the same session, timestamps are strictly
//! increasing, and PAYMENT_FAILED / ORDER_PLACED are mutually exclusive
//! terminals. Callers declare the session outcome up front; the
//! synthesizer only decides the shape of the path to it.

use crate::config::ModelConfig;
use crate::model::{Device, FailureReason, FunnelEvent, FunnelStage, SalesChannel};
use crate::rng::StreamRng;
use crate::types::EntityId;
use chrono::{Duration, NaiveDateTime};

/// Inter-event gap bounds in seconds, per transition.
const VIEW_GAP: (i64, i64) = (5, 40);
const ADD_GAP: (i64, i64) = (8, 55);
const VIEW_CART_GAP: (i64, i64) = (10, 60);
const CHECKOUT_GAP: (i64, i64) = (12, 80);
const PAYMENT_GAP: (i64, i64) = (10, 75);
const TERMINAL_GAP: (i64, i64) = (5, 45);

/// How far an abandoning session tends to get.
const ABANDON_VIEW_CART_RATE: f64 = 0.65;
const ABANDON_CHECKOUT_RATE: f64 = 0.35;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Session tied to an order; ends in ORDER_PLACED or PAYMENT_FAILED.
    Purchase {
        order_id: EntityId,
        failure_reason: Option<FailureReason>,
    },
    /// Products added to cart, checkout never completed.
    CartAbandoned,
    /// Products viewed, nothing added.
    BrowseOnly,
}

#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub session_id: String,
    pub customer_id: Option<EntityId>,
    pub channel: SalesChannel,
    pub device: Device,
    pub start_ts: NaiveDateTime,
    /// Products viewed, in order. Must be non-empty.
    pub viewed_products: Vec<EntityId>,
    /// Products considered for the cart; for Purchase sessions these are
    /// the order's items.
    pub cart_products: Vec<EntityId>,
    pub outcome: SessionOutcome,
}

/// Expand a session plan into its funnel events. `next_event_id` is the
/// id cursor shared across the whole generation batch.
pub fn synthesize(
    plan: &SessionPlan,
    model: &ModelConfig,
    rng: &mut StreamRng,
    next_event_id: &mut EntityId,
) -> Vec<FunnelEvent> {
    debug_assert!(!plan.viewed_products.is_empty(), "session must view something");

    let mut events = Vec::new();
    let mut t = plan.start_ts;

    let mut push = |events: &mut Vec<FunnelEvent>,
                    t: NaiveDateTime,
                    stage: FunnelStage,
                    product_id: Option<EntityId>,
                    order_id: Option<EntityId>,
                    failure_reason: Option<FailureReason>| {
        events.push(FunnelEvent {
            event_id: *next_event_id,
            event_ts: t,
            session_id: plan.session_id.clone(),
            customer_id: plan.customer_id,
            product_id,
            order_id,
            stage,
            channel: plan.channel,
            device: plan.device,
            failure_reason,
        });
        *next_event_id += 1;
    };

    for &pid in dedup_keep_order(&plan.viewed_products).iter() {
        let repeats = rng.range_i64(1, 3);
        for _ in 0..repeats {
            t = t + gap(rng, VIEW_GAP);
            push(&mut events, t, FunnelStage::ViewProduct, Some(pid), None, None);
        }
    }

    if matches!(plan.outcome, SessionOutcome::BrowseOnly) {
        return events;
    }

    // Add-to-cart per distinct cart product. A purchase session must add
    // at least one item or the cart stages downstream would be orphaned.
    let cart = dedup_keep_order(&plan.cart_products);
    let mut added = 0usize;
    for &pid in cart.iter() {
        if rng.chance(model.add_to_cart_rate) {
            t = t + gap(rng, ADD_GAP);
            push(&mut events, t, FunnelStage::AddToCart, Some(pid), None, None);
            added += 1;
        }
    }
    if added == 0 {
        if let Some(&pid) = cart.first() {
            t = t + gap(rng, ADD_GAP);
            push(&mut events, t, FunnelStage::AddToCart, Some(pid), None, None);
        } else {
            // Nothing to add: the session can only be a browse.
            return events;
        }
    }

    match &plan.outcome {
        SessionOutcome::BrowseOnly => unreachable!("handled above"),
        SessionOutcome::CartAbandoned => {
            if rng.chance(ABANDON_VIEW_CART_RATE) {
                t = t + gap(rng, VIEW_CART_GAP);
                push(&mut events, t, FunnelStage::ViewCart, None, None, None);
                if rng.chance(ABANDON_CHECKOUT_RATE) {
                    t = t + gap(rng, CHECKOUT_GAP);
                    push(&mut events, t, FunnelStage::CheckoutStarted, None, None, None);
                }
            }
        }
        SessionOutcome::Purchase {
            order_id,
            failure_reason,
        } => {
            t = t + gap(rng, VIEW_CART_GAP);
            push(&mut events, t, FunnelStage::ViewCart, None, None, None);
            t = t + gap(rng, CHECKOUT_GAP);
            push(&mut events, t, FunnelStage::CheckoutStarted, None, None, None);
            t = t + gap(rng, PAYMENT_GAP);
            push(
                &mut events,
                t,
                FunnelStage::PaymentAttempted,
                None,
                Some(*order_id),
                None,
            );
            t = t + gap(rng, TERMINAL_GAP);
            match failure_reason {
                Some(reason) => push(
                    &mut events,
                    t,
                    FunnelStage::PaymentFailed,
                    None,
                    Some(*order_id),
                    Some(*reason),
                ),
                None => push(
                    &mut events,
                    t,
                    FunnelStage::OrderPlaced,
                    None,
                    Some(*order_id),
                    None,
                ),
            }
        }
    }

    events
}

fn gap(rng: &mut StreamRng, bounds: (i64, i64)) -> Duration {
    Duration::seconds(rng.range_i64(bounds.0, bounds.1))
}

fn dedup_keep_order(ids: &[EntityId]) -> Vec<EntityId> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
