//! Order and fact generation: orders, line items, payments, shipments,
//! and returns, derived from funnel outcomes with seasonal and
//! category-based discount/return modeling.
//!
//! One generator serves both the initial warehouse seed and the
//! incremental new-order delta — the only differences are the id cursors
//! it starts from and whether returns are produced inline.
//!
//! RULE: Missing dimension lookups fail the batch. A fact row is never
//! emitted with placeholder values.

use crate::catalog;
use crate::config::{ModelConfig, TimeWindow};
use crate::dimension_generator::DimensionSet;
use crate::error::{RefreshError, RefreshResult};
use crate::funnel_synthesizer::{self, SessionOutcome, SessionPlan};
use crate::model::{
    round2, sla_breached, Device, FailureReason, FunnelEvent, Order, OrderItem, OrderStatus,
    Payment, PaymentMethod, PaymentStatus, Return, SalesChannel, Shipment,
    RETURN_STATUS_REFUNDED,
};
use crate::rng::{RngBank, StreamRng, StreamSlot};
use crate::types::EntityId;
use chrono::{Datelike, Duration, NaiveDateTime};
use std::collections::HashMap;

/// Slim dimension projections the fact generator needs. Read either from
/// a freshly generated `DimensionSet` or from the live warehouse.
#[derive(Debug, Clone)]
pub struct DimensionSnapshot {
    pub customers: Vec<CustomerRef>,
    pub geo_currency: HashMap<EntityId, String>,
    pub products: Vec<ProductRef>,
    pub fc_ids: Vec<EntityId>,
}

#[derive(Debug, Clone)]
pub struct CustomerRef {
    pub customer_id: EntityId,
    pub geo_id: EntityId,
}

#[derive(Debug, Clone)]
pub struct ProductRef {
    pub product_id: EntityId,
    pub unit_cost: f64,
    pub list_price: f64,
    pub category_l1: String,
}

impl DimensionSnapshot {
    pub fn from_dimension_set(dims: &DimensionSet) -> Self {
        Self {
            customers: dims
                .customers
                .iter()
                .map(|c| CustomerRef {
                    customer_id: c.customer_id,
                    geo_id: c.geo_id,
                })
                .collect(),
            geo_currency: dims
                .geos
                .iter()
                .map(|g| (g.geo_id, g.currency.clone()))
                .collect(),
            products: dims
                .products
                .iter()
                .map(|p| ProductRef {
                    product_id: p.product_id,
                    unit_cost: p.unit_cost,
                    list_price: p.list_price,
                    category_l1: p.category_l1.clone(),
                })
                .collect(),
            fc_ids: dims.fulfillment_centers.iter().map(|f| f.fc_id).collect(),
        }
    }

    fn require_populated(&self) -> RefreshResult<()> {
        if self.customers.is_empty() {
            return Err(RefreshError::missing("customer", "no customers available"));
        }
        if self.products.is_empty() {
            return Err(RefreshError::missing("product", "no products available"));
        }
        if self.fc_ids.is_empty() {
            return Err(RefreshError::missing(
                "fulfillment_center",
                "no fulfillment centers available",
            ));
        }
        Ok(())
    }
}

/// Next unassigned id per fact entity. Continues from the warehouse's
/// current maximums on incremental runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdCursors {
    pub next_order_id: EntityId,
    pub next_order_item_id: EntityId,
    pub next_payment_id: EntityId,
    pub next_shipment_id: EntityId,
    pub next_return_id: EntityId,
    pub next_event_id: EntityId,
}

impl IdCursors {
    pub fn starting_at_one() -> Self {
        Self {
            next_order_id: 1,
            next_order_item_id: 1,
            next_payment_id: 1,
            next_shipment_id: 1,
            next_return_id: 1,
            next_event_id: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FactBatch {
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
    pub payments: Vec<Payment>,
    pub shipments: Vec<Shipment>,
    pub returns: Vec<Return>,
    pub funnel_events: Vec<FunnelEvent>,
}

pub struct FactGenerator<'a> {
    dims: &'a DimensionSnapshot,
    model: &'a ModelConfig,
}

impl<'a> FactGenerator<'a> {
    pub fn new(dims: &'a DimensionSnapshot, model: &'a ModelConfig) -> Self {
        Self { dims, model }
    }

    /// Generate `count` orders with their items, payments, funnel
    /// sessions, shipments, and (optionally) returns.
    pub fn generate_orders(
        &self,
        count: u32,
        max_items_per_order: u32,
        window: &TimeWindow,
        include_returns: bool,
        ids: &mut IdCursors,
        bank: &RngBank,
    ) -> RefreshResult<FactBatch> {
        self.dims.require_populated()?;
        if max_items_per_order == 0 {
            return Err(RefreshError::config("max_items_per_order must be positive"));
        }

        let mut order_rng = bank.stream(StreamSlot::Order);
        let mut funnel_rng = bank.stream(StreamSlot::Funnel);
        let mut logistics_rng = bank.stream(StreamSlot::Logistics);
        let mut returns_rng = bank.stream(StreamSlot::Returns);

        let mut batch = FactBatch::default();

        for _ in 0..count {
            self.generate_one_order(
                max_items_per_order,
                window,
                ids,
                &mut order_rng,
                &mut funnel_rng,
                &mut batch,
            )?;
        }

        self.generate_shipments(ids, &mut logistics_rng, &mut batch);

        if include_returns {
            self.generate_returns(ids, &mut returns_rng, &mut batch);
        }

        Ok(batch)
    }

    fn generate_one_order(
        &self,
        max_items_per_order: u32,
        window: &TimeWindow,
        ids: &mut IdCursors,
        rng: &mut StreamRng,
        funnel_rng: &mut StreamRng,
        batch: &mut FactBatch,
    ) -> RefreshResult<()> {
        let model = self.model;
        let order_id = ids.next_order_id;
        ids.next_order_id += 1;

        let customer = rng.pick(&self.dims.customers);
        let currency = self
            .dims
            .geo_currency
            .get(&customer.geo_id)
            .ok_or_else(|| {
                RefreshError::missing("geo", format!("no currency for geo {}", customer.geo_id))
            })?
            .clone();

        let order_ts = window.start + Duration::seconds(rng.range_i64(0, window.seconds() - 1));

        let statuses = [
            OrderStatus::Created,
            OrderStatus::Cancelled,
            OrderStatus::Delivered,
            OrderStatus::Completed,
        ];
        let mut status = *rng.weighted_pick(&statuses, &model.order_status_weights);

        let channel = if rng.chance(0.5) {
            SalesChannel::Web
        } else {
            SalesChannel::App
        };
        let device = if channel == SalesChannel::App || rng.chance(0.65) {
            Device::Mobile
        } else {
            Device::Desktop
        };
        let session_id = format!(
            "sess_{order_id}_{:09}",
            rng.next_u64_below(1_000_000_000)
        );

        let num_items = rng.range_i64(1, max_items_per_order as i64);
        let chosen: Vec<&ProductRef> = (0..num_items)
            .map(|_| rng.pick(&self.dims.products))
            .collect();

        let mut gross = 0.0;
        let mut total_discount = 0.0;
        let mut total_tax = 0.0;
        let mut net = 0.0;

        for product in &chosen {
            let qty = rng.range_i64(1, 3);
            let discount = self.line_discount(order_ts, &product.category_l1, rng);

            let unit_sell = round2(product.list_price * (1.0 - discount));
            let line_gross = round2(product.list_price * qty as f64);
            let line_discount = round2((product.list_price - unit_sell) * qty as f64);
            let line_tax = round2(model.tax_rate * (unit_sell * qty as f64));
            let line_net = round2(unit_sell * qty as f64 + line_tax);

            gross += line_gross;
            total_discount += line_discount;
            total_tax += line_tax;
            net += line_net;

            batch.items.push(OrderItem {
                order_item_id: ids.next_order_item_id,
                order_id,
                product_id: product.product_id,
                qty,
                unit_list_price: round2(product.list_price),
                unit_sell_price: unit_sell,
                unit_cost: round2(product.unit_cost),
                line_discount,
                line_tax,
                line_net_revenue: line_net,
                created_at: order_ts,
                updated_at: order_ts,
            });
            ids.next_order_item_id += 1;
        }

        let gross = round2(gross);
        let total_discount = round2(total_discount);
        let total_tax = round2(total_tax);
        let net = round2(net);

        let methods = [
            PaymentMethod::Card,
            PaymentMethod::Upi,
            PaymentMethod::Wallet,
            PaymentMethod::Cod,
        ];
        let pay_method = *rng.pick(&methods);
        let provider = rng.pick(catalog::PAYMENT_PROVIDERS).to_string();

        let mut payment_status = PaymentStatus::Captured;
        let mut failure_reason = None;

        if status == OrderStatus::Cancelled {
            payment_status = *rng.weighted_pick(
                &[PaymentStatus::Failed, PaymentStatus::Declined],
                &[0.55, 0.45],
            );
            failure_reason = Some(*rng.pick(&[
                FailureReason::InsufficientFunds,
                FailureReason::NetworkError,
                FailureReason::FraudFlag,
                FailureReason::BankDecline,
            ]));
        } else if pay_method == PaymentMethod::Cod && rng.chance(model.cod_rto_rate) {
            // Return-to-origin: the courier never collects, the order dies.
            payment_status = PaymentStatus::Declined;
            failure_reason = Some(FailureReason::CodRto);
            status = OrderStatus::Cancelled;
        }

        let gateway_fee_amount = if pay_method != PaymentMethod::Cod && !payment_status.is_failure()
        {
            let rate = if pay_method == PaymentMethod::Upi {
                rng.uniform(model.upi_fee_rate.0, model.upi_fee_rate.1)
            } else {
                rng.uniform(model.card_fee_rate.0, model.card_fee_rate.1)
            };
            let fixed = rng.uniform(0.0, model.max_fixed_fee);
            round2(net * rate + fixed)
        } else {
            0.0
        };

        batch.orders.push(Order {
            order_id,
            customer_id: customer.customer_id,
            geo_id: customer.geo_id,
            order_ts,
            order_status: status,
            channel,
            currency,
            gross_amount: gross,
            discount_amount: total_discount,
            tax_amount: total_tax,
            net_amount: net,
            created_at: order_ts,
            updated_at: order_ts + Duration::minutes(rng.range_i64(0, 120)),
        });

        batch.payments.push(Payment {
            payment_id: ids.next_payment_id,
            order_id,
            payment_method: pay_method,
            payment_status,
            payment_provider: provider,
            amount: net,
            gateway_fee_amount,
            authorized_ts: order_ts + Duration::minutes(rng.range_i64(0, 10)),
            captured_ts: if payment_status.is_failure() {
                None
            } else {
                Some(order_ts + Duration::minutes(rng.range_i64(5, 30)))
            },
            failure_reason,
            refund_amount: 0.0,
            chargeback_flag: false,
            created_at: order_ts,
            updated_at: order_ts,
        });
        ids.next_payment_id += 1;

        // Session leading up to this order: the chosen products plus a
        // couple of other things the shopper looked at.
        let mut viewed: Vec<EntityId> = chosen.iter().map(|p| p.product_id).collect();
        for _ in 0..funnel_rng.range_i64(0, 2) {
            viewed.push(funnel_rng.pick(&self.dims.products).product_id);
        }
        let plan = SessionPlan {
            session_id,
            customer_id: Some(customer.customer_id),
            channel,
            device,
            start_ts: order_ts - Duration::minutes(funnel_rng.range_i64(4, 90)),
            viewed_products: viewed,
            cart_products: chosen.iter().map(|p| p.product_id).collect(),
            outcome: SessionOutcome::Purchase {
                order_id,
                failure_reason: if payment_status.is_failure() {
                    failure_reason
                } else {
                    None
                },
            },
        };
        batch.funnel_events.extend(funnel_synthesizer::synthesize(
            &plan,
            model,
            funnel_rng,
            &mut ids.next_event_id,
        ));

        Ok(())
    }

    /// Per-line discount: uniform base, plus a seasonal add-on (November/
    /// December heavy, June/July lighter), plus a promotion-category
    /// add-on, capped.
    fn line_discount(&self, order_ts: NaiveDateTime, category_l1: &str, rng: &mut StreamRng) -> f64 {
        let model = self.model;
        let mut discount = rng.uniform(model.base_discount.0, model.base_discount.1);
        match order_ts.month() {
            11 | 12 => {
                discount += rng.uniform(model.peak_discount_bonus.0, model.peak_discount_bonus.1)
            }
            6 | 7 => {
                discount +=
                    rng.uniform(model.midyear_discount_bonus.0, model.midyear_discount_bonus.1)
            }
            _ => {}
        }
        if catalog::PROMO_CATEGORIES.contains(&category_l1) {
            discount += rng.uniform(
                model.category_discount_bonus.0,
                model.category_discount_bonus.1,
            );
        }
        discount.min(model.discount_cap)
    }

    /// Shipments exist only for orders that reached the customer.
    fn generate_shipments(&self, ids: &mut IdCursors, rng: &mut StreamRng, batch: &mut FactBatch) {
        let model = self.model;
        let FactBatch {
            orders, shipments, ..
        } = batch;
        for order in orders.iter() {
            if !matches!(
                order.order_status,
                OrderStatus::Delivered | OrderStatus::Completed
            ) {
                continue;
            }
            let promised_days = rng.range_i64(model.promised_days.0, model.promised_days.1);
            let delay = *rng.pick(&model.delivery_delay_pool);
            let promised_dt = (order.order_ts + Duration::days(promised_days)).date();
            let delivered_dt = promised_dt + Duration::days(delay);

            shipments.push(Shipment {
                shipment_id: ids.next_shipment_id,
                order_id: order.order_id,
                fc_id: *rng.pick(&self.dims.fc_ids),
                carrier: rng.pick(catalog::CARRIERS).to_string(),
                shipped_ts: order.order_ts + Duration::hours(rng.range_i64(4, 48)),
                promised_delivery_dt: promised_dt,
                delivered_dt,
                shipping_cost: round2(rng.lognormal(model.shipping_cost_mu, model.shipping_cost_sigma)),
                sla_breached_flag: sla_breached(promised_dt, delivered_dt),
                created_at: order.order_ts,
                updated_at: order.order_ts,
            });
            ids.next_shipment_id += 1;
        }
    }

    /// Returns for the freshly generated batch. At most one return per
    /// order, selecting one of its items; a breached shipment raises both
    /// the probability and the chance of a LATE_DELIVERY reason.
    fn generate_returns(&self, ids: &mut IdCursors, rng: &mut StreamRng, batch: &mut FactBatch) {
        let model = self.model;

        let breach_by_order: HashMap<EntityId, bool> = batch
            .shipments
            .iter()
            .map(|s| (s.order_id, s.sla_breached_flag))
            .collect();
        let category_by_product: HashMap<EntityId, &str> = self
            .dims
            .products
            .iter()
            .map(|p| (p.product_id, p.category_l1.as_str()))
            .collect();
        let order_ts_by_id: HashMap<EntityId, NaiveDateTime> =
            batch.orders.iter().map(|o| (o.order_id, o.order_ts)).collect();

        let mut items_by_order: HashMap<EntityId, Vec<&OrderItem>> = HashMap::new();
        for item in &batch.items {
            // Only shipped orders can produce a return.
            if breach_by_order.contains_key(&item.order_id) {
                items_by_order.entry(item.order_id).or_default().push(item);
            }
        }
        let mut order_ids: Vec<EntityId> = items_by_order.keys().copied().collect();
        order_ids.sort_unstable();

        let mut refunds_by_order: HashMap<EntityId, f64> = HashMap::new();

        for order_id in order_ids {
            let breached = breach_by_order.get(&order_id).copied().unwrap_or(false);
            let mut p = model.base_return_rate;
            if breached {
                p += model.breach_return_bonus;
            }
            if !rng.chance(p) {
                continue;
            }

            let items = &items_by_order[&order_id];
            let item = *rng.pick(items);

            let mut reason = *rng.pick(&[
                crate::model::ReturnReason::Damaged,
                crate::model::ReturnReason::NotAsDescribed,
                crate::model::ReturnReason::SizeIssue,
                crate::model::ReturnReason::LateDelivery,
                crate::model::ReturnReason::QualityIssue,
                crate::model::ReturnReason::ChangedMind,
            ]);
            let category = category_by_product
                .get(&item.product_id)
                .copied()
                .unwrap_or_default();
            if category == catalog::APPAREL_L1 && rng.chance(model.size_issue_override_rate) {
                reason = crate::model::ReturnReason::SizeIssue;
            }
            if breached && rng.chance(model.late_delivery_override_rate) {
                reason = crate::model::ReturnReason::LateDelivery;
            }

            let refund_amount = round2(
                item.line_net_revenue * rng.uniform(model.refund_fraction.0, model.refund_fraction.1),
            );
            let order_ts = order_ts_by_id[&order_id];
            let return_ts = order_ts + Duration::days(rng.range_i64(3, 25));

            batch.returns.push(Return {
                return_id: ids.next_return_id,
                order_id,
                order_item_id: item.order_item_id,
                product_id: item.product_id,
                return_ts,
                return_reason: reason,
                refund_amount,
                return_status: RETURN_STATUS_REFUNDED.to_string(),
                restocked_flag: rng.chance(model.restock_rate),
                created_at: order_ts,
                updated_at: order_ts,
            });
            ids.next_return_id += 1;

            *refunds_by_order.entry(order_id).or_insert(0.0) += refund_amount;
        }

        // A refunded order flips its captured payment.
        for payment in &mut batch.payments {
            if let Some(refund) = refunds_by_order.get(&payment.order_id) {
                if payment.payment_status == PaymentStatus::Captured {
                    payment.payment_status = PaymentStatus::Refunded;
                    payment.refund_amount = round2(*refund);
                    if rng.chance(model.chargeback_rate) {
                        payment.chargeback_flag = true;
                    }
                }
            }
        }
    }

    /// Funnel-only sessions: window shoppers and cart abandoners. These
    /// never reference an order.
    pub fn generate_extra_sessions(
        &self,
        browse_count: u32,
        abandon_count: u32,
        window: &TimeWindow,
        ids: &mut IdCursors,
        rng: &mut StreamRng,
    ) -> RefreshResult<Vec<FunnelEvent>> {
        if self.dims.products.is_empty() {
            return Err(RefreshError::missing("product", "no products available"));
        }
        let model = self.model;
        let mut events = Vec::new();

        for idx in 0..(browse_count + abandon_count) {
            let is_abandon = idx >= browse_count;

            let start_ts =
                window.start + Duration::seconds(rng.range_i64(0, window.seconds() - 1));
            let channel = if rng.chance(0.5) {
                SalesChannel::Web
            } else {
                SalesChannel::App
            };
            let device = if channel == SalesChannel::App || rng.chance(0.65) {
                Device::Mobile
            } else {
                Device::Desktop
            };
            let customer_id = if !self.dims.customers.is_empty()
                && rng.chance(model.identified_session_rate)
            {
                Some(rng.pick(&self.dims.customers).customer_id)
            } else {
                None
            };

            let n_products = rng.range_i64(1, if is_abandon { 6 } else { 4 });
            let viewed: Vec<EntityId> = (0..n_products)
                .map(|_| rng.pick(&self.dims.products).product_id)
                .collect();
            let cart: Vec<EntityId> = if is_abandon {
                let take = rng.range_i64(1, (viewed.len() as i64).min(4)) as usize;
                viewed.iter().copied().take(take).collect()
            } else {
                Vec::new()
            };

            let plan = SessionPlan {
                session_id: format!("sess_x_{idx}_{:09}", rng.next_u64_below(1_000_000_000)),
                customer_id,
                channel,
                device,
                start_ts,
                viewed_products: viewed,
                cart_products: cart,
                outcome: if is_abandon {
                    SessionOutcome::CartAbandoned
                } else {
                    SessionOutcome::BrowseOnly
                },
            };
            events.extend(funnel_synthesizer::synthesize(
                &plan,
                model,
                rng,
                &mut ids.next_event_id,
            ));
        }

        Ok(events)
    }
}
