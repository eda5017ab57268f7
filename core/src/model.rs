//! Warehouse row types and their status vocabularies.
//!
//! RULE: One struct per warehouse table, named fields only — no positional
//! tuples anywhere between the generators and the store. Enums carry their
//! stable TEXT encodings; changing an encoding is a schema migration.

use crate::types::EntityId;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

/// Round a currency amount to 2 decimal places. Applied at the line level
/// before aggregation so order totals reconcile with their items.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// SLA breach is a pure function of the two dates and may only ever flip
/// false-to-true across refresh runs.
pub fn sla_breached(promised: NaiveDate, delivered: NaiveDate) -> bool {
    delivered > promised
}

pub const RETURN_STATUS_REFUNDED: &str = "REFUNDED";

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                Self::parse(s).ok_or_else(|| {
                    FromSqlError::Other(
                        format!("invalid {} value: {s}", stringify!($name)).into(),
                    )
                })
            }
        }
    };
}

text_enum!(OrderStatus {
    Created => "CREATED",
    Cancelled => "CANCELLED",
    Delivered => "DELIVERED",
    Completed => "COMPLETED",
    Returned => "RETURNED",
});

impl OrderStatus {
    /// Orders that reached the customer and therefore carry a shipment.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Delivered | Self::Completed | Self::Returned)
    }
}

text_enum!(SalesChannel {
    Web => "WEB",
    App => "APP",
});

text_enum!(Device {
    Mobile => "MOBILE",
    Desktop => "DESKTOP",
});

text_enum!(PaymentMethod {
    Card => "CARD",
    Upi => "UPI",
    Wallet => "WALLET",
    Cod => "COD",
});

text_enum!(PaymentStatus {
    Captured => "CAPTURED",
    Failed => "FAILED",
    Declined => "DECLINED",
    Refunded => "REFUNDED",
});

impl PaymentStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Declined)
    }
}

text_enum!(FailureReason {
    InsufficientFunds => "INSUFFICIENT_FUNDS",
    NetworkError => "NETWORK_ERROR",
    FraudFlag => "FRAUD_FLAG",
    BankDecline => "BANK_DECLINE",
    CodRto => "COD_RTO",
});

text_enum!(FunnelStage {
    ViewProduct => "VIEW_PRODUCT",
    AddToCart => "ADD_TO_CART",
    ViewCart => "VIEW_CART",
    CheckoutStarted => "CHECKOUT_STARTED",
    PaymentAttempted => "PAYMENT_ATTEMPTED",
    PaymentFailed => "PAYMENT_FAILED",
    OrderPlaced => "ORDER_PLACED",
});

impl FunnelStage {
    /// Position in the canonical funnel. The two terminal stages share a
    /// rank — they are mutually exclusive ends of the same session.
    pub fn causal_rank(&self) -> u8 {
        match self {
            Self::ViewProduct => 0,
            Self::AddToCart => 1,
            Self::ViewCart => 2,
            Self::CheckoutStarted => 3,
            Self::PaymentAttempted => 4,
            Self::PaymentFailed | Self::OrderPlaced => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PaymentFailed | Self::OrderPlaced)
    }
}

text_enum!(ReturnReason {
    Damaged => "DAMAGED",
    NotAsDescribed => "NOT_AS_DESCRIBED",
    SizeIssue => "SIZE_ISSUE",
    LateDelivery => "LATE_DELIVERY",
    QualityIssue => "QUALITY_ISSUE",
    ChangedMind => "CHANGED_MIND",
});

// ── Dimension rows ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    pub geo_id: EntityId,
    pub country: String,
    pub region: String,
    pub city: String,
    pub currency: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentCenter {
    pub fc_id: EntityId,
    pub fc_name: String,
    pub geo_id: EntityId,
    pub timezone: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: EntityId,
    pub customer_created_ts: NaiveDateTime,
    pub geo_id: EntityId,
    pub acquisition_channel: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: EntityId,
    pub sku: String,
    pub product_name: String,
    pub category_l1: String,
    pub category_l2: String,
    pub brand: String,
    pub unit_cost: f64,
    pub list_price: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateDim {
    pub date_id: i64,
    pub date_value: NaiveDate,
    pub year: i32,
    pub quarter: u32,
    pub month: u32,
    pub month_name: String,
    pub week_of_year: u32,
    pub day_of_month: u32,
    pub day_of_week: u32,
    pub day_name: String,
    pub is_weekend: bool,
}

// ── Fact rows ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: EntityId,
    pub customer_id: EntityId,
    pub geo_id: EntityId,
    pub order_ts: NaiveDateTime,
    pub order_status: OrderStatus,
    pub channel: SalesChannel,
    pub currency: String,
    pub gross_amount: f64,
    pub discount_amount: f64,
    pub tax_amount: f64,
    pub net_amount: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_item_id: EntityId,
    pub order_id: EntityId,
    pub product_id: EntityId,
    pub qty: i64,
    pub unit_list_price: f64,
    pub unit_sell_price: f64,
    pub unit_cost: f64,
    pub line_discount: f64,
    pub line_tax: f64,
    pub line_net_revenue: f64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: EntityId,
    pub order_id: EntityId,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub payment_provider: String,
    pub amount: f64,
    pub gateway_fee_amount: f64,
    pub authorized_ts: NaiveDateTime,
    pub captured_ts: Option<NaiveDateTime>,
    pub failure_reason: Option<FailureReason>,
    pub refund_amount: f64,
    pub chargeback_flag: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub shipment_id: EntityId,
    pub order_id: EntityId,
    pub fc_id: EntityId,
    pub carrier: String,
    pub shipped_ts: NaiveDateTime,
    pub promised_delivery_dt: NaiveDate,
    pub delivered_dt: NaiveDate,
    pub shipping_cost: f64,
    pub sla_breached_flag: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub return_id: EntityId,
    pub order_id: EntityId,
    pub order_item_id: EntityId,
    pub product_id: EntityId,
    pub return_ts: NaiveDateTime,
    pub return_reason: ReturnReason,
    pub refund_amount: f64,
    pub return_status: String,
    pub restocked_flag: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelEvent {
    pub event_id: EntityId,
    pub event_ts: NaiveDateTime,
    pub session_id: String,
    pub customer_id: Option<EntityId>,
    pub product_id: Option<EntityId>,
    pub order_id: Option<EntityId>,
    pub stage: FunnelStage,
    pub channel: SalesChannel,
    pub device: Device,
    pub failure_reason: Option<FailureReason>,
}
