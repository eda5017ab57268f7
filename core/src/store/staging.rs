//! Staging loads and idempotent merges.
//!
//! Each merge is two statements against the staged batch:
//!   1. UPDATE rows whose key exists and whose content differs.
//!   2. INSERT rows whose key is missing.
//! A staged row identical to the live row touches nothing, so re-applying
//! the same batch is a no-op in both counts. Funnel events are
//! append-only and take the insert half alone.

use super::WarehouseStore;
use crate::error::RefreshResult;
use crate::merge::MergeCounts;
use crate::model::{Customer, FunnelEvent, Order, OrderItem, Payment, Product, Return, Shipment};

const STAGING_TABLES: &[&str] = &[
    "stg_dim_customer",
    "stg_dim_product",
    "stg_fact_orders",
    "stg_fact_order_items",
    "stg_fact_payments",
    "stg_fact_funnel_events",
    "stg_fact_shipments",
    "stg_fact_returns",
];

const CUSTOMER_MERGE_COLUMNS: &[&str] = &[
    "customer_created_ts",
    "geo_id",
    "acquisition_channel",
    "created_at",
    "updated_at",
];

const PRODUCT_MERGE_COLUMNS: &[&str] = &[
    "sku",
    "product_name",
    "category_l1",
    "category_l2",
    "brand",
    "unit_cost",
    "list_price",
    "created_at",
    "updated_at",
];

const ORDER_MERGE_COLUMNS: &[&str] = &[
    "customer_id",
    "geo_id",
    "order_ts",
    "order_status",
    "channel",
    "currency",
    "gross_amount",
    "discount_amount",
    "tax_amount",
    "net_amount",
    "created_at",
    "updated_at",
];

const ITEM_MERGE_COLUMNS: &[&str] = &[
    "order_id",
    "product_id",
    "qty",
    "unit_list_price",
    "unit_sell_price",
    "unit_cost",
    "line_discount",
    "line_tax",
    "line_net_revenue",
    "created_at",
    "updated_at",
];

const PAYMENT_MERGE_COLUMNS: &[&str] = &[
    "order_id",
    "payment_method",
    "payment_status",
    "payment_provider",
    "amount",
    "gateway_fee_amount",
    "authorized_ts",
    "captured_ts",
    "failure_reason",
    "refund_amount",
    "chargeback_flag",
    "created_at",
    "updated_at",
];

const SHIPMENT_MERGE_COLUMNS: &[&str] = &[
    "order_id",
    "fc_id",
    "carrier",
    "shipped_ts",
    "promised_delivery_dt",
    "delivered_dt",
    "shipping_cost",
    "sla_breached_flag",
    "created_at",
    "updated_at",
];

const RETURN_MERGE_COLUMNS: &[&str] = &[
    "order_id",
    "order_item_id",
    "product_id",
    "return_ts",
    "return_reason",
    "refund_amount",
    "return_status",
    "restocked_flag",
    "created_at",
    "updated_at",
];

const FUNNEL_MERGE_COLUMNS: &[&str] = &[
    "event_ts",
    "session_id",
    "customer_id",
    "product_id",
    "order_id",
    "stage",
    "channel",
    "device",
    "failure_reason",
];

impl WarehouseStore {
    /// Truncate every staging table. Called at the start of each run.
    pub fn clear_staging(&self) -> RefreshResult<()> {
        for table in STAGING_TABLES {
            let sql = format!("DELETE FROM {table}");
            self.conn.execute(&sql, [])?;
        }
        Ok(())
    }

    // ── Staging loads ──────────────────────────────────────────

    pub fn stage_customers(&self, customers: &[Customer]) -> RefreshResult<()> {
        self.insert_customers_into("stg_dim_customer", customers)
    }

    pub fn stage_products(&self, products: &[Product]) -> RefreshResult<()> {
        self.insert_products_into("stg_dim_product", products)
    }

    pub fn stage_orders(&self, orders: &[Order]) -> RefreshResult<()> {
        self.insert_orders_into("stg_fact_orders", orders)
    }

    pub fn stage_order_items(&self, items: &[OrderItem]) -> RefreshResult<()> {
        self.insert_order_items_into("stg_fact_order_items", items)
    }

    pub fn stage_payments(&self, payments: &[Payment]) -> RefreshResult<()> {
        self.insert_payments_into("stg_fact_payments", payments)
    }

    pub fn stage_funnel_events(&self, events: &[FunnelEvent]) -> RefreshResult<()> {
        self.insert_funnel_events_into("stg_fact_funnel_events", events)
    }

    pub fn stage_shipments(&self, shipments: &[Shipment]) -> RefreshResult<()> {
        self.insert_shipments_into("stg_fact_shipments", shipments)
    }

    pub fn stage_returns(&self, returns: &[Return]) -> RefreshResult<()> {
        self.insert_returns_into("stg_fact_returns", returns)
    }

    // ── Merges ─────────────────────────────────────────────────

    pub fn merge_customers(&self) -> RefreshResult<MergeCounts> {
        self.upsert_from_staging(
            "dim_customer",
            "stg_dim_customer",
            "customer_id",
            CUSTOMER_MERGE_COLUMNS,
        )
    }

    pub fn merge_products(&self) -> RefreshResult<MergeCounts> {
        self.upsert_from_staging(
            "dim_product",
            "stg_dim_product",
            "product_id",
            PRODUCT_MERGE_COLUMNS,
        )
    }

    pub fn merge_orders(&self) -> RefreshResult<MergeCounts> {
        self.upsert_from_staging(
            "fact_orders",
            "stg_fact_orders",
            "order_id",
            ORDER_MERGE_COLUMNS,
        )
    }

    pub fn merge_order_items(&self) -> RefreshResult<MergeCounts> {
        self.upsert_from_staging(
            "fact_order_items",
            "stg_fact_order_items",
            "order_item_id",
            ITEM_MERGE_COLUMNS,
        )
    }

    pub fn merge_payments(&self) -> RefreshResult<MergeCounts> {
        self.upsert_from_staging(
            "fact_payments",
            "stg_fact_payments",
            "payment_id",
            PAYMENT_MERGE_COLUMNS,
        )
    }

    /// Funnel events are append-only: never updated, only inserted when
    /// the event id is new.
    pub fn merge_funnel_events(&self) -> RefreshResult<MergeCounts> {
        let inserted = self.insert_missing_from_staging(
            "fact_funnel_events",
            "stg_fact_funnel_events",
            "event_id",
            FUNNEL_MERGE_COLUMNS,
        )?;
        Ok(MergeCounts {
            inserted,
            updated: 0,
        })
    }

    pub fn merge_shipments(&self) -> RefreshResult<MergeCounts> {
        self.upsert_from_staging(
            "fact_shipments",
            "stg_fact_shipments",
            "shipment_id",
            SHIPMENT_MERGE_COLUMNS,
        )
    }

    pub fn merge_returns(&self) -> RefreshResult<MergeCounts> {
        self.upsert_from_staging(
            "fact_returns",
            "stg_fact_returns",
            "return_id",
            RETURN_MERGE_COLUMNS,
        )
    }

    /// Idempotent upsert keyed by `key`: update changed rows, insert
    /// missing ones, count each side from the statements' changed rows.
    fn upsert_from_staging(
        &self,
        target: &str,
        staging: &str,
        key: &str,
        columns: &[&str],
    ) -> RefreshResult<MergeCounts> {
        let set_clause = columns
            .iter()
            .map(|c| format!("{c} = s.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let differs_clause = columns
            .iter()
            .map(|c| format!("{target}.{c} IS NOT s.{c}"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let update_sql = format!(
            "UPDATE {target} SET {set_clause}
             FROM {staging} AS s
             WHERE {target}.{key} = s.{key} AND ({differs_clause})"
        );
        let updated = self.conn.execute(&update_sql, [])? as u64;

        let inserted = self.insert_missing_from_staging(target, staging, key, columns)?;

        Ok(MergeCounts { inserted, updated })
    }

    fn insert_missing_from_staging(
        &self,
        target: &str,
        staging: &str,
        key: &str,
        columns: &[&str],
    ) -> RefreshResult<u64> {
        let column_list = std::iter::once(key)
            .chain(columns.iter().copied())
            .collect::<Vec<_>>()
            .join(", ");
        let select_list = std::iter::once(key)
            .chain(columns.iter().copied())
            .map(|c| format!("s.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_sql = format!(
            "INSERT INTO {target} ({column_list})
             SELECT {select_list} FROM {staging} AS s
             WHERE NOT EXISTS (SELECT 1 FROM {target} t WHERE t.{key} = s.{key})"
        );
        Ok(self.conn.execute(&insert_sql, [])? as u64)
    }
}
