use super::{dt, opt_dt, opt_ts, ts, WarehouseStore};
use crate::delta_generator::ReturnCandidate;
use crate::error::RefreshResult;
use crate::model::{Order, OrderItem, OrderStatus, Payment};
use crate::types::EntityId;
use rusqlite::params;

fn order_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Order> {
    Ok(Order {
        order_id: row.get(0)?,
        customer_id: row.get(1)?,
        geo_id: row.get(2)?,
        order_ts: dt(row.get(3)?),
        order_status: row.get(4)?,
        channel: row.get(5)?,
        currency: row.get(6)?,
        gross_amount: row.get(7)?,
        discount_amount: row.get(8)?,
        tax_amount: row.get(9)?,
        net_amount: row.get(10)?,
        created_at: dt(row.get(11)?),
        updated_at: dt(row.get(12)?),
    })
}

const ORDER_COLUMNS: &str = "order_id, customer_id, geo_id, order_ts, order_status, channel,
    currency, gross_amount, discount_amount, tax_amount, net_amount, created_at, updated_at";

fn item_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderItem> {
    Ok(OrderItem {
        order_item_id: row.get(0)?,
        order_id: row.get(1)?,
        product_id: row.get(2)?,
        qty: row.get(3)?,
        unit_list_price: row.get(4)?,
        unit_sell_price: row.get(5)?,
        unit_cost: row.get(6)?,
        line_discount: row.get(7)?,
        line_tax: row.get(8)?,
        line_net_revenue: row.get(9)?,
        created_at: dt(row.get(10)?),
        updated_at: dt(row.get(11)?),
    })
}

const ITEM_COLUMNS: &str = "order_item_id, order_id, product_id, qty, unit_list_price,
    unit_sell_price, unit_cost, line_discount, line_tax, line_net_revenue, created_at, updated_at";

fn payment_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Payment> {
    Ok(Payment {
        payment_id: row.get(0)?,
        order_id: row.get(1)?,
        payment_method: row.get(2)?,
        payment_status: row.get(3)?,
        payment_provider: row.get(4)?,
        amount: row.get(5)?,
        gateway_fee_amount: row.get(6)?,
        authorized_ts: dt(row.get(7)?),
        captured_ts: opt_dt(row.get(8)?),
        failure_reason: row.get(9)?,
        refund_amount: row.get(10)?,
        chargeback_flag: row.get(11)?,
        created_at: dt(row.get(12)?),
        updated_at: dt(row.get(13)?),
    })
}

const PAYMENT_COLUMNS: &str = "payment_id, order_id, payment_method, payment_status,
    payment_provider, amount, gateway_fee_amount, authorized_ts, captured_ts, failure_reason,
    refund_amount, chargeback_flag, created_at, updated_at";

impl WarehouseStore {
    // ── Bulk load (warehouse seed) ─────────────────────────────

    pub fn insert_orders(&self, orders: &[Order]) -> RefreshResult<()> {
        self.insert_orders_into("fact_orders", orders)
    }

    pub(crate) fn insert_orders_into(&self, table: &str, orders: &[Order]) -> RefreshResult<()> {
        let sql = format!(
            "INSERT INTO {table} (
                order_id, customer_id, geo_id, order_ts, order_status, channel, currency,
                gross_amount, discount_amount, tax_amount, net_amount, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for o in orders {
            stmt.execute(params![
                o.order_id,
                o.customer_id,
                o.geo_id,
                ts(o.order_ts),
                o.order_status,
                o.channel,
                o.currency,
                o.gross_amount,
                o.discount_amount,
                o.tax_amount,
                o.net_amount,
                ts(o.created_at),
                ts(o.updated_at),
            ])?;
        }
        Ok(())
    }

    pub fn insert_order_items(&self, items: &[OrderItem]) -> RefreshResult<()> {
        self.insert_order_items_into("fact_order_items", items)
    }

    pub(crate) fn insert_order_items_into(
        &self,
        table: &str,
        items: &[OrderItem],
    ) -> RefreshResult<()> {
        let sql = format!(
            "INSERT INTO {table} (
                order_item_id, order_id, product_id, qty, unit_list_price, unit_sell_price,
                unit_cost, line_discount, line_tax, line_net_revenue, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for i in items {
            stmt.execute(params![
                i.order_item_id,
                i.order_id,
                i.product_id,
                i.qty,
                i.unit_list_price,
                i.unit_sell_price,
                i.unit_cost,
                i.line_discount,
                i.line_tax,
                i.line_net_revenue,
                ts(i.created_at),
                ts(i.updated_at),
            ])?;
        }
        Ok(())
    }

    pub fn insert_payments(&self, payments: &[Payment]) -> RefreshResult<()> {
        self.insert_payments_into("fact_payments", payments)
    }

    pub(crate) fn insert_payments_into(
        &self,
        table: &str,
        payments: &[Payment],
    ) -> RefreshResult<()> {
        let sql = format!(
            "INSERT INTO {table} (
                payment_id, order_id, payment_method, payment_status, payment_provider,
                amount, gateway_fee_amount, authorized_ts, captured_ts, failure_reason,
                refund_amount, chargeback_flag, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for p in payments {
            stmt.execute(params![
                p.payment_id,
                p.order_id,
                p.payment_method,
                p.payment_status,
                p.payment_provider,
                p.amount,
                p.gateway_fee_amount,
                ts(p.authorized_ts),
                opt_ts(p.captured_ts),
                p.failure_reason,
                p.refund_amount,
                p.chargeback_flag,
                ts(p.created_at),
                ts(p.updated_at),
            ])?;
        }
        Ok(())
    }

    // ── Readers ────────────────────────────────────────────────

    pub fn all_orders(&self) -> RefreshResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM fact_orders ORDER BY order_id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], order_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn order(&self, order_id: EntityId) -> RefreshResult<Order> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM fact_orders WHERE order_id = ?1");
        self.conn
            .query_row(&sql, params![order_id], order_row_mapper)
            .map_err(Into::into)
    }

    pub fn orders_with_status(&self, status: OrderStatus) -> RefreshResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM fact_orders WHERE order_status = ?1 ORDER BY order_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![status], order_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_order_items(&self) -> RefreshResult<Vec<OrderItem>> {
        let sql =
            format!("SELECT {ITEM_COLUMNS} FROM fact_order_items ORDER BY order_item_id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], item_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn items_for_order(&self, order_id: EntityId) -> RefreshResult<Vec<OrderItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM fact_order_items WHERE order_id = ?1
             ORDER BY order_item_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![order_id], item_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_payments(&self) -> RefreshResult<Vec<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM fact_payments ORDER BY payment_id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], payment_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn payment_for_order(&self, order_id: EntityId) -> RefreshResult<Payment> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM fact_payments WHERE order_id = ?1");
        self.conn
            .query_row(&sql, params![order_id], payment_row_mapper)
            .map_err(Into::into)
    }

    // ── Delta candidate pools (read in key order) ──────────────

    pub fn delivered_orders(&self) -> RefreshResult<Vec<Order>> {
        self.orders_with_status(OrderStatus::Delivered)
    }

    /// Order items eligible for a late return: the order reached the
    /// customer, a payment exists, and no return touches the item yet.
    pub fn returnable_candidates(&self) -> RefreshResult<Vec<ReturnCandidate>> {
        let sql = "
            SELECT
                i.order_item_id, i.product_id, i.line_net_revenue,
                o.order_id, o.customer_id, o.geo_id, o.order_ts, o.order_status, o.channel,
                o.currency, o.gross_amount, o.discount_amount, o.tax_amount, o.net_amount,
                o.created_at, o.updated_at,
                p.payment_id, p.order_id, p.payment_method, p.payment_status, p.payment_provider,
                p.amount, p.gateway_fee_amount, p.authorized_ts, p.captured_ts, p.failure_reason,
                p.refund_amount, p.chargeback_flag, p.created_at, p.updated_at
            FROM fact_order_items i
            JOIN fact_orders o ON o.order_id = i.order_id
            JOIN fact_payments p ON p.order_id = o.order_id
            LEFT JOIN fact_returns r ON r.order_item_id = i.order_item_id
            WHERE o.order_status IN ('DELIVERED', 'COMPLETED')
              AND r.return_id IS NULL
            ORDER BY i.order_item_id ASC";
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(ReturnCandidate {
                order_item_id: row.get(0)?,
                product_id: row.get(1)?,
                line_net_revenue: row.get(2)?,
                order: Order {
                    order_id: row.get(3)?,
                    customer_id: row.get(4)?,
                    geo_id: row.get(5)?,
                    order_ts: dt(row.get(6)?),
                    order_status: row.get(7)?,
                    channel: row.get(8)?,
                    currency: row.get(9)?,
                    gross_amount: row.get(10)?,
                    discount_amount: row.get(11)?,
                    tax_amount: row.get(12)?,
                    net_amount: row.get(13)?,
                    created_at: dt(row.get(14)?),
                    updated_at: dt(row.get(15)?),
                },
                payment: Payment {
                    payment_id: row.get(16)?,
                    order_id: row.get(17)?,
                    payment_method: row.get(18)?,
                    payment_status: row.get(19)?,
                    payment_provider: row.get(20)?,
                    amount: row.get(21)?,
                    gateway_fee_amount: row.get(22)?,
                    authorized_ts: dt(row.get(23)?),
                    captured_ts: opt_dt(row.get(24)?),
                    failure_reason: row.get(25)?,
                    refund_amount: row.get(26)?,
                    chargeback_flag: row.get(27)?,
                    created_at: dt(row.get(28)?),
                    updated_at: dt(row.get(29)?),
                },
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
