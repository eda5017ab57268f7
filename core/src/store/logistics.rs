use super::{date_str, dt, parse_date, ts, WarehouseStore};
use crate::error::RefreshResult;
use crate::model::{Return, Shipment};
use crate::types::EntityId;
use rusqlite::params;

fn shipment_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Shipment> {
    Ok(Shipment {
        shipment_id: row.get(0)?,
        order_id: row.get(1)?,
        fc_id: row.get(2)?,
        carrier: row.get(3)?,
        shipped_ts: dt(row.get(4)?),
        promised_delivery_dt: parse_date(5, row.get(5)?)?,
        delivered_dt: parse_date(6, row.get(6)?)?,
        shipping_cost: row.get(7)?,
        sla_breached_flag: row.get(8)?,
        created_at: dt(row.get(9)?),
        updated_at: dt(row.get(10)?),
    })
}

const SHIPMENT_COLUMNS: &str = "shipment_id, order_id, fc_id, carrier, shipped_ts,
    promised_delivery_dt, delivered_dt, shipping_cost, sla_breached_flag, created_at, updated_at";

fn return_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Return> {
    Ok(Return {
        return_id: row.get(0)?,
        order_id: row.get(1)?,
        order_item_id: row.get(2)?,
        product_id: row.get(3)?,
        return_ts: dt(row.get(4)?),
        return_reason: row.get(5)?,
        refund_amount: row.get(6)?,
        return_status: row.get(7)?,
        restocked_flag: row.get(8)?,
        created_at: dt(row.get(9)?),
        updated_at: dt(row.get(10)?),
    })
}

const RETURN_COLUMNS: &str = "return_id, order_id, order_item_id, product_id, return_ts,
    return_reason, refund_amount, return_status, restocked_flag, created_at, updated_at";

impl WarehouseStore {
    // ── Bulk load (warehouse seed) ─────────────────────────────

    pub fn insert_shipments(&self, shipments: &[Shipment]) -> RefreshResult<()> {
        self.insert_shipments_into("fact_shipments", shipments)
    }

    pub(crate) fn insert_shipments_into(
        &self,
        table: &str,
        shipments: &[Shipment],
    ) -> RefreshResult<()> {
        let sql = format!(
            "INSERT INTO {table} (
                shipment_id, order_id, fc_id, carrier, shipped_ts, promised_delivery_dt,
                delivered_dt, shipping_cost, sla_breached_flag, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for s in shipments {
            stmt.execute(params![
                s.shipment_id,
                s.order_id,
                s.fc_id,
                s.carrier,
                ts(s.shipped_ts),
                date_str(s.promised_delivery_dt),
                date_str(s.delivered_dt),
                s.shipping_cost,
                s.sla_breached_flag,
                ts(s.created_at),
                ts(s.updated_at),
            ])?;
        }
        Ok(())
    }

    pub fn insert_returns(&self, returns: &[Return]) -> RefreshResult<()> {
        self.insert_returns_into("fact_returns", returns)
    }

    pub(crate) fn insert_returns_into(&self, table: &str, returns: &[Return]) -> RefreshResult<()> {
        let sql = format!(
            "INSERT INTO {table} (
                return_id, order_id, order_item_id, product_id, return_ts, return_reason,
                refund_amount, return_status, restocked_flag, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for r in returns {
            stmt.execute(params![
                r.return_id,
                r.order_id,
                r.order_item_id,
                r.product_id,
                ts(r.return_ts),
                r.return_reason,
                r.refund_amount,
                r.return_status,
                r.restocked_flag,
                ts(r.created_at),
                ts(r.updated_at),
            ])?;
        }
        Ok(())
    }

    // ── Readers ────────────────────────────────────────────────

    pub fn all_shipments(&self) -> RefreshResult<Vec<Shipment>> {
        let sql =
            format!("SELECT {SHIPMENT_COLUMNS} FROM fact_shipments ORDER BY shipment_id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], shipment_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn shipment_for_order(&self, order_id: EntityId) -> RefreshResult<Option<Shipment>> {
        use rusqlite::OptionalExtension;
        let sql = format!("SELECT {SHIPMENT_COLUMNS} FROM fact_shipments WHERE order_id = ?1");
        self.conn
            .query_row(&sql, params![order_id], shipment_row_mapper)
            .optional()
            .map_err(Into::into)
    }

    /// Delta candidates: delivered shipments still inside their promise.
    pub fn unbreached_shipments(&self) -> RefreshResult<Vec<Shipment>> {
        let sql = format!(
            "SELECT {SHIPMENT_COLUMNS} FROM fact_shipments
             WHERE sla_breached_flag = 0 ORDER BY shipment_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], shipment_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_returns(&self) -> RefreshResult<Vec<Return>> {
        let sql = format!("SELECT {RETURN_COLUMNS} FROM fact_returns ORDER BY return_id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], return_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn returns_for_order(&self, order_id: EntityId) -> RefreshResult<Vec<Return>> {
        let sql = format!(
            "SELECT {RETURN_COLUMNS} FROM fact_returns WHERE order_id = ?1
             ORDER BY return_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![order_id], return_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
