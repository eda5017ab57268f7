use super::{dt, ts, WarehouseStore};
use crate::error::RefreshResult;
use crate::model::FunnelEvent;
use rusqlite::params;

fn event_row_mapper(row: &rusqlite::Row<'_>) -> rusqlite::Result<FunnelEvent> {
    Ok(FunnelEvent {
        event_id: row.get(0)?,
        event_ts: dt(row.get(1)?),
        session_id: row.get(2)?,
        customer_id: row.get(3)?,
        product_id: row.get(4)?,
        order_id: row.get(5)?,
        stage: row.get(6)?,
        channel: row.get(7)?,
        device: row.get(8)?,
        failure_reason: row.get(9)?,
    })
}

const EVENT_COLUMNS: &str = "event_id, event_ts, session_id, customer_id, product_id, order_id,
    stage, channel, device, failure_reason";

impl WarehouseStore {
    pub fn insert_funnel_events(&self, events: &[FunnelEvent]) -> RefreshResult<()> {
        self.insert_funnel_events_into("fact_funnel_events", events)
    }

    pub(crate) fn insert_funnel_events_into(
        &self,
        table: &str,
        events: &[FunnelEvent],
    ) -> RefreshResult<()> {
        let sql = format!(
            "INSERT INTO {table} (
                event_id, event_ts, session_id, customer_id, product_id, order_id,
                stage, channel, device, failure_reason
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for e in events {
            stmt.execute(params![
                e.event_id,
                ts(e.event_ts),
                e.session_id,
                e.customer_id,
                e.product_id,
                e.order_id,
                e.stage,
                e.channel,
                e.device,
                e.failure_reason,
            ])?;
        }
        Ok(())
    }

    /// All events in session-then-time order. Test helper for the
    /// causality property.
    pub fn all_funnel_events(&self) -> RefreshResult<Vec<FunnelEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM fact_funnel_events
             ORDER BY session_id ASC, event_ts ASC, event_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], event_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn events_for_session(&self, session_id: &str) -> RefreshResult<Vec<FunnelEvent>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM fact_funnel_events WHERE session_id = ?1
             ORDER BY event_ts ASC, event_id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![session_id], event_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
