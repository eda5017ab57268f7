use super::{dt, ts, WarehouseStore};
use crate::error::RefreshResult;
use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension};

impl WarehouseStore {
    // ── Watermarks ─────────────────────────────────────────────

    pub fn get_watermark(&self, source_name: &str) -> RefreshResult<Option<NaiveDateTime>> {
        let epoch: Option<i64> = self
            .conn
            .query_row(
                "SELECT last_processed_ts FROM etl_watermarks WHERE source_name = ?1",
                params![source_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(epoch.map(dt))
    }

    pub fn set_watermark(&self, source_name: &str, watermark: NaiveDateTime) -> RefreshResult<()> {
        self.conn.execute(
            "INSERT INTO etl_watermarks (source_name, last_processed_ts) VALUES (?1, ?2)
             ON CONFLICT(source_name) DO UPDATE SET last_processed_ts = excluded.last_processed_ts",
            params![source_name, ts(watermark)],
        )?;
        Ok(())
    }

    /// Read the watermark, initializing a new source to `default_ts`. The
    /// default is persisted immediately (outside the run's transaction)
    /// so retried or concurrent first runs converge on one boundary.
    pub fn get_or_init_watermark(
        &self,
        source_name: &str,
        default_ts: NaiveDateTime,
    ) -> RefreshResult<NaiveDateTime> {
        if let Some(existing) = self.get_watermark(source_name)? {
            return Ok(existing);
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO etl_watermarks (source_name, last_processed_ts)
             VALUES (?1, ?2)",
            params![source_name, ts(default_ts)],
        )?;
        // Reread in case a concurrent initializer won the insert.
        Ok(self.get_watermark(source_name)?.unwrap_or(default_ts))
    }
}
