//! SQLite persistence layer.
//!
//! RULE: Only the store modules talk to the database. Generators and the
//! orchestrator call store methods — they never execute SQL directly.
//!
//! Timestamps are persisted as i64 epoch seconds, calendar dates as
//! ISO-8601 TEXT (which compares correctly as TEXT).

mod dimension;
mod fact;
mod funnel;
mod logistics;
mod staging;
mod watermark;

use crate::error::RefreshResult;
use crate::fact_generator::IdCursors;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rusqlite::Connection;

pub struct WarehouseStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl WarehouseStore {
    pub fn open(path: &str) -> RefreshResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> RefreshResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases, this returns a new isolated database.
    pub fn reopen(&self) -> RefreshResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> RefreshResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_dimensions.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_facts.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_staging.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/004_watermarks.sql"))?;
        Ok(())
    }

    // ── Run-scoped transaction control ─────────────────────────
    //
    // One refresh run = one transaction. The orchestrator owns the
    // begin/commit/rollback sequencing; nothing else opens transactions.

    pub fn begin_run(&self) -> RefreshResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    pub fn commit_run(&self) -> RefreshResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    pub fn rollback_run(&self) -> RefreshResult<()> {
        self.conn.execute_batch("ROLLBACK;")?;
        Ok(())
    }

    // ── Id cursors ─────────────────────────────────────────────

    /// Next unassigned id per fact entity, from the current maximums.
    pub fn fact_id_cursors(&self) -> RefreshResult<IdCursors> {
        Ok(IdCursors {
            next_order_id: self.max_id("fact_orders", "order_id")? + 1,
            next_order_item_id: self.max_id("fact_order_items", "order_item_id")? + 1,
            next_payment_id: self.max_id("fact_payments", "payment_id")? + 1,
            next_shipment_id: self.max_id("fact_shipments", "shipment_id")? + 1,
            next_return_id: self.max_id("fact_returns", "return_id")? + 1,
            next_event_id: self.max_id("fact_funnel_events", "event_id")? + 1,
        })
    }

    fn max_id(&self, table: &str, column: &str) -> RefreshResult<i64> {
        let sql = format!("SELECT COALESCE(MAX({column}), 0) FROM {table}");
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Row count for any warehouse or staging table. Test and report helper.
    pub fn table_count(&self, table: &str) -> RefreshResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(Into::into)
    }
}

// ── Column codec helpers shared by the store modules ───────────────

pub(crate) fn ts(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

pub(crate) fn opt_ts(dt: Option<NaiveDateTime>) -> Option<i64> {
    dt.map(ts)
}

pub(crate) fn dt(epoch: i64) -> NaiveDateTime {
    DateTime::from_timestamp(epoch, 0)
        .map(|d| d.naive_utc())
        .unwrap_or_default()
}

pub(crate) fn opt_dt(epoch: Option<i64>) -> Option<NaiveDateTime> {
    epoch.map(dt)
}

pub(crate) fn date_str(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(idx: usize, s: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
