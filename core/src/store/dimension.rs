use super::{date_str, dt, ts, WarehouseStore};
use crate::error::RefreshResult;
use crate::fact_generator::{CustomerRef, DimensionSnapshot, ProductRef};
use crate::model::{Customer, DateDim, FulfillmentCenter, Geo, Product};
use crate::types::EntityId;
use rusqlite::params;
use std::collections::HashMap;

impl WarehouseStore {
    // ── Bulk load (warehouse seed) ─────────────────────────────

    pub fn insert_geos(&self, geos: &[Geo]) -> RefreshResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO dim_geo (geo_id, country, region, city, currency, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for g in geos {
            stmt.execute(params![
                g.geo_id,
                g.country,
                g.region,
                g.city,
                g.currency,
                ts(g.created_at),
                ts(g.updated_at),
            ])?;
        }
        Ok(())
    }

    pub fn insert_fulfillment_centers(&self, fcs: &[FulfillmentCenter]) -> RefreshResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO dim_fc (fc_id, fc_name, geo_id, timezone, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for fc in fcs {
            stmt.execute(params![
                fc.fc_id,
                fc.fc_name,
                fc.geo_id,
                fc.timezone,
                ts(fc.created_at),
                ts(fc.updated_at),
            ])?;
        }
        Ok(())
    }

    pub fn insert_customers(&self, customers: &[Customer]) -> RefreshResult<()> {
        self.insert_customers_into("dim_customer", customers)
    }

    pub(crate) fn insert_customers_into(
        &self,
        table: &str,
        customers: &[Customer],
    ) -> RefreshResult<()> {
        let sql = format!(
            "INSERT INTO {table} (
                customer_id, customer_created_ts, geo_id, acquisition_channel,
                created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for c in customers {
            stmt.execute(params![
                c.customer_id,
                ts(c.customer_created_ts),
                c.geo_id,
                c.acquisition_channel,
                ts(c.created_at),
                ts(c.updated_at),
            ])?;
        }
        Ok(())
    }

    pub fn insert_products(&self, products: &[Product]) -> RefreshResult<()> {
        self.insert_products_into("dim_product", products)
    }

    pub(crate) fn insert_products_into(
        &self,
        table: &str,
        products: &[Product],
    ) -> RefreshResult<()> {
        let sql = format!(
            "INSERT INTO {table} (
                product_id, sku, product_name, category_l1, category_l2, brand,
                unit_cost, list_price, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        for p in products {
            stmt.execute(params![
                p.product_id,
                p.sku,
                p.product_name,
                p.category_l1,
                p.category_l2,
                p.brand,
                p.unit_cost,
                p.list_price,
                ts(p.created_at),
                ts(p.updated_at),
            ])?;
        }
        Ok(())
    }

    pub fn insert_date_dim(&self, dates: &[DateDim]) -> RefreshResult<()> {
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO dim_date (
                date_id, date_value, year, quarter, month, month_name,
                week_of_year, day_of_month, day_of_week, day_name, is_weekend
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for d in dates {
            stmt.execute(params![
                d.date_id,
                date_str(d.date_value),
                d.year,
                d.quarter,
                d.month,
                d.month_name,
                d.week_of_year,
                d.day_of_month,
                d.day_of_week,
                d.day_name,
                d.is_weekend,
            ])?;
        }
        Ok(())
    }

    // ── Readers ────────────────────────────────────────────────

    pub fn all_geos(&self) -> RefreshResult<Vec<Geo>> {
        let mut stmt = self.conn.prepare(
            "SELECT geo_id, country, region, city, currency, created_at, updated_at
             FROM dim_geo ORDER BY geo_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Geo {
                geo_id: row.get(0)?,
                country: row.get(1)?,
                region: row.get(2)?,
                city: row.get(3)?,
                currency: row.get(4)?,
                created_at: dt(row.get(5)?),
                updated_at: dt(row.get(6)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_customers(&self) -> RefreshResult<Vec<Customer>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, customer_created_ts, geo_id, acquisition_channel,
                    created_at, updated_at
             FROM dim_customer ORDER BY customer_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Customer {
                customer_id: row.get(0)?,
                customer_created_ts: dt(row.get(1)?),
                geo_id: row.get(2)?,
                acquisition_channel: row.get(3)?,
                created_at: dt(row.get(4)?),
                updated_at: dt(row.get(5)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn all_products(&self) -> RefreshResult<Vec<Product>> {
        let mut stmt = self.conn.prepare(
            "SELECT product_id, sku, product_name, category_l1, category_l2, brand,
                    unit_cost, list_price, created_at, updated_at
             FROM dim_product ORDER BY product_id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Product {
                product_id: row.get(0)?,
                sku: row.get(1)?,
                product_name: row.get(2)?,
                category_l1: row.get(3)?,
                category_l2: row.get(4)?,
                brand: row.get(5)?,
                unit_cost: row.get(6)?,
                list_price: row.get(7)?,
                created_at: dt(row.get(8)?),
                updated_at: dt(row.get(9)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn max_customer_id(&self) -> RefreshResult<EntityId> {
        self.conn
            .query_row(
                "SELECT COALESCE(MAX(customer_id), 0) FROM dim_customer",
                [],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// The slim projections fact generation needs, read in key order.
    pub fn dimension_snapshot(&self) -> RefreshResult<DimensionSnapshot> {
        let mut stmt = self
            .conn
            .prepare("SELECT customer_id, geo_id FROM dim_customer ORDER BY customer_id ASC")?;
        let customers = stmt
            .query_map([], |row| {
                Ok(CustomerRef {
                    customer_id: row.get(0)?,
                    geo_id: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT geo_id, currency FROM dim_geo ORDER BY geo_id ASC")?;
        let geo_currency = stmt
            .query_map([], |row| {
                Ok((row.get::<_, EntityId>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT product_id, unit_cost, list_price, category_l1
             FROM dim_product ORDER BY product_id ASC",
        )?;
        let products = stmt
            .query_map([], |row| {
                Ok(ProductRef {
                    product_id: row.get(0)?,
                    unit_cost: row.get(1)?,
                    list_price: row.get(2)?,
                    category_l1: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT fc_id FROM dim_fc ORDER BY fc_id ASC")?;
        let fc_ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DimensionSnapshot {
            customers,
            geo_currency,
            products,
            fc_ids,
        })
    }
}
