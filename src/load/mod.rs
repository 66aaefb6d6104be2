//! Load collaborator: apply the warehouse DDL and append the four transformed
//! tables. Inserts are append-only; every run assumes a full rebuild upstream.

use rusqlite::{params, Connection};
use tracing::info;

use crate::config::WarehouseConfig;
use crate::domain::WarehouseTables;
use crate::error::Result;

const SCHEMA_SQL: &str = include_str!("../../db/schema.sql");

pub struct WarehouseLoader {
    conn: Connection,
}

impl WarehouseLoader {
    pub fn open(config: &WarehouseConfig) -> Result<Self> {
        let conn = Connection::open(&config.db_path)?;
        info!("Opened warehouse database at {}", config.db_path);
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Apply the schema script. `IF NOT EXISTS` makes reapplication a no-op,
    /// so pre-existing tables are never an error.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        info!("Warehouse schema applied");
        Ok(())
    }

    /// Append all four tables.
    pub fn load_warehouse(&mut self, tables: &WarehouseTables) -> Result<()> {
        self.ensure_schema()?;
        self.load_dim_users(tables)?;
        self.load_dim_grounds(tables)?;
        self.load_dim_date(tables)?;
        self.load_fact_bookings(tables)?;
        info!("All tables loaded successfully");
        Ok(())
    }

    fn load_dim_users(&mut self, tables: &WarehouseTables) -> Result<()> {
        info!("Loading dim_users with {} rows ...", tables.dim_users.len());
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO dim_users (user_id, name, username, email, phone, website, city, company)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for user in &tables.dim_users {
                stmt.execute(params![
                    user.user_id,
                    user.name,
                    user.username,
                    user.email,
                    user.phone,
                    user.website,
                    user.city,
                    user.company,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_dim_grounds(&mut self, tables: &WarehouseTables) -> Result<()> {
        info!(
            "Loading dim_grounds with {} rows ...",
            tables.dim_grounds.len()
        );
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO dim_grounds (ground_id, ground_name, location, ground_type, price_per_hour, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for ground in &tables.dim_grounds {
                stmt.execute(params![
                    ground.ground_id,
                    ground.ground_name,
                    ground.location,
                    ground.ground_type,
                    ground.price_per_hour,
                    ground.is_active,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_dim_date(&mut self, tables: &WarehouseTables) -> Result<()> {
        info!("Loading dim_date with {} rows ...", tables.dim_date.len());
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO dim_date (date_id, full_date, day, month, year, quarter, weekday, weekday_name)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for date in &tables.dim_date {
                stmt.execute(params![
                    date.date_id,
                    date.full_date.to_string(),
                    date.day,
                    date.month,
                    date.year,
                    date.quarter,
                    date.weekday,
                    date.weekday_name,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_fact_bookings(&mut self, tables: &WarehouseTables) -> Result<()> {
        info!(
            "Loading fact_bookings with {} rows ...",
            tables.fact_bookings.len()
        );
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO fact_bookings (booking_id, user_id, ground_id, date_id, booking_date, slot_time, duration_hours, total_price, booking_status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for fact in &tables.fact_bookings {
                stmt.execute(params![
                    fact.booking_id,
                    fact.user_id,
                    fact.ground_id,
                    fact.date_id,
                    fact.booking_date.map(|d| d.to_string()),
                    fact.slot_time,
                    fact.duration_hours,
                    fact.total_price,
                    fact.booking_status,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    #[cfg(test)]
    fn count_rows(&self, table: &str) -> Result<i64> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}
