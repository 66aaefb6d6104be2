//! Fact builder: resolve the date surrogate key for every cleaned booking.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::domain::{DimDate, FactBooking};
use crate::error::Result;
use crate::table::Table;

use super::cleaner::coerce_date;

/// The raw feeds carry no time-of-day granularity, so every slot is unknown.
const SLOT_TIME_UNKNOWN: &str = "Unknown";
/// The raw feeds only record completed bookings.
const STATUS_COMPLETED: &str = "Completed";

/// Build the booking fact table by a left lookup join against the date
/// dimension. Every surviving bookings row yields exactly one fact row; a
/// booking date with no dimension entry keeps its row with `date_id` absent.
/// Deciding which rows exist is the cleaner's job, never this builder's.
pub fn build_fact_bookings(bookings: &Table, dim_date: &[DimDate]) -> Result<Vec<FactBooking>> {
    let booking_idx = bookings.require_column("booking_id")?;
    let user_idx = bookings.require_column("user_id")?;
    let ground_idx = bookings.require_column("ground_id")?;
    let date_idx = bookings.require_column("booking_date")?;
    let hours_idx = bookings.require_column("hours")?;
    let price_idx = bookings.require_column("total_price")?;

    let date_keys: HashMap<NaiveDate, i64> = dim_date
        .iter()
        .map(|d| (d.full_date, d.date_id))
        .collect();

    let mut facts = Vec::with_capacity(bookings.row_count());
    for row in bookings.rows() {
        let booking_date = coerce_date(&row[date_idx]);
        let date_id = booking_date.and_then(|date| date_keys.get(&date).copied());
        facts.push(FactBooking {
            booking_id: row[booking_idx].as_i64().unwrap_or_default(),
            user_id: row[user_idx].as_i64().unwrap_or_default(),
            ground_id: row[ground_idx].as_i64().unwrap_or_default(),
            date_id,
            booking_date,
            slot_time: SLOT_TIME_UNKNOWN.to_string(),
            duration_hours: row[hours_idx].as_f64().unwrap_or_default(),
            total_price: row[price_idx].as_f64().unwrap_or_default(),
            booking_status: STATUS_COMPLETED.to_string(),
        });
    }
    Ok(facts)
}
