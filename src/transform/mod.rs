//! The transform stage: cleaning, dimension construction and fact assembly.
//!
//! Pure and synchronous: every run rebuilds the warehouse tables from a full
//! in-memory snapshot of the three raw feeds. Extraction and loading live in
//! their own modules and never reach into this one.

pub mod cleaner;
pub mod dimensions;
pub mod fact;

use tracing::info;

use crate::domain::WarehouseTables;
use crate::error::Result;
use crate::table::Table;

/// Policy switches for a transform run.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    /// Apply IQR outlier filtering to the cleaned bookings before the
    /// dimensions are built. Off unless a caller asks for it.
    pub remove_outliers: bool,
}

/// Reshape the three raw feeds into the star-schema warehouse tables.
///
/// Stage order is fixed: clean each feed independently, build the user and
/// ground dimensions, derive the date dimension from the cleaned bookings,
/// then resolve fact rows against it. The four tables come back as one unit;
/// persistence (all four or none) is the caller's concern.
pub fn transform(
    bookings: &Table,
    grounds: &Table,
    users: &Table,
    options: &TransformOptions,
) -> Result<WarehouseTables> {
    info!(
        "Transforming raw feeds: bookings={} grounds={} users={} rows",
        bookings.row_count(),
        grounds.row_count(),
        users.row_count()
    );

    let mut bookings = cleaner::clean_bookings(bookings);
    if options.remove_outliers {
        bookings = cleaner::detect_remove_outliers(&bookings);
    }
    let grounds = cleaner::clean_grounds(grounds);
    let users = cleaner::clean_users(users);

    let dim_users = dimensions::build_dim_users(&users)?;
    let dim_grounds = dimensions::build_dim_grounds(&grounds)?;
    let dim_date = dimensions::build_dim_date(&bookings)?;
    let fact_bookings = fact::build_fact_bookings(&bookings, &dim_date)?;

    info!(
        "Transform complete: dim_users={} dim_grounds={} dim_date={} fact_bookings={} rows",
        dim_users.len(),
        dim_grounds.len(),
        dim_date.len(),
        fact_bookings.len()
    );

    Ok(WarehouseTables {
        dim_users,
        dim_grounds,
        dim_date,
        fact_bookings,
    })
}
