use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One row of the user dimension. The surrogate key offsets the source id to
/// keep it clear of the booking id space; every attribute is an optional
/// projection from the raw feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimUser {
    pub user_id: i64,
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub city: Option<String>,
    pub company: Option<String>,
}

/// One row of the ground dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimGround {
    pub ground_id: i64,
    pub ground_name: String,
    pub location: String,
    pub ground_type: String,
    pub price_per_hour: f64,
    pub is_active: bool,
}

/// One row of the date dimension: a dense surrogate key over the distinct
/// calendar dates observed in bookings, plus derived calendar attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimDate {
    pub date_id: i64,
    pub full_date: NaiveDate,
    pub day: u32,
    pub month: u32,
    pub year: i32,
    /// Calendar quarter, 1..=4.
    pub quarter: u32,
    /// ISO weekday number, 1 = Monday .. 7 = Sunday.
    pub weekday: u32,
    pub weekday_name: String,
}

impl DimDate {
    /// Derive the calendar attributes for one date.
    pub fn from_date(date_id: i64, full_date: NaiveDate) -> Self {
        Self {
            date_id,
            full_date,
            day: full_date.day(),
            month: full_date.month(),
            year: full_date.year(),
            quarter: (full_date.month() - 1) / 3 + 1,
            weekday: full_date.weekday().number_from_monday(),
            weekday_name: full_date.format("%A").to_string(),
        }
    }
}

/// One row of the booking fact table. `date_id` is the resolved date
/// dimension key; a booking whose date never coerced keeps its row with the
/// key absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactBooking {
    pub booking_id: i64,
    pub user_id: i64,
    pub ground_id: i64,
    pub date_id: Option<i64>,
    pub booking_date: Option<NaiveDate>,
    pub slot_time: String,
    pub duration_hours: f64,
    pub total_price: f64,
    pub booking_status: String,
}

/// The four warehouse tables produced by one transform run, returned as a
/// single unit so callers persist all of them or none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseTables {
    pub dim_users: Vec<DimUser>,
    pub dim_grounds: Vec<DimGround>,
    pub dim_date: Vec<DimDate>,
    pub fact_bookings: Vec<FactBooking>,
}
