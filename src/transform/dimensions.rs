//! Dimension builders: one cleaned raw table in, one keyed dimension out.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{DimDate, DimGround, DimUser};
use crate::error::Result;
use crate::table::{Table, Value};

use super::cleaner::coerce_date;

/// Offset added to the source user id so the surrogate key space cannot
/// collide with the booking id space (source ids start at 1, keys at 201).
pub const USER_ID_OFFSET: i64 = 200;

/// Build the user dimension. The source `id` column is required; every other
/// attribute is an optional lookup that degrades to absent. Duplicate
/// surrogate keys keep their first row.
pub fn build_dim_users(users: &Table) -> Result<Vec<DimUser>> {
    let id_idx = users.require_column("id")?;

    let mut seen: HashSet<i64> = HashSet::new();
    let mut dim = Vec::new();
    for row in users.rows() {
        let Some(source_id) = row[id_idx].as_i64() else {
            // A row without a usable source id has no surrogate key to offer.
            debug!("Skipping user row with non-integer id");
            continue;
        };
        let user_id = source_id + USER_ID_OFFSET;
        if !seen.insert(user_id) {
            continue;
        }
        dim.push(DimUser {
            user_id,
            name: optional_text(users, row, "name"),
            username: optional_text(users, row, "username"),
            email: optional_text(users, row, "email"),
            phone: optional_text(users, row, "phone"),
            website: optional_text(users, row, "website"),
            city: optional_text(users, row, "address.city"),
            company: optional_text(users, row, "company.name"),
        });
    }
    Ok(dim)
}

/// Build the ground dimension. All projected columns are required (the
/// grounds feed owns them) and duplicate ground ids keep their first row.
/// No deactivation signal exists in the source, so every ground is active.
pub fn build_dim_grounds(grounds: &Table) -> Result<Vec<DimGround>> {
    let id_idx = grounds.require_column("ground_id")?;
    let name_idx = grounds.require_column("ground_name")?;
    let city_idx = grounds.require_column("city")?;
    let type_idx = grounds.require_column("location_type")?;
    let price_idx = grounds.require_column("price_per_hour")?;

    let mut seen: HashSet<i64> = HashSet::new();
    let mut dim = Vec::new();
    for row in grounds.rows() {
        let Some(ground_id) = row[id_idx].as_i64() else {
            debug!("Skipping ground row with non-integer ground_id");
            continue;
        };
        if !seen.insert(ground_id) {
            continue;
        }
        dim.push(DimGround {
            ground_id,
            ground_name: text_or_unknown(&row[name_idx]),
            location: text_or_unknown(&row[city_idx]),
            ground_type: text_or_unknown(&row[type_idx]),
            price_per_hour: row[price_idx].as_f64().unwrap_or_default(),
            is_active: true,
        });
    }
    Ok(dim)
}

/// Build the date dimension from the distinct valid booking dates, sorted
/// ascending with dense surrogate keys assigned from 1. Zero valid dates is
/// not an error: the dimension is simply empty.
pub fn build_dim_date(bookings: &Table) -> Result<Vec<DimDate>> {
    let date_idx = bookings.require_column("booking_date")?;

    let mut dates: Vec<NaiveDate> = bookings
        .rows()
        .iter()
        .filter_map(|row| coerce_date(&row[date_idx]))
        .collect();
    dates.sort();
    dates.dedup();

    Ok(dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| DimDate::from_date(i as i64 + 1, date))
        .collect())
}

/// Optional attribute projection: absent column or missing cell both map to
/// `None` instead of an error.
fn optional_text(table: &Table, row: &[Value], name: &str) -> Option<String> {
    table.get(row, name).and_then(Value::to_text)
}

/// Required text attribute of a cleaned row. The cleaner has already mode- or
/// sentinel-filled these, so a residual missing cell takes the same sentinel.
fn text_or_unknown(value: &Value) -> String {
    value.to_text().unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::table::{Column, ColumnType};

    fn users_table() -> Table {
        let mut table = Table::new(vec![
            Column::new("id", ColumnType::Integer),
            Column::new("name", ColumnType::Text),
            Column::new("username", ColumnType::Text),
            Column::new("email", ColumnType::Text),
            Column::new("address.city", ColumnType::Text),
            Column::new("company.name", ColumnType::Text),
        ]);
        table.push_row(vec![
            Value::Int(1),
            Value::Text("A".to_string()),
            Value::Text("a1".to_string()),
            Value::Text("a@x.com".to_string()),
            Value::Text("Pune".to_string()),
            Value::Text("Acme".to_string()),
        ]);
        table
    }

    #[test]
    fn test_dim_users_applies_surrogate_offset() {
        let dim = build_dim_users(&users_table()).unwrap();
        assert_eq!(dim.len(), 1);
        assert_eq!(dim[0].user_id, 201);
        assert_eq!(dim[0].city.as_deref(), Some("Pune"));
        assert_eq!(dim[0].company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_dim_users_missing_optional_columns_become_absent() {
        let mut table = Table::new(vec![Column::new("id", ColumnType::Integer)]);
        table.push_row(vec![Value::Int(7)]);
        let dim = build_dim_users(&table).unwrap();
        assert_eq!(dim[0].user_id, 207);
        assert!(dim[0].name.is_none());
        assert!(dim[0].phone.is_none());
        assert!(dim[0].website.is_none());
    }

    #[test]
    fn test_dim_users_deduplicates_on_surrogate_key() {
        let mut table = Table::new(vec![
            Column::new("id", ColumnType::Integer),
            Column::new("name", ColumnType::Text),
        ]);
        table.push_row(vec![Value::Int(1), Value::Text("first".to_string())]);
        table.push_row(vec![Value::Int(1), Value::Text("second".to_string())]);
        let dim = build_dim_users(&table).unwrap();
        assert_eq!(dim.len(), 1);
        assert_eq!(dim[0].name.as_deref(), Some("first"));
    }

    #[test]
    fn test_dim_users_missing_id_column_is_fatal() {
        let table = Table::new(vec![Column::new("name", ColumnType::Text)]);
        assert!(matches!(
            build_dim_users(&table),
            Err(EtlError::MissingColumn(col)) if col == "id"
        ));
    }

    fn grounds_table() -> Table {
        let mut table = Table::new(vec![
            Column::new("ground_id", ColumnType::Integer),
            Column::new("ground_name", ColumnType::Text),
            Column::new("city", ColumnType::Text),
            Column::new("location_type", ColumnType::Text),
            Column::new("price_per_hour", ColumnType::Float),
        ]);
        table.push_row(vec![
            Value::Int(10),
            Value::Text("Field A".to_string()),
            Value::Text("Pune".to_string()),
            Value::Text("Turf".to_string()),
            Value::Float(250.0),
        ]);
        table
    }

    #[test]
    fn test_dim_grounds_projects_and_renames() {
        let dim = build_dim_grounds(&grounds_table()).unwrap();
        assert_eq!(dim.len(), 1);
        assert_eq!(dim[0].ground_id, 10);
        assert_eq!(dim[0].location, "Pune");
        assert_eq!(dim[0].ground_type, "Turf");
        assert_eq!(dim[0].price_per_hour, 250.0);
        assert!(dim[0].is_active);
    }

    #[test]
    fn test_dim_grounds_deduplicates_on_ground_id() {
        let mut table = grounds_table();
        table.push_row(vec![
            Value::Int(10),
            Value::Text("Field A again".to_string()),
            Value::Text("Pune".to_string()),
            Value::Text("Turf".to_string()),
            Value::Float(300.0),
        ]);
        let dim = build_dim_grounds(&table).unwrap();
        assert_eq!(dim.len(), 1);
        assert_eq!(dim[0].ground_name, "Field A");
    }

    fn bookings_table(dates: &[Value]) -> Table {
        let mut table = Table::new(vec![Column::new("booking_date", ColumnType::Date)]);
        for date in dates {
            table.push_row(vec![date.clone()]);
        }
        table
    }

    #[test]
    fn test_dim_date_assigns_dense_chronological_keys() {
        let table = bookings_table(&[
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            Value::Null,
        ]);
        let dim = build_dim_date(&table).unwrap();
        assert_eq!(dim.len(), 2);
        assert_eq!(dim[0].date_id, 1);
        assert_eq!(
            dim[0].full_date,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
        assert_eq!(dim[1].date_id, 2);
        assert_eq!(
            dim[1].full_date,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn test_dim_date_is_empty_when_no_dates_are_valid() {
        let table = bookings_table(&[Value::Null, Value::Text("not-a-date".to_string())]);
        let dim = build_dim_date(&table).unwrap();
        assert!(dim.is_empty());
    }

    #[test]
    fn test_dim_date_coerces_uncleaned_text_dates() {
        let table = bookings_table(&[Value::Text("2024-01-05".to_string())]);
        let dim = build_dim_date(&table).unwrap();
        assert_eq!(dim.len(), 1);
        assert_eq!(dim[0].weekday_name, "Friday");
    }
}
