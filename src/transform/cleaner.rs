//! Per-column cleaning and normalization rules.
//!
//! Every operation takes a table and returns a new one; the composites wire
//! them together in a fixed order per raw source. Outlier filtering is a
//! standalone step that callers insert explicitly; it is not part of any
//! composite pipeline.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::table::{ColumnType, Table, Value};

/// Replace missing values in every numeric column with that column's median,
/// computed over the present values. A column with no present values at all
/// is left untouched.
pub fn fill_numeric(table: &Table) -> Table {
    let mut out = table.clone();
    for (idx, column) in table.columns().iter().enumerate() {
        if !column.ty.is_numeric() {
            continue;
        }
        let mut present: Vec<f64> = table
            .rows()
            .iter()
            .filter_map(|row| row[idx].as_f64())
            .collect();
        if present.is_empty() {
            continue;
        }
        present.sort_by(f64::total_cmp);
        let fill = numeric_fill(column.ty, percentile(&present, 0.5));
        for row in out.rows_mut() {
            if row[idx].is_null() {
                row[idx] = fill.clone();
            }
        }
    }
    out
}

/// Replace missing values in every categorical column with the column's most
/// frequent value. Ties go to the value observed first; a column with no
/// present values fills with the literal sentinel "Unknown".
pub fn fill_categorical(table: &Table) -> Table {
    let mut out = table.clone();
    for (idx, column) in table.columns().iter().enumerate() {
        if !column.ty.is_categorical() {
            continue;
        }
        if !table.rows().iter().any(|row| row[idx].is_null()) {
            continue;
        }
        let fill = column_mode(table, idx).unwrap_or_else(|| Value::Text("Unknown".to_string()));
        for row in out.rows_mut() {
            if row[idx].is_null() {
                row[idx] = fill.clone();
            }
        }
    }
    out
}

/// Drop rows that are exact duplicates across all columns, keeping the first
/// occurrence and preserving the relative order of survivors.
pub fn remove_duplicates(table: &Table) -> Table {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Table::new(table.columns().to_vec());
    for row in table.rows() {
        if seen.insert(Table::row_signature(row)) {
            out.push_row(row.clone());
        }
    }
    out
}

/// Standardize column names: trim surrounding whitespace, lower-case, and
/// replace internal spaces with underscores. Idempotent.
pub fn standardize_names(table: &Table) -> Table {
    let mut out = table.clone();
    for column in out.columns_mut() {
        column.name = column.name.trim().to_lowercase().replace(' ', "_");
    }
    out
}

/// Coerce every date-typed column to calendar dates. Values that fail to
/// parse become missing rather than an error; whether such rows survive is a
/// downstream policy, not this step's.
pub fn fix_date_format(table: &Table) -> Table {
    let mut out = table.clone();
    for (idx, column) in table.columns().iter().enumerate() {
        if column.ty != ColumnType::Date {
            continue;
        }
        for row in out.rows_mut() {
            row[idx] = match coerce_date(&row[idx]) {
                Some(date) => Value::Date(date),
                None => Value::Null,
            };
        }
    }
    out
}

/// Drop rows falling outside the IQR bounds of each numeric column, column by
/// column in schema order. Each column's quartiles are computed on the rows
/// that survived the previous columns, so the application order matters and
/// is part of the contract. Missing cells never match a bound and survive.
pub fn detect_remove_outliers(table: &Table) -> Table {
    let mut out = table.clone();
    for idx in 0..out.column_count() {
        let column = out.columns()[idx].clone();
        if !column.ty.is_numeric() {
            continue;
        }
        let mut present: Vec<f64> = out
            .rows()
            .iter()
            .filter_map(|row| row[idx].as_f64())
            .collect();
        if present.is_empty() {
            continue;
        }
        present.sort_by(f64::total_cmp);
        let q1 = percentile(&present, 0.20);
        let q3 = percentile(&present, 0.80);
        let iqr = q3 - q1;
        let lower = q1 - 1.5 * iqr;
        let upper = q3 + 1.5 * iqr;

        let outliers = out
            .rows()
            .iter()
            .filter(|row| is_outlier(&row[idx], lower, upper))
            .count();
        info!("Outliers in {}: {}", column.name, outliers);

        out.retain_rows(|row| !is_outlier(&row[idx], lower, upper));
    }
    out
}

/// Clean the raw bookings feed.
pub fn clean_bookings(table: &Table) -> Table {
    clean_table(table)
}

/// Clean the raw grounds feed.
pub fn clean_grounds(table: &Table) -> Table {
    clean_table(table)
}

/// Clean the raw users feed.
pub fn clean_users(table: &Table) -> Table {
    clean_table(table)
}

/// The shared per-source cleaning pipeline, applied in fixed order. Row
/// ordering is already positional in our representation, so the source
/// system's index reset has no counterpart here.
fn clean_table(table: &Table) -> Table {
    let table = fill_numeric(table);
    let table = fill_categorical(&table);
    let table = remove_duplicates(&table);
    let table = standardize_names(&table);
    fix_date_format(&table)
}

/// Lenient date coercion shared by the cleaner and the builders. Accepts
/// already-coerced cells, ISO dates, ISO datetimes and the US-style formats
/// seen in the raw feeds.
pub fn coerce_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(date) => Some(*date),
        Value::Text(raw) => parse_date(raw),
        _ => None,
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m-%d-%Y"))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
}

/// Linear-interpolation percentile over a sorted, non-empty slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Render a median as a cell: integer columns keep integral medians integral.
fn numeric_fill(ty: ColumnType, median: f64) -> Value {
    if ty == ColumnType::Integer && median.fract() == 0.0 {
        Value::Int(median as i64)
    } else {
        Value::Float(median)
    }
}

/// Most frequent value of a column; ties resolve to the value seen first.
fn column_mode(table: &Table, idx: usize) -> Option<Value> {
    let mut counts: HashMap<String, (usize, usize, Value)> = HashMap::new();
    for (order, row) in table.rows().iter().enumerate() {
        let value = &row[idx];
        if value.is_null() {
            continue;
        }
        let entry = counts
            .entry(value.encode_key())
            .or_insert_with(|| (0, order, value.clone()));
        entry.0 += 1;
    }
    counts
        .into_values()
        .max_by_key(|&(count, first_seen, _)| (count, std::cmp::Reverse(first_seen)))
        .map(|(_, _, value)| value)
}

fn is_outlier(value: &Value, lower: f64, upper: f64) -> bool {
    value
        .as_f64()
        .map(|v| v < lower || v > upper)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn numeric_table(values: &[Value]) -> Table {
        let mut table = Table::new(vec![Column::new("amount", ColumnType::Float)]);
        for value in values {
            table.push_row(vec![value.clone()]);
        }
        table
    }

    #[test]
    fn test_fill_numeric_uses_median_of_present_values() {
        let table = numeric_table(&[
            Value::Float(1.0),
            Value::Null,
            Value::Float(3.0),
            Value::Float(10.0),
        ]);
        let cleaned = fill_numeric(&table);
        // median of [1, 3, 10] is 3
        assert_eq!(cleaned.rows()[1][0], Value::Float(3.0));
    }

    #[test]
    fn test_fill_numeric_keeps_integer_columns_integral() {
        let mut table = Table::new(vec![Column::new("hours", ColumnType::Integer)]);
        table.push_row(vec![Value::Int(2)]);
        table.push_row(vec![Value::Null]);
        table.push_row(vec![Value::Int(4)]);
        let cleaned = fill_numeric(&table);
        assert_eq!(cleaned.rows()[1][0], Value::Int(3));
    }

    #[test]
    fn test_fill_numeric_leaves_all_missing_column_alone() {
        let table = numeric_table(&[Value::Null, Value::Null]);
        let cleaned = fill_numeric(&table);
        assert!(cleaned.rows().iter().all(|row| row[0].is_null()));
    }

    #[test]
    fn test_fill_categorical_uses_mode() {
        let mut table = Table::new(vec![Column::new("city", ColumnType::Text)]);
        table.push_row(vec![Value::Text("Pune".to_string())]);
        table.push_row(vec![Value::Text("Mumbai".to_string())]);
        table.push_row(vec![Value::Text("Pune".to_string())]);
        table.push_row(vec![Value::Null]);
        let cleaned = fill_categorical(&table);
        assert_eq!(cleaned.rows()[3][0], Value::Text("Pune".to_string()));
    }

    #[test]
    fn test_fill_categorical_mode_tie_goes_to_first_seen() {
        let mut table = Table::new(vec![Column::new("city", ColumnType::Text)]);
        table.push_row(vec![Value::Text("Mumbai".to_string())]);
        table.push_row(vec![Value::Text("Pune".to_string())]);
        table.push_row(vec![Value::Null]);
        let cleaned = fill_categorical(&table);
        assert_eq!(cleaned.rows()[2][0], Value::Text("Mumbai".to_string()));
    }

    #[test]
    fn test_fill_categorical_all_missing_uses_unknown_sentinel() {
        let mut table = Table::new(vec![Column::new("city", ColumnType::Text)]);
        table.push_row(vec![Value::Null]);
        table.push_row(vec![Value::Null]);
        let cleaned = fill_categorical(&table);
        assert_eq!(cleaned.rows()[0][0], Value::Text("Unknown".to_string()));
    }

    #[test]
    fn test_remove_duplicates_keeps_first_occurrence_in_order() {
        let mut table = Table::new(vec![
            Column::new("id", ColumnType::Integer),
            Column::new("city", ColumnType::Text),
        ]);
        table.push_row(vec![Value::Int(1), Value::Text("Pune".to_string())]);
        table.push_row(vec![Value::Int(2), Value::Text("Mumbai".to_string())]);
        table.push_row(vec![Value::Int(1), Value::Text("Pune".to_string())]);
        table.push_row(vec![Value::Int(3), Value::Text("Delhi".to_string())]);

        let cleaned = remove_duplicates(&table);
        assert_eq!(cleaned.row_count(), 3);
        assert_eq!(cleaned.rows()[0][0], Value::Int(1));
        assert_eq!(cleaned.rows()[1][0], Value::Int(2));
        assert_eq!(cleaned.rows()[2][0], Value::Int(3));
    }

    #[test]
    fn test_standardize_names_is_idempotent() {
        let table = Table::new(vec![
            Column::new("  Booking Date ", ColumnType::Date),
            Column::new("Total Price", ColumnType::Float),
        ]);
        let once = standardize_names(&table);
        assert_eq!(once.columns()[0].name, "booking_date");
        assert_eq!(once.columns()[1].name, "total_price");

        let twice = standardize_names(&once);
        assert_eq!(twice.columns()[0].name, once.columns()[0].name);
        assert_eq!(twice.columns()[1].name, once.columns()[1].name);
    }

    #[test]
    fn test_fix_date_format_nulls_malformed_values() {
        let mut table = Table::new(vec![Column::new("booking_date", ColumnType::Date)]);
        table.push_row(vec![Value::Text("2024-01-05".to_string())]);
        table.push_row(vec![Value::Text("not-a-date".to_string())]);
        table.push_row(vec![Value::Text("01/15/2024".to_string())]);
        table.push_row(vec![Value::Text("2024-02-01 18:30:00".to_string())]);

        let cleaned = fix_date_format(&table);
        assert_eq!(
            cleaned.rows()[0][0],
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
        assert!(cleaned.rows()[1][0].is_null());
        assert_eq!(
            cleaned.rows()[2][0],
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert_eq!(
            cleaned.rows()[3][0],
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
    }

    #[test]
    fn test_fix_date_format_ignores_non_date_columns() {
        let mut table = Table::new(vec![Column::new("city", ColumnType::Text)]);
        table.push_row(vec![Value::Text("2024-01-05".to_string())]);
        let cleaned = fix_date_format(&table);
        assert_eq!(cleaned.rows()[0][0], Value::Text("2024-01-05".to_string()));
    }

    #[test]
    fn test_outlier_removal_drops_extreme_value() {
        let table = numeric_table(&[
            Value::Float(1.0),
            Value::Float(2.0),
            Value::Float(3.0),
            Value::Float(4.0),
            Value::Float(100.0),
        ]);
        // Q1 (20th pct) = 1.8, Q3 (80th pct) = 23.2, IQR = 21.4,
        // bounds = [-30.3, 55.3] => only 100 falls outside.
        let cleaned = detect_remove_outliers(&table);
        assert_eq!(cleaned.row_count(), 4);
        assert!(cleaned
            .rows()
            .iter()
            .all(|row| row[0].as_f64().unwrap() < 100.0));
    }

    #[test]
    fn test_outlier_removal_is_applied_column_by_column() {
        let mut table = Table::new(vec![
            Column::new("a", ColumnType::Float),
            Column::new("b", ColumnType::Float),
        ]);
        // The extreme `a` row carries the only extreme `b` value, so once the
        // first column drops it, the second column sees no outliers.
        for (a, b) in [(1.0, 10.0), (2.0, 11.0), (3.0, 12.0), (4.0, 13.0), (100.0, 500.0)] {
            table.push_row(vec![Value::Float(a), Value::Float(b)]);
        }
        let cleaned = detect_remove_outliers(&table);
        assert_eq!(cleaned.row_count(), 4);
    }

    #[test]
    fn test_outlier_removal_keeps_missing_cells() {
        let table = numeric_table(&[
            Value::Float(1.0),
            Value::Float(2.0),
            Value::Null,
            Value::Float(3.0),
            Value::Float(4.0),
            Value::Float(100.0),
        ]);
        let cleaned = detect_remove_outliers(&table);
        assert!(cleaned.rows().iter().any(|row| row[0].is_null()));
    }

    #[test]
    fn test_clean_bookings_composite_order() {
        let mut table = Table::new(vec![
            Column::new(" Booking ID", ColumnType::Integer),
            Column::new("Booking Date", ColumnType::Date),
            Column::new("Hours", ColumnType::Float),
        ]);
        table.push_row(vec![
            Value::Int(1),
            Value::Text("2024-01-05".to_string()),
            Value::Float(2.0),
        ]);
        table.push_row(vec![
            Value::Int(1),
            Value::Text("2024-01-05".to_string()),
            Value::Float(2.0),
        ]);
        table.push_row(vec![
            Value::Int(2),
            Value::Text("garbage".to_string()),
            Value::Null,
        ]);

        let cleaned = clean_bookings(&table);
        // duplicate dropped, names standardized, hours filled, bad date nulled
        assert_eq!(cleaned.row_count(), 2);
        assert_eq!(cleaned.columns()[0].name, "booking_id");
        assert_eq!(cleaned.rows()[1][2], Value::Float(2.0));
        assert!(cleaned.rows()[1][1].is_null());
    }
}
