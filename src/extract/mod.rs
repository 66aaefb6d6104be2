//! Extraction collaborators for the three raw feeds: the bookings CSV export,
//! the grounds spreadsheet and the remote users directory API.
//!
//! Extraction only parses: typed against each feed's declared schema, with
//! unparseable cells mapped to missing. All semantic cleaning happens later
//! in the transform stage.

use std::collections::HashMap;
use std::time::Duration;

use calamine::{open_workbook, Data, Reader, Xlsx};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::config::SourcesConfig;
use crate::error::{EtlError, Result};
use crate::table::{Column, ColumnType, Table, Value};

/// Declared schema for the bookings CSV. Dates stay textual here; the
/// cleaner owns date coercion.
fn bookings_schema() -> Vec<Column> {
    vec![
        Column::new("booking_id", ColumnType::Integer),
        Column::new("user_id", ColumnType::Integer),
        Column::new("ground_id", ColumnType::Integer),
        Column::new("booking_date", ColumnType::Date),
        Column::new("hours", ColumnType::Float),
        Column::new("total_price", ColumnType::Float),
    ]
}

/// Declared schema for the grounds spreadsheet.
fn grounds_schema() -> Vec<Column> {
    vec![
        Column::new("ground_id", ColumnType::Integer),
        Column::new("ground_name", ColumnType::Text),
        Column::new("city", ColumnType::Text),
        Column::new("location_type", ColumnType::Text),
        Column::new("price_per_hour", ColumnType::Float),
    ]
}

/// Fetches and parses the three raw feeds configured at construction time.
pub struct Extractor {
    config: SourcesConfig,
    client: reqwest::Client,
}

impl Extractor {
    pub fn new(config: SourcesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    /// Pull all three feeds and report their shapes.
    pub async fn extract_data(&self) -> Result<(Table, Table, Table)> {
        let bookings = self.read_bookings_csv()?;
        let grounds = self.read_grounds_xlsx()?;
        let users = self.fetch_users().await?;
        info!(
            "Extracted raw feeds: bookings={}x{} grounds={}x{} users={}x{}",
            bookings.row_count(),
            bookings.column_count(),
            grounds.row_count(),
            grounds.column_count(),
            users.row_count(),
            users.column_count()
        );
        Ok((bookings, grounds, users))
    }

    /// Read the bookings CSV export against the declared bookings schema.
    pub fn read_bookings_csv(&self) -> Result<Table> {
        debug!("Reading bookings CSV from {}", self.config.bookings_csv);
        let mut reader = csv::Reader::from_path(&self.config.bookings_csv)?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let columns = columns_for_headers(&headers, &bookings_schema());

        let mut table = Table::new(columns.clone());
        for record in reader.records() {
            let record = record?;
            let row = columns
                .iter()
                .enumerate()
                .map(|(idx, column)| parse_cell(record.get(idx).unwrap_or(""), column.ty))
                .collect();
            table.push_row(row);
        }
        Ok(table)
    }

    /// Read the grounds sheet (first worksheet, header row first) against the
    /// declared grounds schema.
    pub fn read_grounds_xlsx(&self) -> Result<Table> {
        debug!("Reading grounds sheet from {}", self.config.grounds_xlsx);
        let mut workbook: Xlsx<_> = open_workbook(&self.config.grounds_xlsx)?;
        let range = workbook.worksheet_range_at(0).ok_or_else(|| {
            EtlError::Config(format!(
                "No worksheets found in '{}'",
                self.config.grounds_xlsx
            ))
        })??;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|header_row| {
                header_row
                    .iter()
                    .map(|cell| cell.to_string().trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let columns = columns_for_headers(&headers, &grounds_schema());

        let mut table = Table::new(columns.clone());
        for sheet_row in rows {
            let row = columns
                .iter()
                .enumerate()
                .map(|(idx, column)| sheet_cell(sheet_row.get(idx), column.ty))
                .collect();
            table.push_row(row);
        }
        Ok(table)
    }

    /// Fetch the users directory and flatten each record's nested objects to
    /// dotted keys (`address.city`, `company.name`). Column types are
    /// inferred from the first present value per key.
    pub async fn fetch_users(&self) -> Result<Table> {
        debug!("Fetching users from {}", self.config.users_api_url);
        let payload: Vec<JsonValue> = self
            .client
            .get(&self.config.users_api_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let flattened: Vec<HashMap<String, JsonValue>> = payload
            .iter()
            .map(|record| {
                let mut fields = HashMap::new();
                flatten_json(record, "", &mut fields);
                fields
            })
            .collect();
        Ok(users_table(&flattened))
    }
}

/// Flatten nested JSON objects into dotted keys, leaving scalars and arrays
/// as-is at their flattened position.
pub fn flatten_json(value: &JsonValue, prefix: &str, out: &mut HashMap<String, JsonValue>) {
    match value {
        JsonValue::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_json(child, &path, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

/// Assemble the users table from flattened records: the column set is the
/// union of observed keys in first-appearance order.
fn users_table(records: &[HashMap<String, JsonValue>]) -> Table {
    let mut key_order: Vec<String> = Vec::new();
    for record in records {
        let mut keys: Vec<&String> = record.keys().collect();
        keys.sort();
        for key in keys {
            if !key_order.contains(key) {
                key_order.push(key.clone());
            }
        }
    }

    let columns: Vec<Column> = key_order
        .iter()
        .map(|key| {
            let ty = records
                .iter()
                .find_map(|record| record.get(key))
                .map(infer_column_type)
                .unwrap_or(ColumnType::Text);
            Column::new(key.clone(), ty)
        })
        .collect();

    let mut table = Table::new(columns.clone());
    for record in records {
        let row = columns
            .iter()
            .map(|column| {
                record
                    .get(&column.name)
                    .map(|value| json_cell(value, column.ty))
                    .unwrap_or(Value::Null)
            })
            .collect();
        table.push_row(row);
    }
    table
}

/// Match file headers against a declared schema; unknown columns come along
/// as text so nothing in the raw feed is silently dropped.
fn columns_for_headers(headers: &[String], schema: &[Column]) -> Vec<Column> {
    headers
        .iter()
        .map(|header| {
            let ty = schema
                .iter()
                .find(|column| column.name.eq_ignore_ascii_case(header))
                .map(|column| column.ty)
                .unwrap_or(ColumnType::Text);
            Column::new(header.clone(), ty)
        })
        .collect()
}

/// Parse one textual cell against its declared type. Blank or unparseable
/// cells become missing, never an error.
fn parse_cell(raw: &str, ty: ColumnType) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return Value::Null;
    }
    match ty {
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(Value::Int)
            .or_else(|_| raw.parse::<f64>().map(Value::Float))
            .unwrap_or(Value::Null),
        ColumnType::Float => raw.parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        ColumnType::Boolean => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" => Value::Bool(true),
            "false" | "0" | "no" => Value::Bool(false),
            _ => Value::Null,
        },
        // Dates ride through as text until the cleaner coerces them.
        ColumnType::Date | ColumnType::Text => Value::Text(raw.to_string()),
    }
}

/// Convert one spreadsheet cell against its declared type.
fn sheet_cell(cell: Option<&Data>, ty: ColumnType) -> Value {
    let Some(cell) = cell else {
        return Value::Null;
    };
    match cell {
        Data::Empty => Value::Null,
        Data::Int(v) => match ty {
            ColumnType::Float => Value::Float(*v as f64),
            _ => Value::Int(*v),
        },
        Data::Float(v) => match ty {
            // Excel stores most numbers as floats; honour a declared integer.
            ColumnType::Integer if v.fract() == 0.0 => Value::Int(*v as i64),
            _ => Value::Float(*v),
        },
        Data::Bool(v) => Value::Bool(*v),
        Data::String(v) => parse_cell(v, ty),
        other => parse_cell(&other.to_string(), ty),
    }
}

fn infer_column_type(value: &JsonValue) -> ColumnType {
    match value {
        JsonValue::Number(n) if n.is_i64() => ColumnType::Integer,
        JsonValue::Number(_) => ColumnType::Float,
        JsonValue::Bool(_) => ColumnType::Boolean,
        _ => ColumnType::Text,
    }
}

fn json_cell(value: &JsonValue, ty: ColumnType) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Number(n) => match (ty, n.as_i64(), n.as_f64()) {
            (ColumnType::Integer, Some(v), _) => Value::Int(v),
            (_, _, Some(v)) => Value::Float(v),
            _ => Value::Null,
        },
        JsonValue::Bool(v) => Value::Bool(*v),
        JsonValue::String(v) => Value::Text(v.clone()),
        // Arrays and nested leftovers keep their JSON rendering.
        other => Value::Text(other.to_string()),
    }
}
