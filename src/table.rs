use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EtlError, Result};

/// Semantic type declared for a column.
///
/// Every table carries an explicit schema, so the cleaning rules dispatch on a
/// static type lookup instead of sniffing cell values at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    Float,
    Text,
    Date,
    Boolean,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    pub fn is_categorical(self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Boolean)
    }
}

/// A single cell. `Null` is the missing-value marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Bool(bool),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the cell, promoting integers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view of the cell. Floats qualify only when they carry no
    /// fractional part (a median fill can leave an integral float behind).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(v) => Some(*v),
            _ => None,
        }
    }

    /// Textual rendering for attribute projection. `Null` stays absent.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Int(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Text(v) => Some(v.clone()),
            Value::Date(v) => Some(v.to_string()),
            Value::Bool(v) => Some(v.to_string()),
            Value::Null => None,
        }
    }

    /// Canonical encoding used for row signatures and mode counting.
    /// Floats encode by bit pattern so identical cells always agree.
    pub(crate) fn encode_key(&self) -> String {
        match self {
            Value::Int(v) => format!("i:{v}"),
            Value::Float(v) => format!("f:{:016x}", v.to_bits()),
            Value::Text(v) => format!("t:{v}"),
            Value::Date(v) => format!("d:{v}"),
            Value::Bool(v) => format!("b:{v}"),
            Value::Null => "n".to_string(),
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// An in-memory relation: a declared schema plus an ordered row vector.
///
/// Rows keep their insertion order, so "reset row ordering" from the source
/// pipelines is a property of the representation rather than an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<Value>] {
        &mut self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Append a row. Callers construct rows against this table's schema.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row arity mismatch");
        self.rows.push(row);
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Value]) -> bool) {
        self.rows.retain(|row| keep(row));
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column index for a column that must exist; absence is a precondition
    /// violation surfaced to the caller.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| EtlError::MissingColumn(name.to_string()))
    }

    /// Optional cell lookup by column name; `None` when the column is absent.
    pub fn get<'a>(&'a self, row: &'a [Value], name: &str) -> Option<&'a Value> {
        self.column_index(name).map(|idx| &row[idx])
    }

    /// Content signature of a row, used for exact-duplicate detection.
    pub fn row_signature(row: &[Value]) -> String {
        let mut hasher = Sha256::new();
        for value in row {
            hasher.update(value.encode_key().as_bytes());
            hasher.update([0x1f]);
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut table = Table::new(vec![
            Column::new("id", ColumnType::Integer),
            Column::new("name", ColumnType::Text),
        ]);
        table.push_row(vec![Value::Int(1), Value::Text("a".to_string())]);
        table.push_row(vec![Value::Int(2), Value::Null]);
        table
    }

    #[test]
    fn test_column_lookup() {
        let table = sample_table();
        assert_eq!(table.column_index("name"), Some(1));
        assert_eq!(table.column_index("missing"), None);
        assert!(table.require_column("id").is_ok());
        assert!(matches!(
            table.require_column("missing"),
            Err(EtlError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_row_signature_distinguishes_rows() {
        let a = vec![Value::Int(1), Value::Text("a".to_string())];
        let b = vec![Value::Int(1), Value::Text("b".to_string())];
        assert_eq!(Table::row_signature(&a), Table::row_signature(&a));
        assert_ne!(Table::row_signature(&a), Table::row_signature(&b));
    }

    #[test]
    fn test_row_signature_is_cell_boundary_aware() {
        let a = vec![Value::Text("ab".to_string()), Value::Text("c".to_string())];
        let b = vec![Value::Text("a".to_string()), Value::Text("bc".to_string())];
        assert_ne!(Table::row_signature(&a), Table::row_signature(&b));
    }

    #[test]
    fn test_integer_view_of_floats() {
        assert_eq!(Value::Float(3.0).as_i64(), Some(3));
        assert_eq!(Value::Float(3.5).as_i64(), None);
        assert_eq!(Value::Int(3).as_i64(), Some(3));
        assert_eq!(Value::Null.as_i64(), None);
    }
}
