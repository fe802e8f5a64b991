//! Tabular data extracted from the backends.
//!
//! A [Table] is a sequence of JSON records sharing a column list. Columns appear in the order
//! they are first seen across the records, and a record lacking a column holds null for it.

use crate::error::WellboreError;

use hashbrown::HashSet;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::path::Path;

/// A single row.
pub type Record = Map<String, Value>;

/// Rows of JSON records with a shared, ordered column list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// Return an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from records.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.push(record);
        }
        table
    }

    /// Build a table from a JSON array, ignoring elements that are not objects.
    pub fn from_array(values: &[Value]) -> Self {
        Self::from_records(
            values
                .iter()
                .filter_map(|value| value.as_object().cloned())
                .collect(),
        )
    }

    /// Parse a response body.
    ///
    /// The body is tried, in order, as a `{"data": {"results": [...]}}` envelope, a bare array
    /// of records and a single record. An empty object yields an empty table. Returns `None` if
    /// none of these shapes match.
    pub fn from_response_body(body: &Value) -> Option<Self> {
        if let Some(results) = body
            .get("data")
            .and_then(|data| data.get("results"))
            .and_then(Value::as_array)
        {
            return Some(Self::from_array(results));
        }
        match body {
            Value::Array(values) => Some(Self::from_array(values)),
            Value::Object(record) if record.is_empty() => Some(Self::new()),
            Value::Object(record) => Some(Self::from_records(vec![record.clone()])),
            _ => None,
        }
    }

    /// Append a record, extending the column list with any new keys.
    pub fn push(&mut self, record: Record) {
        for key in record.keys() {
            if !self.columns.iter().any(|column| column == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Values of a column, one per row. Missing values are `None`.
    pub fn column(&self, name: &str) -> Vec<Option<&Value>> {
        self.rows
            .iter()
            .map(|row| row.get(name).filter(|value| !value.is_null()))
            .collect()
    }

    /// Values of a column rendered as strings, one per row.
    pub fn column_strings(&self, name: &str) -> Vec<Option<String>> {
        self.column(name)
            .into_iter()
            .map(|value| value.map(value_to_string))
            .collect()
    }

    /// Values of a column as floating point numbers, one per row. Missing or non-numeric values
    /// are NaN.
    pub fn column_f64(&self, name: &str) -> Vec<f64> {
        self.column(name)
            .into_iter()
            .map(|value| value.and_then(value_to_f64).unwrap_or(f64::NAN))
            .collect()
    }

    /// Return a table holding only the named columns, in the given order.
    pub fn select(&self, columns: &[&str]) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| {
                        let value = row.get(*column).cloned().unwrap_or(Value::Null);
                        (column.to_string(), value)
                    })
                    .collect()
            })
            .collect();
        Self {
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows,
        }
    }

    /// Return a table with the rows satisfying a predicate.
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|row| predicate(row)).cloned().collect(),
        }
    }

    /// Remove duplicate rows, keeping the first occurrence.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::new();
        let columns = &self.columns;
        self.rows.retain(|row| {
            let key: Vec<&Value> = columns
                .iter()
                .map(|column| row.get(column).unwrap_or(&Value::Null))
                .collect();
            seen.insert(serde_json::to_string(&key).unwrap_or_default())
        });
    }

    /// Set a column to a constant value on every row.
    pub fn set_column(&mut self, name: &str, value: Value) {
        if !self.columns.iter().any(|column| column == name) {
            self.columns.push(name.to_string());
        }
        for row in self.rows.iter_mut() {
            row.insert(name.to_string(), value.clone());
        }
    }

    /// Replace the values of an existing column. Rows lacking the column are left untouched.
    pub fn update_column<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&Value) -> Value,
    {
        for row in self.rows.iter_mut() {
            if let Some(value) = row.get_mut(name) {
                *value = f(value);
            }
        }
    }

    /// Append all rows of another table.
    pub fn extend(&mut self, other: Table) {
        for row in other.rows {
            self.push(row);
        }
    }

    /// Concatenate tables.
    pub fn concat<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = Table>,
    {
        let mut result = Self::new();
        for table in tables {
            result.extend(table);
        }
        result
    }

    /// Stable sort by the given columns. Nulls sort last.
    pub fn sort_by_columns(&mut self, columns: &[&str]) {
        self.rows.sort_by(|a, b| {
            for column in columns {
                let ordering = compare_values(a.get(*column), b.get(*column));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });
    }

    /// Records held as object values in the first row.
    ///
    /// Some endpoints wrap a collection as a single object whose values are the records. Values
    /// that are not objects are skipped.
    pub fn first_row_records(&self) -> Vec<Record> {
        self.rows
            .first()
            .map(|row| {
                self.columns
                    .iter()
                    .filter_map(|column| row.get(column).and_then(Value::as_object).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Smallest non-null value of a column, compared as strings.
    pub fn min_string(&self, name: &str) -> Option<String> {
        self.column_strings(name).into_iter().flatten().min()
    }

    /// Largest non-null value of a column, compared as strings.
    pub fn max_string(&self, name: &str) -> Option<String> {
        self.column_strings(name).into_iter().flatten().max()
    }

    /// Serialise the table as CSV with a header row.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, WellboreError> {
        let mut writer = csv::Writer::from_writer(vec![]);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(self.columns.iter().map(|column| {
                row.get(column)
                    .filter(|value| !value.is_null())
                    .map(value_to_string)
                    .unwrap_or_default()
            }))?;
        }
        writer
            .into_inner()
            .map_err(|err| WellboreError::Io(err.into_error()))
    }

    /// Write the table as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<(), WellboreError> {
        std::fs::write(path, self.to_csv_bytes()?)?;
        Ok(())
    }

    /// Read a CSV file written by [Table::write_csv].
    ///
    /// Values are read back as strings, empty fields as nulls.
    pub fn read_csv(path: &Path) -> Result<Self, WellboreError> {
        let mut reader = csv::Reader::from_path(path)?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = vec![];
        for record in reader.records() {
            let record = record?;
            let row = columns
                .iter()
                .zip(record.iter())
                .map(|(column, field)| {
                    let value = if field.is_empty() {
                        Value::Null
                    } else {
                        Value::String(field.to_string())
                    };
                    (column.clone(), value)
                })
                .collect();
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }
}

/// Render a JSON value the way it is written to CSV: strings unquoted, everything else as JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Interpret a JSON value as a number, accepting numeric strings.
pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Whether a JSON value counts as set: true, a non-zero number, or a non-empty string.
pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty() && !s.eq_ignore_ascii_case("false"),
        _ => false,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|value| !value.is_null());
    let b = b.filter(|value| !value.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .unwrap_or(f64::NAN)
            .total_cmp(&b.as_f64().unwrap_or(f64::NAN)),
        (Some(a), Some(b)) => value_to_string(a).cmp(&value_to_string(b)),
    }
}
