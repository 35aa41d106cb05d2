//! In-memory, column-oriented trip table built from parsed chunks.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::HashMap;

use crate::source::TaxiClass;

/// Raw column spellings that are rewritten to their canonical form.
static COLUMN_ALIASES: &[(&str, &str)] = &[
    ("PUlocationID", "PULocationID"),
    ("DOlocationID", "DOLocationID"),
];

/// Accepted textual timestamp layouts, tried in order.
static TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Returns the canonical spelling of a column name.
pub fn canonical_column_name(name: &str) -> &str {
    COLUMN_ALIASES
        .iter()
        .find(|(raw, _)| *raw == name)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(name)
}

/// Permissive timestamp parser. Offsets are dropped and the local wall-clock
/// time is kept.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Infers a value from a delimited-text cell. Empty cells and `NaN` are null.
    pub fn parse_cell(raw: &str) -> Value {
        let raw = raw.trim();
        if raw.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return if f.is_nan() { Value::Null } else { Value::Float(f) };
        }
        Value::Text(raw.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view. Floats with no fractional part count as integers, so
    /// an ID column that picked up a float encoding still groups correctly.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Coerces the value into a timestamp, nulling anything unparseable.
    fn into_timestamp(self) -> Value {
        match self {
            Value::Timestamp(_) => self,
            Value::Text(s) => parse_timestamp(&s).map_or(Value::Null, Value::Timestamp),
            _ => Value::Null,
        }
    }
}

/// A block of rows read from one source, in row-major order as parsers
/// produce them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Chunk {
    pub fn new(columns: Vec<String>) -> Self {
        Chunk {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    /// Rewrites known column-name variants to their canonical spelling.
    /// Idempotent.
    pub fn normalize_columns(&mut self) {
        for column in &mut self.columns {
            let canonical = canonical_column_name(column);
            if canonical != column {
                *column = canonical.to_string();
            }
        }
    }

    /// Parses `column` into timestamps; cells that do not parse become null.
    /// No-op when the column is absent.
    pub fn coerce_timestamp(&mut self, column: &str) {
        let Some(idx) = self.columns.iter().position(|c| c == column) else {
            return;
        };

        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(idx) {
                *cell = std::mem::replace(cell, Value::Null).into_timestamp();
            }
        }
    }
}

/// Where a row came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    pub path: String,
    pub class: Option<TaxiClass>,
}

#[derive(Debug, Clone, PartialEq)]
struct Column {
    name: String,
    values: Vec<Value>,
}

/// Unified trip table. Columns are the union of every appended chunk's
/// columns; each row remembers the origin it was loaded from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripTable {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    origins: Vec<Origin>,
    row_origin: Vec<usize>,
}

impl TripTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.row_origin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_origin.is_empty()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.index
            .get(name)
            .map(|&idx| self.columns[idx].values.as_slice())
    }

    pub fn origins(&self) -> &[Origin] {
        &self.origins
    }

    /// Registers a source and returns the id to tag its rows with.
    pub fn add_origin(&mut self, origin: Origin) -> usize {
        self.origins.push(origin);
        self.origins.len() - 1
    }

    /// Origin of row `row`.
    pub fn row_origin(&self, row: usize) -> Option<&Origin> {
        self.row_origin
            .get(row)
            .and_then(|&idx| self.origins.get(idx))
    }

    /// Appends `chunk` after the existing rows, matching columns by name.
    /// Columns the chunk lacks are padded with nulls and new columns are
    /// back-filled with nulls for earlier rows.
    pub fn append_chunk(&mut self, origin: usize, chunk: Chunk) {
        let start = self.len();
        let added = chunk.len();

        // Position of each table column within the chunk. The first
        // occurrence wins if a header is duplicated.
        let mut positions: Vec<Option<usize>> = vec![None; self.columns.len()];
        for (pos, name) in chunk.columns.iter().enumerate() {
            let idx = match self.index.get(name) {
                Some(&idx) => idx,
                None => {
                    self.columns.push(Column {
                        name: name.clone(),
                        values: vec![Value::Null; start],
                    });
                    let idx = self.columns.len() - 1;
                    self.index.insert(name.clone(), idx);
                    positions.push(None);
                    idx
                }
            };
            if positions[idx].is_none() {
                positions[idx] = Some(pos);
            }
        }

        for column in &mut self.columns {
            column.values.reserve(added);
        }

        for mut row in chunk.rows {
            for (idx, column) in self.columns.iter_mut().enumerate() {
                let value = positions[idx]
                    .and_then(|pos| row.get_mut(pos))
                    .map(|cell| std::mem::replace(cell, Value::Null))
                    .unwrap_or(Value::Null);
                column.values.push(value);
            }
        }

        self.row_origin.extend(std::iter::repeat_n(origin, added));
    }
}
