//! Source file descriptors: where a trip file lives, what taxi class it
//! holds, and which column carries its pickup time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// TLC trip record class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxiClass {
    Yellow,
    Green,
    Fhv,
    Fhvhv,
}

impl TaxiClass {
    /// Infers the class from a file name. `fhvhv` is checked before `fhv`
    /// since every `fhvhv` name also contains `fhv`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.contains("fhvhv") {
            Some(TaxiClass::Fhvhv)
        } else if name.contains("fhv") {
            Some(TaxiClass::Fhv)
        } else if name.contains("green") {
            Some(TaxiClass::Green)
        } else if name.contains("yellow") {
            Some(TaxiClass::Yellow)
        } else {
            None
        }
    }

    /// Pickup timestamp column used by this class's files.
    pub fn default_timestamp_column(self) -> &'static str {
        match self {
            TaxiClass::Yellow => "tpep_pickup_datetime",
            TaxiClass::Green => "lpep_pickup_datetime",
            TaxiClass::Fhv | TaxiClass::Fhvhv => "pickup_datetime",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaxiClass::Yellow => "yellow",
            TaxiClass::Green => "green",
            TaxiClass::Fhv => "fhv",
            TaxiClass::Fhvhv => "fhvhv",
        }
    }
}

impl fmt::Display for TaxiClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk encoding of a source, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    CsvGzip,
    Parquet,
}

impl SourceFormat {
    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_lowercase();
        if lower.ends_with(".csv.gz") {
            Some(SourceFormat::CsvGzip)
        } else if lower.ends_with(".csv") {
            Some(SourceFormat::Csv)
        } else if lower.ends_with(".parquet") {
            Some(SourceFormat::Parquet)
        } else {
            None
        }
    }
}

/// Immutable description of one trip file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub timestamp_column: String,
    pub class: Option<TaxiClass>,
    pub format: SourceFormat,
}

impl SourceFile {
    /// Builds a descriptor from a path, inferring class and format.
    ///
    /// Returns `None` when the extension is not a recognised data format.
    /// `timestamp_column` overrides the class default; a file of unknown
    /// class without an override uses `pickup_datetime`.
    pub fn from_path(path: &str, timestamp_column: Option<&str>) -> Option<Self> {
        let format = SourceFormat::from_path(path)?;
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let class = TaxiClass::from_file_name(file_name);
        let timestamp_column = timestamp_column
            .map(str::to_string)
            .or_else(|| class.map(|c| c.default_timestamp_column().to_string()))
            .unwrap_or_else(|| "pickup_datetime".to_string());

        Some(SourceFile {
            path: path.to_string(),
            timestamp_column,
            class,
            format,
        })
    }
}
