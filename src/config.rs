//! Source configuration file.

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::source::SourceFile;

#[derive(Debug, Deserialize)]
struct SourceEntry {
    path: String,
    #[serde(default)]
    timestamp_column: Option<String>,
}

/// Ordered list of trip files, stored as JSON:
/// ```json
/// {
///   "sources": [
///     { "path": "/user/data/yellow_tripdata_2023-01.csv" },
///     { "path": "/user/data/fhv_tripdata_2023-01.parquet",
///       "timestamp_column": "pickup_datetime" }
///   ]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct SourcesConfig {
    sources: Vec<SourceEntry>,
}

impl SourcesConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sources config {path}"))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Builds descriptors in file order.
    ///
    /// # Errors
    ///
    /// Fails on a path whose extension is not a supported data format.
    pub fn descriptors(&self) -> Result<Vec<SourceFile>> {
        self.sources
            .iter()
            .map(|entry| {
                match SourceFile::from_path(&entry.path, entry.timestamp_column.as_deref()) {
                    Some(source) => Ok(source),
                    None => bail!("unsupported source format: {}", entry.path),
                }
            })
            .collect()
    }
}
