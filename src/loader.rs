//! Builds one [`TripTable`] out of many source files.
//!
//! Each source is fetched, parsed chunk by chunk, normalised and appended in
//! the order given. A source that cannot be read or parsed is recorded as a
//! [`LoadError`] and skipped; the rest still load.

use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analyzers::aggregate::PICKUP_TIMESTAMP_COLUMNS;
use crate::error::{LoadError, StoreError};
use crate::parser::{self, DEFAULT_CHUNK_SIZE};
use crate::services::file_store::FileStore;
use crate::source::SourceFile;
use crate::table::{Origin, TripTable};

/// Tunables for reading sources.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Rows per parsed chunk. Zero is treated as one.
    pub chunk_size: usize,
    /// Upper bound for a single read attempt.
    pub read_timeout: Duration,
    /// Total attempts per source for transient store errors.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub retry_backoff: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_timeout: Duration::from_secs(60),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

/// Outcome of [`load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    pub table: TripTable,
    /// Sources that contributed to `table` (possibly with zero rows).
    pub loaded: usize,
    pub failures: Vec<LoadError>,
}

impl LoadReport {
    /// True when no source could be loaded, including when none were given.
    pub fn is_empty_dataset(&self) -> bool {
        self.loaded == 0
    }
}

/// Loads every source into one table. Never fails as a whole.
#[tracing::instrument(skip_all, fields(sources = sources.len(), chunk_size = config.chunk_size))]
pub async fn load(
    store: &dyn FileStore,
    sources: &[SourceFile],
    config: &LoaderConfig,
) -> LoadReport {
    let mut report = LoadReport::default();

    for source in sources {
        let bytes = match fetch_with_retry(store, &source.path, config).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %source.path, error = %e, "Source unavailable, skipping");
                report.failures.push(LoadError::SourceUnavailable {
                    path: source.path.clone(),
                    source: e,
                });
                continue;
            }
        };

        match load_source(&mut report.table, source, bytes, config.chunk_size) {
            Ok(rows) => {
                report.loaded += 1;
                info!(path = %source.path, rows, class = ?source.class, "Source loaded");
            }
            Err(e) => {
                warn!(path = %source.path, error = %e, "Source could not be parsed, skipping");
                report.failures.push(e);
            }
        }
    }

    info!(
        rows = report.table.len(),
        loaded = report.loaded,
        failed = report.failures.len(),
        "Dataset assembled"
    );
    report
}

/// Parses one source into a scratch table first so a file that fails half
/// way leaves no partial rows behind, then moves its chunks over.
///
/// The declared timestamp column is coerced along with every known pickup
/// column, so an override such as `request_datetime` does not leave
/// `pickup_datetime` as text.
fn load_source(
    table: &mut TripTable,
    source: &SourceFile,
    bytes: Bytes,
    chunk_size: usize,
) -> Result<usize, LoadError> {
    let mut chunks = Vec::new();
    let rows = parser::read_chunks(bytes, source.format, chunk_size, |mut chunk| {
        chunk.normalize_columns();
        chunk.coerce_timestamp(&source.timestamp_column);
        for column in PICKUP_TIMESTAMP_COLUMNS {
            if *column != source.timestamp_column {
                chunk.coerce_timestamp(column);
            }
        }
        chunks.push(chunk);
    })
    .map_err(|e| LoadError::Parse {
        path: source.path.clone(),
        message: format!("{e:#}"),
    })?;

    debug!(path = %source.path, chunks = chunks.len(), rows, "Parsed source");

    let origin = table.add_origin(Origin {
        path: source.path.clone(),
        class: source.class,
    });
    for chunk in chunks {
        table.append_chunk(origin, chunk);
    }
    Ok(rows)
}

/// Reads `path`, retrying transient errors with exponential backoff. Each
/// attempt is bounded by `config.read_timeout`.
async fn fetch_with_retry(
    store: &dyn FileStore,
    path: &str,
    config: &LoaderConfig,
) -> Result<Bytes, StoreError> {
    let attempts = config.max_attempts.max(1);
    let mut delay = config.retry_backoff;
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(config.read_timeout, store.open_read(path)).await
        {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(config.read_timeout)),
        };

        match result {
            Ok(bytes) => return Ok(bytes),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(path, attempt, error = %e, ?delay, "Read failed, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Lists `dir` and builds a descriptor for every recognised data file, in
/// listing order.
pub async fn discover(store: &dyn FileStore, dir: &str) -> Result<Vec<SourceFile>, StoreError> {
    let files = store.list(dir).await?;
    let sources: Vec<SourceFile> = files
        .iter()
        .filter_map(|path| SourceFile::from_path(path, None))
        .collect();

    debug!(dir, listed = files.len(), sources = sources.len(), "Discovered sources");
    Ok(sources)
}
