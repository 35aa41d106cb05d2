//! Trait for the remote store that holds trip files.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

/// Read-only view of a file store (HDFS, S3, a local directory, ...).
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Returns the full paths of the files directly under `dir`, in the
    /// store's listing order.
    async fn list(&self, dir: &str) -> Result<Vec<String>, StoreError>;

    /// Reads the whole file at `path`.
    async fn open_read(&self, path: &str) -> Result<Bytes, StoreError>;
}

/// Joins a directory and a file name with exactly one `/`.
pub fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/data/", "a.csv"), "/data/a.csv");
        assert_eq!(join_path("/data", "a.csv"), "/data/a.csv");
        assert_eq!(join_path("", "a.csv"), "a.csv");
    }
}
