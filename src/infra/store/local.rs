use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::StoreError;
use crate::services::file_store::{FileStore, join_path};

/// Files under a local directory. Store paths are resolved relative to
/// `root`, with any leading `/` ignored.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

fn io_error(path: &str, err: std::io::Error) -> StoreError {
    match err.kind() {
        ErrorKind::NotFound => StoreError::NotFound(path.to_string()),
        _ => StoreError::Unreachable(format!("{path}: {err}")),
    }
}

#[async_trait]
impl FileStore for LocalStore {
    async fn list(&self, dir: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(self.resolve(dir))
            .await
            .map_err(|e| io_error(dir, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, e))? {
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| io_error(dir, e))?
                .is_file();
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        // read_dir order is platform dependent.
        names.sort();
        Ok(names.iter().map(|name| join_path(dir, name)).collect())
    }

    async fn open_read(&self, path: &str) -> Result<Bytes, StoreError> {
        tokio::fs::read(self.resolve(path))
            .await
            .map(Bytes::from)
            .map_err(|e| io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    fn temp_root(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("trips/nested")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_list_returns_sorted_files_only() {
        let root = temp_root("taxi_query_local_list");
        fs::write(root.join("trips/yellow.csv"), "a\n1\n").unwrap();
        fs::write(root.join("trips/green.csv"), "a\n1\n").unwrap();

        let store = LocalStore::new(&root);
        let files = store.list("/trips").await.unwrap();
        assert_eq!(files, vec!["/trips/green.csv", "/trips/yellow.csv"]);

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_open_read_missing_is_not_found() {
        let root = temp_root("taxi_query_local_missing");
        let store = LocalStore::new(&root);

        let err = store.open_read("trips/none.csv").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(p) if p == "trips/none.csv"));

        fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_open_read_returns_contents() {
        let root = temp_root("taxi_query_local_read");
        fs::write(root.join("trips/fhv.csv"), "pickup_datetime\n").unwrap();

        let store = LocalStore::new(&root);
        let bytes = store.open_read("/trips/fhv.csv").await.unwrap();
        assert_eq!(bytes.as_ref(), b"pickup_datetime\n");

        fs::remove_dir_all(&root).unwrap();
    }
}
