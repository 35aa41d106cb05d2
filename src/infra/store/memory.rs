use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::StoreError;
use crate::services::file_store::FileStore;

/// In-memory store with injectable outages, for tests and demos.
#[derive(Default)]
pub struct MemoryStore {
    files: BTreeMap<String, Bytes>,
    unreachable: HashSet<String>,
    flaky: Mutex<HashMap<String, u32>>,
    delays: HashMap<String, Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, contents: impl Into<Bytes>) {
        self.files.insert(path.to_string(), contents.into());
    }

    /// Every read of `path` fails as if the store were down.
    pub fn mark_unreachable(&mut self, path: &str) {
        self.unreachable.insert(path.to_string());
    }

    /// The next `failures` reads of `path` fail transiently.
    pub fn fail_next(&mut self, path: &str, failures: u32) {
        self.flaky
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), failures);
    }

    /// Every read of `path` stalls for `delay` before answering.
    pub fn delay_reads(&mut self, path: &str, delay: Duration) {
        self.delays.insert(path.to_string(), delay);
    }

    fn take_failure(&self, path: &str) -> bool {
        let mut flaky = self.flaky.lock().unwrap_or_else(|e| e.into_inner());
        match flaky.get_mut(path) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn list(&self, dir: &str) -> Result<Vec<String>, StoreError> {
        let dir = dir.trim_end_matches('/');
        Ok(self
            .files
            .keys()
            .filter(|path| {
                path.rsplit_once('/')
                    .map_or(dir.is_empty(), |(parent, _)| parent == dir)
            })
            .cloned()
            .collect())
    }

    async fn open_read(&self, path: &str) -> Result<Bytes, StoreError> {
        if let Some(delay) = self.delays.get(path) {
            tokio::time::sleep(*delay).await;
        }
        if self.unreachable.contains(path) || self.take_failure(path) {
            return Err(StoreError::Unreachable(format!("{path}: connection refused")));
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_direct_children_only() {
        let mut store = MemoryStore::new();
        store.insert("/trips/b.csv", "x");
        store.insert("/trips/a.csv", "x");
        store.insert("/trips/old/c.csv", "x");

        assert_eq!(
            store.list("/trips/").await.unwrap(),
            vec!["/trips/a.csv", "/trips/b.csv"]
        );
    }

    #[tokio::test]
    async fn test_fail_next_then_recovers() {
        let mut store = MemoryStore::new();
        store.insert("/a.csv", "x");
        store.fail_next("/a.csv", 1);

        assert!(store.open_read("/a.csv").await.is_err());
        assert!(store.open_read("/a.csv").await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_and_missing() {
        let mut store = MemoryStore::new();
        store.insert("/a.csv", "x");
        store.mark_unreachable("/a.csv");

        assert!(matches!(
            store.open_read("/a.csv").await,
            Err(StoreError::Unreachable(_))
        ));
        assert!(matches!(
            store.open_read("/b.csv").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
