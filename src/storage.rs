//! Key-value storage layer: RocksDB in production, a BTreeMap in tests

use crate::config::StorageConfig;
use crate::errors::{HomyakResult, StorageError};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// One buffered mutation inside an atomic batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Put(Vec<u8>, Vec<u8>),
    Delete(Vec<u8>),
}

/// Ordered key-value store. `write_batch` must apply all ops or none.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> HomyakResult<Option<Vec<u8>>>;

    /// All entries whose key starts with `prefix`, in key order
    fn scan_prefix(&self, prefix: &[u8]) -> HomyakResult<Vec<(Vec<u8>, Vec<u8>)>>;

    fn write_batch(&self, ops: Vec<WriteOp>) -> HomyakResult<()>;
}

#[derive(Clone)]
pub struct RocksStore {
    db: Arc<DB>,
}

impl RocksStore {
    pub fn open<P: AsRef<Path>>(path: P) -> HomyakResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path.as_ref())
            .map_err(|e| StorageError::DatabaseOpenFailed(e.to_string()))?;
        Ok(Self { db: Arc::new(db) })
    }

    pub fn open_with_config(config: &StorageConfig) -> HomyakResult<Self> {
        if config.clear_on_start && Path::new(&config.data_directory).exists() {
            tracing::warn!(path = %config.data_directory, "Clearing database on start");
            std::fs::remove_dir_all(&config.data_directory)
                .map_err(|e| StorageError::DatabaseOpenFailed(e.to_string()))?;
        }
        Self::open(&config.data_directory)
    }
}

impl KvStore for RocksStore {
    fn get(&self, key: &[u8]) -> HomyakResult<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| StorageError::ReadFailed(e.to_string()).into())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> HomyakResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut rows = Vec::new();
        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }
        Ok(rows)
    }

    fn write_batch(&self, ops: Vec<WriteOp>) -> HomyakResult<()> {
        let mut batch = WriteBatch::default();
        for op in ops {
            match op {
                WriteOp::Put(key, value) => batch.put(key, value),
                WriteOp::Delete(key) => batch.delete(key),
            }
        }
        self.db
            .write(batch)
            .map_err(|e| StorageError::WriteFailed(e.to_string()).into())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StorageError {
    StorageError::ReadFailed("memory store lock poisoned".to_string())
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> HomyakResult<Option<Vec<u8>>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(key).cloned())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> HomyakResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write_batch(&self, ops: Vec<WriteOp>) -> HomyakResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StorageError::WriteFailed("memory store lock poisoned".to_string()))?;
        for op in ops {
            match op {
                WriteOp::Put(key, value) => {
                    map.insert(key, value);
                }
                WriteOp::Delete(key) => {
                    map.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KvStore) {
        store
            .write_batch(vec![
                WriteOp::Put(b"money:1".to_vec(), b"10".to_vec()),
                WriteOp::Put(b"money:2".to_vec(), b"20".to_vec()),
                WriteOp::Put(b"score:1".to_vec(), b"5".to_vec()),
            ])
            .unwrap();

        let rows = store.scan_prefix(b"money:").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, b"money:1".to_vec());

        store
            .write_batch(vec![WriteOp::Delete(b"money:1".to_vec())])
            .unwrap();
        assert_eq!(store.get(b"money:1").unwrap(), None);
        assert_eq!(store.get(b"money:2").unwrap(), Some(b"20".to_vec()));
        assert_eq!(store.scan_prefix(b"money:").unwrap().len(), 1);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        exercise(&store);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_rocks_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        exercise(&store);
    }
}
