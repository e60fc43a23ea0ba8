//! Thread-safe handle to an [`AggregationTree`].

use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{AggregationTree, TreeEvent, Upsert};
use crate::error::Result;
use crate::record::LogRecord;

/// Cloneable handle over a tree guarded by a reader-writer lock.
///
/// Lookups take the read lock; mutations take the write lock, so a failed
/// upsert is observed by no reader in a half-applied state.
#[derive(Debug, Clone, Default)]
pub struct SharedTree {
    inner: Arc<RwLock<AggregationTree>>,
}

impl SharedTree {
    /// Create a handle over an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the tree.
    ///
    /// A lock poisoned by a panicking writer is recovered: mutations either
    /// complete or leave the tree untouched.
    pub fn read(&self) -> RwLockReadGuard<'_, AggregationTree> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, AggregationTree> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// [`AggregationTree::upsert`] under the write lock.
    pub fn upsert(&self, record: impl Into<Arc<LogRecord>>) -> Result<Upsert> {
        self.write().upsert(record)
    }

    /// [`AggregationTree::remove`] under the write lock.
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<Arc<LogRecord>> {
        self.write().remove(path)
    }

    /// Register a listener for change notifications.
    pub fn subscribe(&self) -> Receiver<TreeEvent> {
        self.write().subscribe()
    }

    /// [`AggregationTree::get_by_sequence`] under the read lock.
    pub fn get_by_sequence(&self, sequence: &str) -> Result<Vec<Arc<LogRecord>>> {
        self.read().get_by_sequence(sequence)
    }

    /// [`AggregationTree::get_by_keys`] under the read lock.
    pub fn get_by_keys(&self, sequence: &str, config: &str, qp: &str) -> Result<Arc<LogRecord>> {
        self.read().get_by_keys(sequence, config, qp)
    }

    /// [`AggregationTree::get_by_path`] under the read lock.
    pub fn get_by_path(&self, path: impl AsRef<Path>) -> Result<Arc<LogRecord>> {
        self.read().get_by_path(path)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the tree holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

impl From<AggregationTree> for SharedTree {
    fn from(tree: AggregationTree) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::record::tests::{HM_LOG, record};

    #[test]
    fn test_concurrent_upserts_same_key() {
        let tree = SharedTree::new();

        let results: Vec<Result<Upsert>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let tree = tree.clone();
                    scope.spawn(move || {
                        let path = format!("/host{i}/run1/log/cfg-Seq_QP22_enc.log");
                        let rec = LogRecord::from_text(path, HM_LOG).unwrap();
                        tree.upsert(rec)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let ambiguous = results
            .iter()
            .filter(|r| matches!(r, Err(Error::AmbiguousIdentity { .. })))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(ambiguous, 7);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_readers_see_writes() {
        let tree = SharedTree::new();
        let events = tree.subscribe();
        let reader = tree.clone();

        let rec = record("run1", "cfg", "Seq", 22);
        tree.upsert(rec.clone()).unwrap();

        assert_eq!(*reader.get_by_keys("Seq", "run1 cfg", "22").unwrap(), rec);
        assert_eq!(reader.get_by_sequence("Seq").unwrap().len(), 1);
        assert!(matches!(events.try_recv().unwrap(), TreeEvent::Inserted(_)));

        reader.remove(rec.path()).unwrap();
        assert!(tree.is_empty());
    }
}
