//! Three-level aggregation of parsed logs.
//!
//! Records are stored under `sequence → config → qp` and, in parallel, in a
//! flat index keyed by path. Both structures hold the same `Arc<LogRecord>`.
//!
//! ## Invariants
//!
//! - A key holds at most one record. Upserting a different path under an
//!   occupied key fails with [`Error::AmbiguousIdentity`] and leaves the tree
//!   unchanged; upserting the same path replaces it.
//! - Children keep insertion order, so traversals list configs, then QPs, in
//!   the order they were first inserted.
//! - Traversal never descends below [`MAX_TREE_DEPTH`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use enclog::{AggregationTree, LogRecord};
//!
//! let mut tree = AggregationTree::new();
//! tree.upsert(LogRecord::open("sims/anchor/log/RA-Kimono_QP22_enc.log")?)?;
//!
//! for record in tree.get_by_sequence("Kimono")? {
//!     println!("{record}");
//! }
//! ```

mod events;
mod shared;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Receiver;

pub use events::TreeEvent;
pub use shared::SharedTree;

use crate::error::{Error, Result};
use crate::merge::{MergedSeries, merge_records};
use crate::record::LogRecord;
use events::Subscribers;

/// Depth of the leaves below the root: sequence, config, qp.
pub const MAX_TREE_DEPTH: usize = 3;

/// Outcome of a successful [`AggregationTree::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// The key was empty.
    Inserted,
    /// The path-equal record at the key was replaced.
    Replaced,
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Branch(Vec<(String, Node)>),
    Leaf(Arc<LogRecord>),
}

/// Tree of log records keyed by sequence, config and qp.
#[derive(Debug, Default)]
pub struct AggregationTree {
    root: Vec<(String, Node)>,
    index: HashMap<PathBuf, Arc<LogRecord>>,
    subscribers: Subscribers,
}

impl AggregationTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for change notifications.
    pub fn subscribe(&mut self) -> Receiver<TreeEvent> {
        self.subscribers.subscribe()
    }

    /// Insert a record or replace the path-equal record at its key.
    ///
    /// A path already stored under another key is moved: observers receive
    /// [`TreeEvent::Removed`] for the old record before the insert event.
    pub fn upsert(&mut self, record: impl Into<Arc<LogRecord>>) -> Result<Upsert> {
        let record = record.into();

        if let Ok(Node::Leaf(existing)) = self.lookup(&[record.sequence(), record.config(), record.qp()]) {
            if existing.path() != record.path() {
                return Err(Error::AmbiguousIdentity {
                    existing: existing.path().to_path_buf(),
                    incoming: record.path().to_path_buf(),
                    sequence: record.sequence().to_string(),
                    config: record.config().to_string(),
                    qp: record.qp().to_string(),
                });
            }
        }

        // Same path stored under another key: drop the old leaf.
        let moved_from = match self.index.get(record.path()) {
            Some(stale) if !same_key(stale, &record) => Some(Arc::clone(stale)),
            _ => None,
        };
        if let Some(stale) = &moved_from {
            self.detach(stale);
        }

        let configs = branch_entry(&mut self.root, record.sequence())?;
        let qps = branch_entry(configs, record.config())?;
        let outcome = match qps.iter_mut().find(|(qp, _)| qp == record.qp()) {
            Some((_, slot)) => {
                *slot = Node::Leaf(Arc::clone(&record));
                Upsert::Replaced
            }
            None => {
                qps.push((record.qp().to_string(), Node::Leaf(Arc::clone(&record))));
                Upsert::Inserted
            }
        };

        self.index.insert(record.path().to_path_buf(), Arc::clone(&record));

        if let Some(stale) = moved_from {
            self.subscribers.notify(&TreeEvent::Removed(stale));
        }
        let event = match outcome {
            Upsert::Inserted => TreeEvent::Inserted(record),
            Upsert::Replaced => TreeEvent::Replaced(record),
        };
        self.subscribers.notify(&event);

        Ok(outcome)
    }

    /// Upsert every record, stopping at the first failure.
    ///
    /// Returns the number of records stored.
    pub fn update<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Into<Arc<LogRecord>>,
    {
        let mut count = 0;
        for record in records {
            self.upsert(record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Remove the record stored for `path` from the tree and the index.
    pub fn remove(&mut self, path: impl AsRef<Path>) -> Result<Arc<LogRecord>> {
        let path = path.as_ref();
        let record = self
            .index
            .remove(path)
            .ok_or_else(|| Error::NotFound(path.display().to_string()))?;

        self.detach(&record);
        self.subscribers.notify(&TreeEvent::Removed(Arc::clone(&record)));

        Ok(record)
    }

    /// All records of a sequence, across configs and QPs.
    pub fn get_by_sequence(&self, sequence: &str) -> Result<Vec<Arc<LogRecord>>> {
        let mut records = Vec::new();
        flatten_into(self.lookup(&[sequence])?, 1, &mut records)?;
        Ok(records)
    }

    /// All records of one config of a sequence.
    pub fn get_by_config(&self, sequence: &str, config: &str) -> Result<Vec<Arc<LogRecord>>> {
        let mut records = Vec::new();
        flatten_into(self.lookup(&[sequence, config])?, 2, &mut records)?;
        Ok(records)
    }

    /// Exact lookup by tree keys.
    pub fn get_by_keys(&self, sequence: &str, config: &str, qp: &str) -> Result<Arc<LogRecord>> {
        match self.lookup(&[sequence, config, qp])? {
            Node::Leaf(record) => Ok(Arc::clone(record)),
            Node::Branch(_) => Err(Error::DepthExceeded { max: MAX_TREE_DEPTH }),
        }
    }

    /// Lookup by path through the flat index.
    pub fn get_by_path(&self, path: impl AsRef<Path>) -> Result<Arc<LogRecord>> {
        let path = path.as_ref();
        self.index
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.display().to_string()))
    }

    /// Every record in tree order.
    pub fn records(&self) -> Result<Vec<Arc<LogRecord>>> {
        let mut records = Vec::with_capacity(self.index.len());
        for (_, node) in &self.root {
            flatten_into(node, 1, &mut records)?;
        }
        Ok(records)
    }

    /// Sequence keys in insertion order.
    #[must_use]
    pub fn sequences(&self) -> Vec<&str> {
        self.root.iter().map(|(key, _)| key.as_str()).collect()
    }

    /// Config keys of a sequence in insertion order.
    pub fn configs(&self, sequence: &str) -> Result<Vec<&str>> {
        self.child_keys(&[sequence])
    }

    /// QP keys of a config in insertion order.
    pub fn qps(&self, sequence: &str, config: &str) -> Result<Vec<&str>> {
        self.child_keys(&[sequence, config])
    }

    /// Merge the summary data of every record by (sequence, config).
    pub fn merged_series(&self) -> Result<MergedSeries> {
        Ok(merge_records(self.records()?))
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the tree holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check if a record with this path is stored.
    #[must_use]
    pub fn contains_path(&self, path: impl AsRef<Path>) -> bool {
        self.index.contains_key(path.as_ref())
    }

    fn lookup(&self, keys: &[&str]) -> Result<&Node> {
        if keys.len() > MAX_TREE_DEPTH {
            return Err(Error::DepthExceeded { max: MAX_TREE_DEPTH });
        }
        let not_found = || Error::NotFound(keys.join(" / "));

        let mut node: Option<&Node> = None;
        for key in keys {
            let children = match node {
                None => &self.root,
                Some(Node::Branch(children)) => children,
                Some(Node::Leaf(_)) => return Err(not_found()),
            };
            let child = children
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, child)| child)
                .ok_or_else(not_found)?;
            node = Some(child);
        }
        node.ok_or_else(not_found)
    }

    fn child_keys(&self, keys: &[&str]) -> Result<Vec<&str>> {
        match self.lookup(keys)? {
            Node::Branch(children) => Ok(children.iter().map(|(key, _)| key.as_str()).collect()),
            Node::Leaf(_) => Ok(Vec::new()),
        }
    }

    /// Remove the leaf at the record's key and prune emptied branches.
    fn detach(&mut self, record: &LogRecord) {
        let Some(seq_idx) = position(&self.root, record.sequence()) else {
            return;
        };
        let Node::Branch(configs) = &mut self.root[seq_idx].1 else {
            return;
        };
        let Some(cfg_idx) = position(configs, record.config()) else {
            return;
        };
        let Node::Branch(qps) = &mut configs[cfg_idx].1 else {
            return;
        };
        let Some(qp_idx) = position(qps, record.qp()) else {
            return;
        };

        qps.remove(qp_idx);
        if qps.is_empty() {
            configs.remove(cfg_idx);
        }
        if configs.is_empty() {
            self.root.remove(seq_idx);
        }
    }
}

impl PartialEq for AggregationTree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.index.len() == other.index.len()
            && self.index.keys().all(|path| other.index.contains_key(path))
    }
}

fn same_key(a: &LogRecord, b: &LogRecord) -> bool {
    a.sequence() == b.sequence() && a.config() == b.config() && a.qp() == b.qp()
}

fn position(children: &[(String, Node)], key: &str) -> Option<usize> {
    children.iter().position(|(k, _)| k == key)
}

/// Child branch under `key`, created at the end if missing.
fn branch_entry<'a>(children: &'a mut Vec<(String, Node)>, key: &str) -> Result<&'a mut Vec<(String, Node)>> {
    let idx = match position(children, key) {
        Some(idx) => idx,
        None => {
            children.push((key.to_string(), Node::Branch(Vec::new())));
            children.len() - 1
        }
    };
    match &mut children[idx].1 {
        Node::Branch(grandchildren) => Ok(grandchildren),
        // A leaf above the qp level breaks the fixed schema.
        Node::Leaf(_) => Err(Error::DepthExceeded { max: MAX_TREE_DEPTH }),
    }
}

fn flatten_into(node: &Node, depth: usize, out: &mut Vec<Arc<LogRecord>>) -> Result<()> {
    match node {
        Node::Leaf(record) => out.push(Arc::clone(record)),
        Node::Branch(children) => {
            if depth >= MAX_TREE_DEPTH {
                return Err(Error::DepthExceeded { max: MAX_TREE_DEPTH });
            }
            for (_, child) in children {
                flatten_into(child, depth + 1, out)?;
            }
        }
    }
    Ok(())
}
